// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (agents, routing, scheduling) lives in domain modules
// and consumes these seams.
//
// Naming convention: Base* for trait names (e.g., BaseLlm, BaseEmbeddingService)

use anyhow::Result;
use async_trait::async_trait;

use llm_client::{CallConfig, Completion, LlmError, ToolExecutor, ToolSpec, ToolTranscript};

use crate::domains::verification::{VerificationOutcome, VerificationRequest};

// =============================================================================
// LLM Gateway Trait
// =============================================================================

#[async_trait]
pub trait BaseLlm: Send + Sync {
    /// Single-shot completion.
    async fn complete(
        &self,
        config: &CallConfig,
        user_message: &str,
    ) -> std::result::Result<Completion, LlmError>;

    /// Tool-augmented completion; the caller resolves tool calls through
    /// `executor` and the gateway drives the bounded loop.
    async fn complete_with_tools(
        &self,
        config: &CallConfig,
        user_message: &str,
        tools: &[ToolSpec],
        executor: &dyn ToolExecutor,
    ) -> std::result::Result<ToolTranscript, LlmError>;
}

#[async_trait]
impl BaseLlm for llm_client::LlmClient {
    async fn complete(
        &self,
        config: &CallConfig,
        user_message: &str,
    ) -> std::result::Result<Completion, LlmError> {
        llm_client::LlmClient::complete(self, config, user_message).await
    }

    async fn complete_with_tools(
        &self,
        config: &CallConfig,
        user_message: &str,
        tools: &[ToolSpec],
        executor: &dyn ToolExecutor,
    ) -> std::result::Result<ToolTranscript, LlmError> {
        llm_client::LlmClient::complete_with_tools(self, config, user_message, tools, executor)
            .await
    }
}

// =============================================================================
// Embedding Service Trait
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate an embedding for text (EMBEDDING_DIM-dimensional vector).
    async fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// Web Search Trait
// =============================================================================

/// A single web search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
}

#[async_trait]
pub trait BaseSearchService: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

// =============================================================================
// Source Verification Trait
// =============================================================================

#[async_trait]
pub trait BaseSourceVerifier: Send + Sync {
    /// Walk the verification tiers for one desired source. Exhausting all
    /// tiers yields an unverified outcome, not an error.
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome>;

    /// Check that a URL is reachable (HEAD, short timeout, redirects ok).
    async fn verify_url(&self, url: &str) -> bool;
}
