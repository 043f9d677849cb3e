// Mock implementations for testing
//
// Provides mock services injected through the Base* traits so pipeline,
// router, and scheduler flows can run without external APIs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use llm_client::{
    CallConfig, Completion, LlmError, ToolCall, ToolExecutor, ToolSpec, ToolTranscript, Usage,
};

use crate::config::Config;
use crate::domains::blog::SchedulerSettings;
use crate::domains::verification::{VerificationOutcome, VerificationRequest};
use crate::kernel::{
    BaseEmbeddingService, BaseLlm, BaseSearchService, BaseSourceVerifier, SearchResult, ServerDeps,
    StreamHub, EMBEDDING_DIM,
};

// =============================================================================
// Mock LLM
// =============================================================================

/// Scripted tool behavior for one `complete_with_tools` call.
#[derive(Debug, Clone)]
pub struct ToolScript {
    /// (tool name, arguments) pairs resolved in order.
    pub calls: Vec<(String, serde_json::Value)>,
    /// Final tool-free message.
    pub final_content: String,
}

pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
    tool_scripts: Mutex<VecDeque<ToolScript>>,
    calls: Mutex<Vec<String>>,
    fail_all: Mutex<bool>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            tool_scripts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail_all: Mutex::new(false),
        }
    }

    /// Queue a text response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(response.into());
        self
    }

    /// Queue a JSON response.
    pub fn with_json_response<T: serde::Serialize>(self, data: &T) -> Self {
        let json = serde_json::to_string(data).expect("mock response serializes");
        self.responses.lock().unwrap().push_back(json);
        self
    }

    /// Queue a tool script for the next tool-augmented call.
    pub fn with_tool_script(self, script: ToolScript) -> Self {
        self.tool_scripts.lock().unwrap().push_back(script);
        self
    }

    /// Make every call fail with a provider error.
    pub fn failing(self) -> Self {
        *self.fail_all.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|p| p.contains(text))
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseLlm for MockLlm {
    async fn complete(
        &self,
        _config: &CallConfig,
        user_message: &str,
    ) -> std::result::Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(user_message.to_string());

        if *self.fail_all.lock().unwrap() {
            return Err(LlmError::Provider("mock provider failure".to_string()));
        }

        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Mock response".to_string());

        Ok(Completion {
            content,
            usage: Usage::default(),
        })
    }

    async fn complete_with_tools(
        &self,
        _config: &CallConfig,
        user_message: &str,
        _tools: &[ToolSpec],
        executor: &dyn ToolExecutor,
    ) -> std::result::Result<ToolTranscript, LlmError> {
        self.calls.lock().unwrap().push(user_message.to_string());

        if *self.fail_all.lock().unwrap() {
            return Err(LlmError::Provider("mock provider failure".to_string()));
        }

        let script = self.tool_scripts.lock().unwrap().pop_front();
        let Some(script) = script else {
            // No script: behave like a model that answers without tools.
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "Mock response".to_string());
            return Ok(ToolTranscript {
                content,
                invocations: Vec::new(),
                iterations: 1,
                usage: Usage::default(),
            });
        };

        let mut invocations = Vec::new();
        for (i, (name, arguments)) in script.calls.iter().enumerate() {
            let call = ToolCall {
                id: format!("call_{i}"),
                name: name.clone(),
                arguments: arguments.clone(),
            };
            let result = executor.execute(&call).await.map_err(|e| LlmError::Tool {
                name: name.clone(),
                message: e.to_string(),
            })?;
            invocations.push(llm_client::ToolInvocation {
                name: name.clone(),
                arguments: arguments.clone(),
                result,
            });
        }

        Ok(ToolTranscript {
            content: script.final_content,
            invocations,
            iterations: script.calls.len() + 1,
            usage: Usage::default(),
        })
    }
}

// =============================================================================
// Mock Embedding Service
// =============================================================================

pub struct MockEmbeddingService {
    fixed_embedding: Vec<f32>,
    /// (text pattern, embedding) pairs checked in insertion order.
    pattern_embeddings: Mutex<Vec<(String, Vec<f32>)>>,
    calls: Mutex<Vec<String>>,
}

impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            fixed_embedding: vec![0.1; EMBEDDING_DIM],
            pattern_embeddings: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = embedding;
        self
    }

    /// When the text contains `pattern`, return this embedding.
    pub fn with_pattern_embedding(self, pattern: &str, embedding: Vec<f32>) -> Self {
        self.pattern_embeddings
            .lock()
            .unwrap()
            .push((pattern.to_string(), embedding));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());

        let patterns = self.pattern_embeddings.lock().unwrap();
        for (pattern, embedding) in patterns.iter() {
            if text.to_lowercase().contains(&pattern.to_lowercase()) {
                return Ok(embedding.clone());
            }
        }
        drop(patterns);

        Ok(self.fixed_embedding.clone())
    }
}

/// Unit vector along one axis. Distinct axes are orthogonal (cosine 0).
pub fn unit_vector(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[axis % EMBEDDING_DIM] = 1.0;
    v
}

/// Unit vector with exactly `cos` cosine similarity to `unit_vector(axis)`.
pub fn vector_with_similarity(axis: usize, cos: f32) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[axis % EMBEDDING_DIM] = cos;
    v[(axis + 1) % EMBEDDING_DIM] = (1.0 - cos * cos).sqrt();
    v
}

// =============================================================================
// Mock Web Search
// =============================================================================

pub struct MockSearchService {
    results: Mutex<Vec<SearchResult>>,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(self, title: &str, url: &str, content: &str) -> Self {
        self.results.lock().unwrap().push(SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            score: 0.9,
        });
        self
    }
}

impl Default for MockSearchService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSearchService for MockSearchService {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let results = self.results.lock().unwrap();
        Ok(results.iter().take(max_results).cloned().collect())
    }
}

// =============================================================================
// Mock Source Verifier
// =============================================================================

pub struct MockVerifier {
    /// (query pattern, outcome) pairs checked in insertion order.
    scripted: Mutex<Vec<(String, VerificationOutcome)>>,
    url_reachable: bool,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(Vec::new()),
            url_reachable: true,
        }
    }

    pub fn with_outcome(self, query_pattern: &str, outcome: VerificationOutcome) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .push((query_pattern.to_string(), outcome));
        self
    }

    pub fn with_unreachable_urls(mut self) -> Self {
        self.url_reachable = false;
        self
    }

    /// Default outcome: a partially verified web hit whose content echoes
    /// the query.
    fn default_outcome(request: &VerificationRequest) -> VerificationOutcome {
        use crate::domains::verification::{ContentType, SourceMetadata, VerificationMethod, VerificationStatus};

        VerificationOutcome {
            verified: true,
            tier: 4,
            method: VerificationMethod::Tavily,
            status: VerificationStatus::PartiallyVerified,
            citation: format!("{} (https://example.org/ref)", request.search_query),
            url: "https://example.org/ref".to_string(),
            quote_text: None,
            content_snippet: Some(format!("Reference content about {}", request.search_query)),
            content_type: ContentType::VerifiedParaphrase,
            url_verified: true,
            metadata: SourceMetadata {
                title: request.search_query.clone(),
                source_type: "web".to_string(),
                ..Default::default()
            },
        }
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSourceVerifier for MockVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
        let scripted = self.scripted.lock().unwrap();
        for (pattern, outcome) in scripted.iter() {
            if request.search_query.contains(pattern) || request.claim_text.contains(pattern) {
                return Ok(outcome.clone());
            }
        }
        drop(scripted);
        Ok(Self::default_outcome(request))
    }

    async fn verify_url(&self, url: &str) -> bool {
        !url.is_empty() && self.url_reachable
    }
}

// =============================================================================
// TestDependencies - builder
// =============================================================================

pub struct TestDependencies {
    pub llm: Arc<MockLlm>,
    pub embedding_service: Arc<MockEmbeddingService>,
    pub web_searcher: Arc<MockSearchService>,
    pub verifier: Arc<MockVerifier>,
    pub config: Config,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            llm: Arc::new(MockLlm::new()),
            embedding_service: Arc::new(MockEmbeddingService::new()),
            web_searcher: Arc::new(MockSearchService::new()),
            verifier: Arc::new(MockVerifier::new()),
            config: Config::for_tests(),
        }
    }

    pub fn mock_llm(mut self, llm: MockLlm) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    pub fn mock_embeddings(mut self, service: MockEmbeddingService) -> Self {
        self.embedding_service = Arc::new(service);
        self
    }

    pub fn mock_web_searcher(mut self, searcher: MockSearchService) -> Self {
        self.web_searcher = Arc::new(searcher);
        self
    }

    pub fn mock_verifier(mut self, verifier: MockVerifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn into_deps(self, db_pool: PgPool) -> ServerDeps {
        ServerDeps::new(
            db_pool,
            self.llm,
            self.embedding_service,
            self.web_searcher,
            self.verifier,
            StreamHub::new(),
            Arc::new(RwLock::new(SchedulerSettings::default())),
            Arc::new(self.config),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
