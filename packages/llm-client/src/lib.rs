//! Provider-agnostic LLM gateway.
//!
//! A minimal client for text completion, tool calling, and embeddings
//! across OpenAI and Anthropic wire formats. Per-call configuration
//! (provider, model, system prompt, sampling) travels in a [`CallConfig`]
//! so hot-editable agent settings apply without client rebuilds.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_client::{CallConfig, LlmClient, Provider};
//!
//! let client = LlmClient::from_env();
//!
//! let config = CallConfig::new(Provider::Anthropic, "claude-sonnet-4-5")
//!     .system_prompt("You are a careful fact checker.")
//!     .temperature(0.2);
//!
//! let completion = client.complete(&config, "Did Luke use Mark as a source?").await?;
//! let parsed = llm_client::extract_json(&completion.content)?;
//! ```

pub mod error;
pub mod json;
pub mod tool;
pub mod types;

mod providers;

pub use error::{LlmError, Result};
pub use json::extract_json;
pub use tool::{ToolCall, ToolError, ToolExecutor, ToolInvocation, ToolSpec, ToolTranscript};
pub use types::{CallConfig, Completion, Message, Provider, Usage};

/// Hard cap on model round-trips in a tool loop.
pub const MAX_TOOL_ITERATIONS: usize = 6;

/// Provider-agnostic LLM client.
///
/// Holds one API key per provider; either may be absent, in which case
/// calls routed to that provider fail with [`LlmError::Config`].
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
}

impl LlmClient {
    pub fn new(openai_api_key: Option<String>, anthropic_api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            openai_api_key,
            anthropic_api_key,
        }
    }

    /// Read `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` from the environment.
    /// Absent keys disable the corresponding provider rather than failing.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("ANTHROPIC_API_KEY").ok(),
        )
    }

    fn key_for(&self, provider: Provider) -> Result<&str> {
        let key = match provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
        };
        key.ok_or_else(|| {
            LlmError::Config(format!("{} API key not configured", provider.as_str()))
        })
    }

    /// Single-shot completion for one user message.
    pub async fn complete(&self, config: &CallConfig, user_message: &str) -> Result<Completion> {
        self.complete_messages(config, &[Message::user(user_message)])
            .await
    }

    /// Single-shot completion over an explicit message history.
    pub async fn complete_messages(
        &self,
        config: &CallConfig,
        history: &[Message],
    ) -> Result<Completion> {
        let key = self.key_for(config.provider)?;
        match config.provider {
            Provider::OpenAi => providers::openai::complete(&self.http, key, config, history).await,
            Provider::Anthropic => {
                providers::anthropic::complete(&self.http, key, config, history).await
            }
        }
    }

    /// Tool-augmented completion.
    ///
    /// The model may request tool calls; each is resolved through
    /// `executor` and the enriched transcript re-submitted. Terminates on
    /// a tool-free final message, after [`MAX_TOOL_ITERATIONS`] rounds,
    /// or when a tool raises.
    pub async fn complete_with_tools(
        &self,
        config: &CallConfig,
        user_message: &str,
        tools: &[ToolSpec],
        executor: &dyn ToolExecutor,
    ) -> Result<ToolTranscript> {
        let key = self.key_for(config.provider)?;
        let history = [Message::user(user_message)];
        match config.provider {
            Provider::OpenAi => {
                providers::openai::complete_with_tools(
                    &self.http, key, config, &history, tools, executor,
                )
                .await
            }
            Provider::Anthropic => {
                providers::anthropic::complete_with_tools(
                    &self.http, key, config, &history, tools, executor,
                )
                .await
            }
        }
    }

    /// Generate an embedding vector. OpenAI embeddings only.
    pub async fn create_embedding(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let key = self.key_for(Provider::OpenAi)?;
        providers::openai::create_embedding(&self.http, key, text, model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!(Provider::parse("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::parse("anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::parse("mistral"), None);
    }

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let client = LlmClient::new(None, None);
        let config = CallConfig::new(Provider::Anthropic, "claude-sonnet-4-5");
        let err = client.complete(&config, "hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn call_config_builder() {
        let config = CallConfig::new(Provider::OpenAi, "gpt-4o")
            .system_prompt("be brief")
            .temperature(0.1)
            .max_tokens(256)
            .timeout_secs(15);

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.system_prompt, "be brief");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.timeout_secs, 15);
    }
}
