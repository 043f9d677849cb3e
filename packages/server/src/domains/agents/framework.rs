//! Shared agent behavior.
//!
//! Every pipeline agent follows the same shape: load its hot-editable
//! configuration row, validate inputs, render a prompt, call the LLM
//! gateway, parse structured output, and emit progress events. Errors are
//! classed so the orchestrator can fail fast with a precise reason.

use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use llm_client::{extract_json, CallConfig, LlmError, Provider};

use crate::domains::claims::models::AgentPrompt;
use crate::kernel::{ProgressEvent, ServerDeps};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Error classes. All are fatal for the current pipeline run; there are
/// no automatic retries.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no configuration found for agent '{0}'")]
    ConfigMissing(String),

    #[error("bad input for agent '{agent}': missing key '{key}'")]
    BadInput { agent: &'static str, key: String },

    #[error("agent '{agent}' LLM call failed: {message}")]
    Llm { agent: &'static str, message: String },

    #[error("agent '{agent}' returned invalid output: {message}")]
    Parse { agent: &'static str, message: String },

    #[error("agent '{agent}' store operation failed: {message}")]
    Store { agent: &'static str, message: String },
}

impl AgentError {
    pub fn from_llm(agent: &'static str, error: LlmError) -> Self {
        match error {
            LlmError::InvalidOutput(message) => Self::Parse { agent, message },
            other => Self::Llm {
                agent,
                message: other.to_string(),
            },
        }
    }
}

/// Execution context handed to every agent invocation.
pub struct AgentContext<'a> {
    pub deps: &'a ServerDeps,
    /// Progress-bus session; None for scheduled runs with no listener.
    pub session_id: Option<&'a str>,
}

impl<'a> AgentContext<'a> {
    pub fn new(deps: &'a ServerDeps, session_id: Option<&'a str>) -> Self {
        Self { deps, session_id }
    }

    pub async fn emit(&self, event: ProgressEvent) {
        if let Some(session) = self.session_id {
            self.deps.stream_hub.publish_event(session, event).await;
        }
    }
}

/// A pipeline stage. The orchestrator treats all five (plus decomposer
/// and composer) uniformly through this capability.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError>;
}

/// Run one agent: load config, emit start/complete events, time the
/// stage, and apply the per-agent timeout.
pub async fn run(
    agent: &dyn Agent,
    ctx: &AgentContext<'_>,
    inputs: &JsonMap,
) -> Result<JsonMap, AgentError> {
    let name = agent.name();

    // Config is read per invocation; edits apply to the next call.
    let config = AgentPrompt::find_by_agent_name(name, &ctx.deps.db_pool)
        .await
        .map_err(|e| AgentError::Store {
            agent: name,
            message: e.to_string(),
        })?
        .ok_or_else(|| AgentError::ConfigMissing(name.to_string()))?;

    ctx.emit(ProgressEvent::AgentStarted {
        agent_name: name.to_string(),
    })
    .await;

    let started = Instant::now();
    let timeout = std::time::Duration::from_secs(ctx.deps.config.agent_timeout_secs);

    let result = match tokio::time::timeout(timeout, agent.execute(ctx, &config, inputs)).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Llm {
            agent: name,
            message: format!("timed out after {}s", timeout.as_secs()),
        }),
    };

    let duration_ms = started.elapsed().as_millis() as i64;
    ctx.emit(ProgressEvent::AgentCompleted {
        agent_name: name.to_string(),
        duration_ms,
        success: result.is_ok(),
    })
    .await;

    match &result {
        Ok(_) => tracing::info!(agent = name, duration_ms, "agent completed"),
        Err(e) => tracing::error!(agent = name, duration_ms, error = %e, "agent failed"),
    }

    result
}

/// Build the per-call gateway config from an agent prompt row.
pub fn call_config(prompt: &AgentPrompt, timeout_secs: u64) -> Result<CallConfig, AgentError> {
    let provider = Provider::parse(&prompt.llm_provider)
        .ok_or_else(|| AgentError::ConfigMissing(format!(
            "agent '{}' has unknown provider '{}'",
            prompt.agent_name, prompt.llm_provider
        )))?;

    Ok(CallConfig::new(provider, prompt.model_name.clone())
        .system_prompt(prompt.system_prompt.clone())
        .temperature(prompt.temperature as f32)
        .max_tokens(prompt.max_tokens.max(1) as u32)
        .timeout_secs(timeout_secs))
}

/// Fetch a required string input or fail with `bad_input`.
pub fn require_str<'m>(
    inputs: &'m JsonMap,
    agent: &'static str,
    key: &str,
) -> Result<&'m str, AgentError> {
    inputs
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AgentError::BadInput {
            agent,
            key: key.to_string(),
        })
}

/// Parse model output into a typed struct through the gateway's JSON
/// extraction.
pub fn parse_output<T: DeserializeOwned>(agent: &'static str, raw: &str) -> Result<T, AgentError> {
    let value = extract_json(raw).map_err(|e| AgentError::Parse {
        agent,
        message: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| AgentError::Parse {
        agent,
        message: e.to_string(),
    })
}

/// Serialize an agent output struct into the aggregated pipeline map.
pub fn to_map<T: serde::Serialize>(agent: &'static str, output: &T) -> Result<JsonMap, AgentError> {
    match serde_json::to_value(output) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AgentError::Parse {
            agent,
            message: "agent output must serialize to an object".to_string(),
        }),
        Err(e) => Err(AgentError::Parse {
            agent,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn require_str_rejects_missing_and_blank() {
        let mut inputs = JsonMap::new();
        assert!(matches!(
            require_str(&inputs, "topic_finder", "question"),
            Err(AgentError::BadInput { key, .. }) if key == "question"
        ));

        inputs.insert("question".into(), serde_json::json!("   "));
        assert!(require_str(&inputs, "topic_finder", "question").is_err());

        inputs.insert("question".into(), serde_json::json!("Did Luke copy Mark?"));
        assert_eq!(
            require_str(&inputs, "topic_finder", "question").unwrap(),
            "Did Luke copy Mark?"
        );
    }

    #[test]
    fn parse_output_maps_invalid_json_to_parse_error() {
        #[derive(Debug, Deserialize)]
        struct Out {
            #[allow(dead_code)]
            claim_text: String,
        }

        let err = parse_output::<Out>("topic_finder", "not json at all").unwrap_err();
        assert!(matches!(err, AgentError::Parse { .. }));

        let ok: Out =
            parse_output("topic_finder", r#"{"claim_text": "Luke used Mark"}"#).unwrap();
        assert_eq!(ok.claim_text, "Luke used Mark");
    }

    #[test]
    fn llm_invalid_output_becomes_parse_error() {
        let err = AgentError::from_llm(
            "writer",
            LlmError::InvalidOutput("unbalanced".to_string()),
        );
        assert!(matches!(err, AgentError::Parse { .. }));

        let err = AgentError::from_llm("writer", LlmError::Provider("quota".to_string()));
        assert!(matches!(err, AgentError::Llm { .. }));
    }
}
