//! Decomposer - runs before the pipeline during article generation.
//!
//! Breaks a queued topic into independently checkable affirmative
//! component claims. The count is the model's call, bounded to 3-12.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::AgentPrompt;

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};

pub const MIN_COMPONENT_CLAIMS: usize = 3;
pub const MAX_COMPONENT_CLAIMS: usize = 12;

pub struct Decomposer;

#[derive(Debug, Deserialize)]
struct RawDecomposition {
    component_claims: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Serialize)]
pub struct DecomposerOutput {
    pub topic: String,
    pub component_claims: Vec<String>,
    pub claim_count: usize,
    pub reasoning: String,
}

/// Bounds check shared by the agent and its tests.
pub fn validate_claim_count(count: usize) -> Result<(), String> {
    if !(MIN_COMPONENT_CLAIMS..=MAX_COMPONENT_CLAIMS).contains(&count) {
        return Err(format!(
            "decomposer produced {count} claims (expected {MIN_COMPONENT_CLAIMS}-{MAX_COMPONENT_CLAIMS})"
        ));
    }
    Ok(())
}

#[async_trait]
impl Agent for Decomposer {
    fn name(&self) -> &'static str {
        "decomposer"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let topic = require_str(inputs, self.name(), "topic")?;
        let context = inputs.get("context").and_then(|v| v.as_str()).unwrap_or("");

        let user_message = format!(
            "Topic: {topic}\n\n{}\
             Identify the distinct factual claims within this topic that can be independently \
             fact-checked. Each claim must be a standalone AFFIRMATIVE statement. Choose the \
             count by topic complexity, between {MIN_COMPONENT_CLAIMS} and {MAX_COMPONENT_CLAIMS}.\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"component_claims\": [\"claim one\", \"claim two\", ...],\n\
               \"reasoning\": \"why these claims cover the topic\"\n\
             }}",
            if context.is_empty() {
                String::new()
            } else {
                format!("Context: {context}\n\n")
            }
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;

        let raw: RawDecomposition = parse_output(self.name(), &completion.content)?;

        validate_claim_count(raw.component_claims.len()).map_err(|message| AgentError::Parse {
            agent: self.name(),
            message,
        })?;

        let claim_count = raw.component_claims.len();
        to_map(
            self.name(),
            &DecomposerOutput {
                topic: topic.to_string(),
                component_claims: raw.component_claims,
                claim_count,
                reasoning: raw.reasoning,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_bounds_are_inclusive() {
        assert!(validate_claim_count(3).is_ok());
        assert!(validate_claim_count(12).is_ok());
        assert!(validate_claim_count(2).is_err());
        assert!(validate_claim_count(13).is_err());
        assert!(validate_claim_count(0).is_err());
    }
}
