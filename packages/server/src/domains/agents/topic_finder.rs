//! Topic Finder - first pipeline stage.
//!
//! Turns the (possibly reformulated) question into an affirmative claim
//! whose truth can be evaluated, with claimant, type, and categories.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::{AgentPrompt, ClaimTypeCategory};

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};

pub struct TopicFinder;

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicFinderOutput {
    /// Affirmative statement matching the asker's semantic intent —
    /// never the negation of it.
    pub claim_text: String,
    #[serde(default)]
    pub claimant: Option<String>,
    pub claim_type: String,
    #[serde(default)]
    pub claim_type_category: Option<String>,
    #[serde(default)]
    pub why_matters: String,
    #[serde(default)]
    pub category_tags: Vec<String>,
}

#[async_trait]
impl Agent for TopicFinder {
    fn name(&self) -> &'static str {
        "topic_finder"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let question = require_str(inputs, self.name(), "question")?;

        let user_message = format!(
            "Question: {question}\n\n\
             Identify the claim under evaluation. Frame claim_text as an AFFIRMATIVE statement \
             whose truth can be evaluated, matching what the asker is actually probing — never \
             the negation of their intent. (\"How similar are Luke and Mark?\" becomes \
             \"Luke used Mark as a source\", not \"Luke is independent of Mark\".)\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"claim_text\": \"...\",\n\
               \"claimant\": \"who makes this claim, or null\",\n\
               \"claim_type\": \"technical tag (history, science, doctrine, translation, ...)\",\n\
               \"claim_type_category\": \"one of: historical, epistemology, interpretation, theological, textual\",\n\
               \"why_matters\": \"one sentence\",\n\
               \"category_tags\": [\"1-3 broad navigation categories\"]\n\
             }}"
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;

        let mut output: TopicFinderOutput = parse_output(self.name(), &completion.content)?;

        if output.claim_text.trim().is_empty() {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: "claim_text is empty".to_string(),
            });
        }

        // Unknown categories are dropped rather than stored; routing
        // treats a missing category as unclassified.
        if let Some(category) = &output.claim_type_category {
            match ClaimTypeCategory::parse(category) {
                Some(parsed) => output.claim_type_category = Some(parsed.as_str().to_string()),
                None => {
                    tracing::warn!(category = %category, "dropping unknown claim_type_category");
                    output.claim_type_category = None;
                }
            }
        }

        to_map(self.name(), &output)
    }
}
