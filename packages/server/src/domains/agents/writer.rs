//! Writer - fourth pipeline stage.
//!
//! Produces the final prose: short answer, deep answer, why-persists
//! list, and the confidence framing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::{AgentPrompt, ConfidenceLevel};

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};

/// Word cap for the short answer, with a small buffer over the published
/// 150-word limit.
const SHORT_ANSWER_MAX_WORDS: usize = 175;

pub struct Writer;

#[derive(Debug, Deserialize)]
struct RawProse {
    short_answer: String,
    deep_answer: String,
    #[serde(default)]
    why_persists: Vec<String>,
    confidence_level: String,
    confidence_explanation: String,
}

#[derive(Debug, Serialize)]
pub struct WriterOutput {
    pub short_answer: String,
    pub deep_answer: String,
    pub why_persists: Vec<String>,
    pub confidence_level: String,
    pub confidence_explanation: String,
}

#[async_trait]
impl Agent for Writer {
    fn name(&self) -> &'static str {
        "writer"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let claim = require_str(inputs, self.name(), "claim_text")?;
        let verdict = require_str(inputs, self.name(), "verdict")?;

        let context = serde_json::json!({
            "claim": claim,
            "claimant": inputs.get("claimant").cloned().unwrap_or_default(),
            "verdict": verdict,
            "confidence_level": inputs.get("confidence_level").cloned().unwrap_or_default(),
            "confidence_explanation": inputs.get("confidence_explanation").cloned().unwrap_or_default(),
            "evidence_summary": inputs.get("evidence_summary").cloned().unwrap_or_default(),
            "counterevidence": inputs.get("counterevidence").cloned().unwrap_or_default(),
            "reverification_notes": inputs.get("reverification_notes").cloned().unwrap_or_default(),
        });

        let user_message = format!(
            "Write the final prose for this claim analysis:\n\n\
             Context:\n{}\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"short_answer\": \"self-contained plain-language summary, at most 150 words, whose \
             opening stance agrees with the verdict\",\n\
               \"deep_answer\": \"full analysis, 3-5 paragraphs, calm and forensic\",\n\
               \"why_persists\": [\"psychological reason\", \"social reason\", \"institutional reason\"],\n\
               \"confidence_level\": \"High | Medium | Low\",\n\
               \"confidence_explanation\": \"why this confidence level\"\n\
             }}\n\n\
             Writing guidelines:\n\
             - Calm, direct, forensic tone; no mocking, no preaching\n\
             - Accessible to non-academics, no assumed theological background\n\
             - Do not reference \"provided quotes\" unless a verbatim quote is included inline",
            serde_json::to_string_pretty(&context).unwrap_or_default()
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;

        let raw: RawProse = parse_output(self.name(), &completion.content)?;

        let word_count = raw.short_answer.split_whitespace().count();
        if word_count > SHORT_ANSWER_MAX_WORDS {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: format!("short_answer too long: {word_count} words (max 150)"),
            });
        }
        if raw.short_answer.trim().is_empty() {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: "short_answer is empty".to_string(),
            });
        }

        let confidence =
            ConfidenceLevel::parse(&raw.confidence_level).ok_or_else(|| AgentError::Parse {
                agent: self.name(),
                message: format!("unknown confidence level '{}'", raw.confidence_level),
            })?;

        to_map(
            self.name(),
            &WriterOutput {
                short_answer: raw.short_answer,
                deep_answer: raw.deep_answer,
                why_persists: raw.why_persists,
                confidence_level: confidence.as_str().to_string(),
                confidence_explanation: raw.confidence_explanation,
            },
        )
    }
}
