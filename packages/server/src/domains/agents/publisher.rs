//! Publisher - fifth and final pipeline stage.
//!
//! Composes the per-agent audit trail, persists the claim card (which
//! fixes the embedding to the exact claim text), and announces the card
//! on the progress bus.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domains::claims::models::{
    AgentPrompt, ClaimCard, ConfidenceLevel, NewClaimCard, NewSource, Verdict,
};
use crate::kernel::ProgressEvent;

use super::adversarial_checker::{ReverificationNote, Technique};
use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};
use super::source_checker::CheckedSource;

pub struct Publisher;

#[derive(Debug, Deserialize)]
struct RawAudit {
    audit_summary: String,
    #[serde(default)]
    limitations: Vec<String>,
    #[serde(default)]
    change_verdict_if: String,
    #[serde(default)]
    category_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PublisherOutput {
    pub claim_card_id: uuid::Uuid,
    pub audit_summary: String,
    pub limitations: Vec<String>,
    pub change_verdict_if: String,
    pub category_tags: Vec<String>,
}

#[async_trait]
impl Agent for Publisher {
    fn name(&self) -> &'static str {
        "publisher"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let claim = require_str(inputs, self.name(), "claim_text")?;
        let verdict_str = require_str(inputs, self.name(), "verdict")?;
        require_str(inputs, self.name(), "short_answer")?;

        let sources: Vec<CheckedSource> = take_field(inputs, self.name(), "sources")?;

        let pipeline_summary = json!({
            "claim": claim,
            "claim_type": inputs.get("claim_type").cloned().unwrap_or_default(),
            "claimant": inputs.get("claimant").cloned().unwrap_or_default(),
            "verdict": verdict_str,
            "confidence_level": inputs.get("confidence_level").cloned().unwrap_or_default(),
            "source_count": sources.len(),
            "unverified_source_count": sources.iter()
                .filter(|s| s.verification_status == "unverified").count(),
            "apologetics_techniques": inputs.get("apologetics_techniques").cloned().unwrap_or_default(),
        });

        let user_message = format!(
            "Create the audit summary and category tags for this claim analysis:\n\n\
             Pipeline Summary:\n{}\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"audit_summary\": \"what the five-stage pipeline checked (2-3 sentences)\",\n\
               \"limitations\": [\"what was NOT checked, 2-3 bullets\"],\n\
               \"change_verdict_if\": \"what new evidence would change the verdict (1-2 sentences)\",\n\
               \"category_tags\": [\"1-3 of: Genesis, Canon, Doctrine, Ethics, Institutions, \
             Historical Claims, Scientific Claims, Translation Issues\"]\n\
             }}",
            serde_json::to_string_pretty(&pipeline_summary).unwrap_or_default()
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;
        let raw: RawAudit = parse_output(self.name(), &completion.content)?;

        let verdict = Verdict::parse(verdict_str).ok_or_else(|| AgentError::Parse {
            agent: self.name(),
            message: format!("unknown verdict '{verdict_str}'"),
        })?;
        let confidence = inputs
            .get("confidence_level")
            .and_then(|v| v.as_str())
            .and_then(ConfidenceLevel::parse)
            .unwrap_or(ConfidenceLevel::Medium);

        let reverification_notes: Vec<ReverificationNote> =
            take_field_or_default(inputs, "reverification_notes");
        let techniques: Vec<Technique> = take_field_or_default(inputs, "apologetics_techniques");
        let why_persists: Vec<String> = take_field_or_default(inputs, "why_persists");

        // Audit trail keyed by agent name, with the reverification flags
        // surfaced at the top level for the audits UI.
        let agent_audit = json!({
            "original_question": inputs.get("question").cloned().unwrap_or_default(),
            "reverification_notes": &reverification_notes,
            "audit_summary": &raw.audit_summary,
            "limitations": &raw.limitations,
            "change_verdict_if": &raw.change_verdict_if,
            "topic_finder": {
                "claim_text": claim,
                "claim_type": inputs.get("claim_type").cloned().unwrap_or_default(),
                "why_matters": inputs.get("why_matters").cloned().unwrap_or_default(),
            },
            "source_checker": {
                "source_count": sources.len(),
                "evidence_summary": inputs.get("evidence_summary").cloned().unwrap_or_default(),
            },
            "adversarial_checker": {
                "counterevidence": inputs.get("counterevidence").cloned().unwrap_or_default(),
                "apologetics_techniques": &techniques,
                "reverification_notes": &reverification_notes,
            },
            "writer": {
                "confidence_level": confidence.as_str(),
            },
            "publisher": {
                "audit_summary": &raw.audit_summary,
                "limitations": &raw.limitations,
                "change_verdict_if": &raw.change_verdict_if,
            },
        });

        let new_card = NewClaimCard {
            claim_text: claim.to_string(),
            claimant: inputs
                .get("claimant")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            claim_type: inputs
                .get("claim_type")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            claim_type_category: inputs
                .get("claim_type_category")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            verdict,
            short_answer: inputs
                .get("short_answer")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            deep_answer: inputs
                .get("deep_answer")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            why_persists,
            confidence_level: confidence,
            confidence_explanation: inputs
                .get("confidence_explanation")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            agent_audit,
            sources: sources
                .iter()
                .map(|s| NewSource {
                    source_type: s.source_type.clone(),
                    citation: s.citation.clone(),
                    url: s.url.clone(),
                    quote_text: s.quote_text.clone(),
                    usage_context: s.usage_context.clone(),
                    verification_method: s.verification_method.clone(),
                    verification_status: s.verification_status.clone(),
                    content_type: s.content_type.clone(),
                    url_verified: s.url_verified,
                })
                .collect(),
            apologetics_tags: techniques_as_tags(inputs),
            category_tags: raw.category_tags.clone(),
        };

        // Persisting computes nothing itself; the embedding is generated
        // here from the exact claim text and stored with the card.
        let embedding = ctx
            .deps
            .embedding_service
            .generate(claim)
            .await
            .map_err(|e| AgentError::Store {
                agent: self.name(),
                message: format!("embedding failed: {e}"),
            })?;

        let detail = ClaimCard::insert_audited(&new_card, &embedding, &ctx.deps.db_pool)
            .await
            .map_err(|e| AgentError::Store {
                agent: self.name(),
                message: e.to_string(),
            })?;

        ctx.emit(ProgressEvent::ClaimCardReady {
            claim_card: serde_json::to_value(&detail).unwrap_or_default(),
        })
        .await;

        to_map(
            self.name(),
            &PublisherOutput {
                claim_card_id: detail.card.id,
                audit_summary: raw.audit_summary,
                limitations: raw.limitations,
                change_verdict_if: raw.change_verdict_if,
                category_tags: raw.category_tags,
            },
        )
    }
}

fn take_field<T: serde::de::DeserializeOwned>(
    inputs: &JsonMap,
    agent: &'static str,
    key: &str,
) -> Result<T, AgentError> {
    let value = inputs.get(key).cloned().ok_or_else(|| AgentError::BadInput {
        agent,
        key: key.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| AgentError::Parse {
        agent,
        message: format!("field '{key}' malformed: {e}"),
    })
}

fn take_field_or_default<T: serde::de::DeserializeOwned + Default>(
    inputs: &JsonMap,
    key: &str,
) -> T {
    inputs
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn techniques_as_tags(inputs: &JsonMap) -> Vec<(String, Option<String>)> {
    let techniques: Vec<Technique> = take_field_or_default(inputs, "apologetics_techniques");
    techniques
        .into_iter()
        .map(|t| (t.technique_name, t.description))
        .collect()
}
