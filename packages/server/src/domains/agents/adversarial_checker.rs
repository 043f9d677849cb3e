//! Adversarial Checker - third pipeline stage.
//!
//! Evaluates whether the CLAIM is factually accurate given the evidence.
//! The verdict is about the claim, not about the evidence. Each source is
//! re-verified against the tier walk; discrepancies are annotated into
//! the audit trail rather than failing the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::{AgentPrompt, ConfidenceLevel, Verdict};
use crate::domains::verification::{SourceDomain, VerificationRequest};

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};
use super::source_checker::CheckedSource;

/// Share of a quote's significant words that must appear in refetched
/// content for the quote to count as supported.
pub const QUOTE_OVERLAP_THRESHOLD: f64 = 0.6;

pub struct AdversarialChecker;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverificationNote {
    pub citation: String,
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Technique {
    pub technique_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: String,
    confidence_level: String,
    confidence_explanation: String,
    #[serde(default)]
    apologetics_techniques: Vec<Technique>,
    #[serde(default)]
    counterevidence: String,
}

#[derive(Debug, Serialize)]
pub struct AdversarialOutput {
    pub verdict: String,
    pub confidence_level: String,
    pub confidence_explanation: String,
    pub apologetics_techniques: Vec<Technique>,
    pub counterevidence: String,
    pub reverification_notes: Vec<ReverificationNote>,
}

#[async_trait]
impl Agent for AdversarialChecker {
    fn name(&self) -> &'static str {
        "adversarial_checker"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let claim = require_str(inputs, self.name(), "claim_text")?;
        let evidence_summary = inputs
            .get("evidence_summary")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let sources: Vec<CheckedSource> = inputs
            .get("sources")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AgentError::Parse {
                agent: self.name(),
                message: format!("sources payload malformed: {e}"),
            })?
            .ok_or_else(|| AgentError::BadInput {
                agent: self.name(),
                key: "sources".to_string(),
            })?;

        // Re-verify each source independently of the Source Checker's run.
        let reverification_notes = self.reverify_sources(ctx, claim, &sources).await;

        let notes_text = if reverification_notes.is_empty() {
            "All quotes and URLs re-verified cleanly.".to_string()
        } else {
            reverification_notes
                .iter()
                .map(|n| format!("- {}: {}", n.citation, n.note))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let user_message = format!(
            "Evaluate whether the CLAIM is factually accurate given the evidence. The verdict \
             is about the claim, not about the evidence.\n\n\
             Claim: {claim}\n\
             Evidence Summary: {evidence_summary}\n\n\
             Sources:\n{}\n\n\
             Re-verification findings:\n{notes_text}\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"verdict\": \"True | Misleading | False | Unfalsifiable | Depends on Definitions\",\n\
               \"confidence_level\": \"High | Medium | Low\",\n\
               \"confidence_explanation\": \"2-3 sentences\",\n\
               \"apologetics_techniques\": [{{\"technique_name\": \"...\", \"description\": \"...\"}}],\n\
               \"counterevidence\": \"strongest counterevidence found, or 'None identified'\"\n\
             }}\n\n\
             Verdict categories:\n\
             - True: the claim is factually accurate\n\
             - Misleading: contains truth but misrepresents context\n\
             - False: the claim is factually incorrect\n\
             - Unfalsifiable: cannot be tested empirically\n\
             - Depends on Definitions: hinges on how terms are defined",
            serde_json::to_string_pretty(&sources).unwrap_or_default()
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;

        let raw: RawVerdict = parse_output(self.name(), &completion.content)?;

        let verdict = Verdict::parse(&raw.verdict).ok_or_else(|| AgentError::Parse {
            agent: self.name(),
            message: format!("unknown verdict '{}'", raw.verdict),
        })?;
        let confidence =
            ConfidenceLevel::parse(&raw.confidence_level).ok_or_else(|| AgentError::Parse {
                agent: self.name(),
                message: format!("unknown confidence level '{}'", raw.confidence_level),
            })?;

        to_map(
            self.name(),
            &AdversarialOutput {
                verdict: verdict.as_str().to_string(),
                confidence_level: confidence.as_str().to_string(),
                confidence_explanation: raw.confidence_explanation,
                apologetics_techniques: raw.apologetics_techniques,
                counterevidence: raw.counterevidence,
                reverification_notes,
            },
        )
    }
}

impl AdversarialChecker {
    /// Re-run verification per source: the claimed quote must appear (or
    /// closely paraphrase) in the tier's returned content, and the URL
    /// must still be reachable. Discrepancies become audit notes.
    async fn reverify_sources(
        &self,
        ctx: &AgentContext<'_>,
        claim: &str,
        sources: &[CheckedSource],
    ) -> Vec<ReverificationNote> {
        let mut notes = Vec::new();

        for source in sources {
            if source.verification_method == "llm_unverified" {
                notes.push(ReverificationNote {
                    citation: source.citation.clone(),
                    note: "generated from model memory; no external verification".to_string(),
                });
                continue;
            }

            let request = VerificationRequest {
                claim_text: claim.to_string(),
                search_query: source.citation.clone(),
                domain: SourceDomain::parse(&source.source_type),
            };

            match ctx.deps.verifier.verify(&request).await {
                Ok(outcome) => {
                    if !source.quote_text.is_empty() {
                        let content = outcome.content_snippet.as_deref().unwrap_or("");
                        let overlap = quote_overlap(&source.quote_text, content);
                        if overlap < QUOTE_OVERLAP_THRESHOLD {
                            notes.push(ReverificationNote {
                                citation: source.citation.clone(),
                                note: format!(
                                    "quote not found in refetched content (overlap {overlap:.2})"
                                ),
                            });
                        }
                    }
                }
                Err(e) => {
                    notes.push(ReverificationNote {
                        citation: source.citation.clone(),
                        note: format!("re-verification errored: {e}"),
                    });
                }
            }

            if !source.url.is_empty() && !ctx.deps.verifier.verify_url(&source.url).await {
                notes.push(ReverificationNote {
                    citation: source.citation.clone(),
                    note: format!("URL no longer reachable: {}", source.url),
                });
            }
        }

        notes
    }
}

/// Share of the quote's significant words (>3 chars) present in the
/// content. 1.0 when every significant word appears.
pub fn quote_overlap(quote: &str, content: &str) -> f64 {
    let content_lower = content.to_ascii_lowercase();
    let significant: Vec<String> = quote
        .to_ascii_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_string)
        .collect();

    if significant.is_empty() {
        return 1.0;
    }

    let hits = significant
        .iter()
        .filter(|w| content_lower.contains(w.as_str()))
        .count();
    hits as f64 / significant.len() as f64
}
