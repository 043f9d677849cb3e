//! Router agent.
//!
//! Tool-using LLM deciding among the three response modes. Its
//! configuration row is loaded on every invocation — a forgotten config
//! load would produce a tool-less, instruction-less call.

use thiserror::Error;
use uuid::Uuid;

use llm_client::ToolTranscript;

use crate::domains::agents::framework::{call_config, AgentError};
use crate::domains::chat::ChatMessage;
use crate::domains::claims::models::AgentPrompt;
use crate::kernel::ServerDeps;

use super::models::RoutingMode;
use super::service::{router_tools, CandidateSummary, RouterService, TOOL_DETAILS, TOOL_GENERATE, TOOL_SEARCH};

/// A candidate at or above this similarity, judged the same claim, is an
/// exact match.
pub const EXACT_MATCH_THRESHOLD: f64 = 0.92;
/// Candidates in [CONTEXTUAL_THRESHOLD, EXACT_MATCH_THRESHOLD) support a
/// synthesized answer.
pub const CONTEXTUAL_THRESHOLD: f64 = 0.80;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("router has no configuration row")]
    ConfigMissing,

    #[error("router LLM call failed: {0}")]
    Llm(String),
}

/// What the router concluded for one question.
#[derive(Debug)]
pub struct RouterOutcome {
    pub mode: RoutingMode,
    /// The model's final message (the synthesized answer in CONTEXTUAL mode).
    pub final_answer: String,
    /// Candidates from the search tool; empty when none were found.
    pub candidates: Vec<CandidateSummary>,
    /// Cards the model inspected via get_claim_details.
    pub inspected_ids: Vec<Uuid>,
}

pub struct RouterAgent<'a> {
    deps: &'a ServerDeps,
}

impl<'a> RouterAgent<'a> {
    pub fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    /// Route one reformulated question. Errors here are the caller's cue
    /// to fall back to NOVEL_CLAIM.
    pub async fn route(
        &self,
        reformulated_question: &str,
        original_question: &str,
        history: &[ChatMessage],
    ) -> Result<RouterOutcome, RouterError> {
        // Hot-editable config: read per invocation.
        let prompt = AgentPrompt::find_by_agent_name("router", &self.deps.db_pool)
            .await
            .map_err(|e| RouterError::Llm(e.to_string()))?
            .ok_or(RouterError::ConfigMissing)?;

        let config = call_config(&prompt, self.deps.config.router_timeout_secs)
            .map_err(|e| match e {
                AgentError::ConfigMissing(_) => RouterError::ConfigMissing,
                other => RouterError::Llm(other.to_string()),
            })?;

        let user_message = build_user_message(reformulated_question, original_question, history);
        let service = RouterService::new(self.deps);
        let tools = router_tools();

        let transcript = self
            .deps
            .llm
            .complete_with_tools(&config, &user_message, &tools, &service)
            .await
            .map_err(|e| RouterError::Llm(e.to_string()))?;

        let candidates = extract_candidates(&transcript);
        let inspected_ids = extract_inspected_ids(&transcript);
        let mode = decide_mode(&transcript, &candidates);

        tracing::info!(
            mode = mode.as_str(),
            candidates = candidates.len(),
            iterations = transcript.iterations,
            "router decision"
        );

        Ok(RouterOutcome {
            mode,
            final_answer: transcript.content.clone(),
            candidates,
            inspected_ids,
        })
    }
}

fn build_user_message(
    reformulated_question: &str,
    original_question: &str,
    history: &[ChatMessage],
) -> String {
    let mut parts = Vec::new();

    if !history.is_empty() {
        parts.push("=== Conversation History ===".to_string());
        for message in history.iter().rev().take(5).rev() {
            parts.push(format!("{}: {}", message.role.to_uppercase(), message.content));
        }
        parts.push(String::new());
    }

    parts.push("=== Current Question ===".to_string());
    parts.push(format!("Original: {original_question}"));
    parts.push(format!("Reformulated: {reformulated_question}"));
    parts.push(String::new());
    parts.push(
        "Always call search_existing_claims first, then route this question appropriately."
            .to_string(),
    );

    parts.join("\n")
}

/// Candidates from the (last) search invocation. Absent search → empty.
fn extract_candidates(transcript: &ToolTranscript) -> Vec<CandidateSummary> {
    transcript
        .invocations_of(TOOL_SEARCH)
        .last()
        .and_then(|invocation| {
            serde_json::from_value::<Vec<CandidateSummary>>(invocation.result["results"].clone())
                .ok()
        })
        .unwrap_or_default()
}

fn extract_inspected_ids(transcript: &ToolTranscript) -> Vec<Uuid> {
    transcript
        .invocations_of(TOOL_DETAILS)
        .iter()
        .filter_map(|invocation| {
            invocation.result["claim"]["claim_id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
        })
        .collect()
}

/// Final mode decision after the tool loop terminates.
///
/// - generate_new_claim invoked → NOVEL_CLAIM
/// - get_claim_details invoked → CONTEXTUAL (the model composed over cards)
/// - otherwise by best search similarity: ≥0.92 exact, ≥0.80 contextual,
///   else (or no candidates) novel.
pub fn decide_mode(transcript: &ToolTranscript, candidates: &[CandidateSummary]) -> RoutingMode {
    if transcript.called(TOOL_GENERATE) {
        return RoutingMode::NovelClaim;
    }
    if transcript.called(TOOL_DETAILS) {
        return RoutingMode::Contextual;
    }
    if !transcript.called(TOOL_SEARCH) {
        // The prompt mandates a search; a run without one composed from
        // nothing, so treat it as contextual prose over no cards.
        return RoutingMode::Contextual;
    }

    let Some(best) = candidates
        .iter()
        .map(|c| c.similarity)
        .fold(None::<f64>, |acc, s| Some(acc.map_or(s, |a| a.max(s))))
    else {
        return RoutingMode::NovelClaim;
    };

    if best >= EXACT_MATCH_THRESHOLD {
        RoutingMode::ExactMatch
    } else if best >= CONTEXTUAL_THRESHOLD {
        RoutingMode::Contextual
    } else {
        RoutingMode::NovelClaim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::{ToolInvocation, Usage};
    use serde_json::json;

    fn transcript(invocations: Vec<ToolInvocation>) -> ToolTranscript {
        ToolTranscript {
            content: "final".to_string(),
            invocations,
            iterations: 1,
            usage: Usage::default(),
        }
    }

    fn search_invocation() -> ToolInvocation {
        ToolInvocation {
            name: TOOL_SEARCH.to_string(),
            arguments: json!({"query": "q"}),
            result: json!({"status": "success", "results": []}),
        }
    }

    fn candidate(similarity: f64) -> CandidateSummary {
        CandidateSummary {
            claim_id: Uuid::new_v4(),
            claim_text: "Luke used Mark as a source".to_string(),
            short_answer: "Yes, extensively.".to_string(),
            similarity,
            claim_type: Some("history".to_string()),
            claim_type_category: Some("textual".to_string()),
            verdict: "TRUE".to_string(),
        }
    }

    #[test]
    fn high_similarity_is_exact_match() {
        let t = transcript(vec![search_invocation()]);
        assert_eq!(decide_mode(&t, &[candidate(0.95)]), RoutingMode::ExactMatch);
        assert_eq!(decide_mode(&t, &[candidate(0.92)]), RoutingMode::ExactMatch);
    }

    #[test]
    fn mid_similarity_is_contextual() {
        let t = transcript(vec![search_invocation()]);
        assert_eq!(decide_mode(&t, &[candidate(0.80)]), RoutingMode::Contextual);
        assert_eq!(decide_mode(&t, &[candidate(0.9199)]), RoutingMode::Contextual);
    }

    #[test]
    fn low_similarity_or_no_candidates_is_novel() {
        let t = transcript(vec![search_invocation()]);
        assert_eq!(decide_mode(&t, &[candidate(0.79)]), RoutingMode::NovelClaim);
        assert_eq!(decide_mode(&t, &[]), RoutingMode::NovelClaim);
    }

    #[test]
    fn best_candidate_governs_among_several() {
        let t = transcript(vec![search_invocation()]);
        let candidates = vec![candidate(0.6), candidate(0.85), candidate(0.7)];
        assert_eq!(decide_mode(&t, &candidates), RoutingMode::Contextual);
    }

    #[test]
    fn generate_tool_forces_novel() {
        let t = transcript(vec![
            search_invocation(),
            ToolInvocation {
                name: TOOL_GENERATE.to_string(),
                arguments: json!({"claim_text": "c"}),
                result: json!({"status": "triggered"}),
            },
        ]);
        assert_eq!(decide_mode(&t, &[candidate(0.95)]), RoutingMode::NovelClaim);
    }

    #[test]
    fn details_tool_forces_contextual() {
        let t = transcript(vec![
            search_invocation(),
            ToolInvocation {
                name: TOOL_DETAILS.to_string(),
                arguments: json!({"claim_id": "x"}),
                result: json!({"status": "success"}),
            },
        ]);
        assert_eq!(decide_mode(&t, &[candidate(0.95)]), RoutingMode::Contextual);
    }
}
