//! Router tool implementations.
//!
//! The three tools the routing model may call, resolved against the
//! claim store: semantic candidate search, full-card lookup, and a
//! pipeline reservation for novel claims.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use llm_client::{ToolCall, ToolError, ToolExecutor, ToolSpec};

use crate::domains::claims::models::ClaimCard;
use crate::kernel::ServerDeps;

/// Retrieval floor for candidate search. Deliberately below the decision
/// thresholds so the mode rule sees mid-similarity candidates too.
pub const SEARCH_FLOOR: f64 = 0.5;
/// Default candidate count.
pub const SEARCH_LIMIT: i64 = 5;

pub const TOOL_SEARCH: &str = "search_existing_claims";
pub const TOOL_DETAILS: &str = "get_claim_details";
pub const TOOL_GENERATE: &str = "generate_new_claim";

/// Candidate summary returned by the search tool and logged on every
/// router decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub claim_id: Uuid,
    pub claim_text: String,
    pub short_answer: String,
    pub similarity: f64,
    pub claim_type: Option<String>,
    pub claim_type_category: Option<String>,
    pub verdict: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// The search query (use the reformulated question).
    query: String,
    /// Maximum number of candidates to return.
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DetailsArgs {
    /// UUID of the claim card to retrieve.
    claim_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GenerateArgs {
    /// The claim requiring a new audit.
    claim_text: String,
    /// Brief explanation of why this is novel.
    #[serde(default)]
    reasoning: String,
}

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).expect("tool schemas serialize")
}

/// Tool specs offered to the routing model.
pub fn router_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            TOOL_SEARCH,
            "Search for existing claim cards that might answer the user's question. Returns \
             candidate cards with similarity scores. ALWAYS call this first, before any other \
             tool or any conclusion.",
            schema_of::<SearchArgs>(),
        ),
        ToolSpec::new(
            TOOL_DETAILS,
            "Retrieve full details of a specific claim card by ID. Use when you need more \
             context about a candidate, or to compare several cards for a contextual answer.",
            schema_of::<DetailsArgs>(),
        ),
        ToolSpec::new(
            TOOL_GENERATE,
            "Reserve a full audit pipeline run for a genuinely NOVEL claim not answered by \
             existing cards. Be conservative.",
            schema_of::<GenerateArgs>(),
        ),
    ]
}

/// Resolves router tool calls against the store.
pub struct RouterService<'a> {
    deps: &'a ServerDeps,
}

impl<'a> RouterService<'a> {
    pub fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    async fn search_existing_claims(&self, args: SearchArgs) -> Result<serde_json::Value, ToolError> {
        let embedding = self
            .deps
            .embedding_service
            .generate(&args.query)
            .await
            .map_err(|e| ToolError(format!("embedding failed: {e}")))?;

        let limit = args.limit.unwrap_or(SEARCH_LIMIT).clamp(1, 20);
        let results = ClaimCard::search_by_embedding(
            &embedding,
            SEARCH_FLOOR,
            limit,
            &[],
            &self.deps.db_pool,
        )
        .await
        .map_err(|e| ToolError(format!("semantic search failed: {e}")))?;

        let candidates: Vec<CandidateSummary> = results
            .into_iter()
            .map(|(card, similarity)| CandidateSummary {
                claim_id: card.id,
                claim_text: card.claim_text,
                short_answer: card.short_answer,
                similarity,
                claim_type: card.claim_type,
                claim_type_category: card.claim_type_category,
                verdict: card.verdict,
            })
            .collect();

        Ok(serde_json::json!({
            "status": "success",
            "count": candidates.len(),
            "results": candidates,
        }))
    }

    async fn get_claim_details(&self, args: DetailsArgs) -> Result<serde_json::Value, ToolError> {
        let Ok(claim_id) = Uuid::parse_str(&args.claim_id) else {
            return Ok(serde_json::json!({
                "status": "not_found",
                "message": format!("'{}' is not a valid claim id", args.claim_id),
            }));
        };

        let detail = ClaimCard::find_by_id(claim_id, &self.deps.db_pool)
            .await
            .map_err(|e| ToolError(format!("claim lookup failed: {e}")))?;

        match detail {
            Some(detail) => Ok(serde_json::json!({
                "status": "success",
                "claim": {
                    "claim_id": detail.card.id,
                    "claim_text": detail.card.claim_text,
                    "claimant": detail.card.claimant,
                    "claim_type": detail.card.claim_type,
                    "claim_type_category": detail.card.claim_type_category,
                    "verdict": detail.card.verdict,
                    "short_answer": detail.card.short_answer,
                    "deep_answer": detail.card.deep_answer,
                    "confidence_level": detail.card.confidence_level,
                    "confidence_explanation": detail.card.confidence_explanation,
                    "why_persists": detail.card.why_persists,
                    "created_at": detail.card.created_at,
                },
            })),
            None => Ok(serde_json::json!({
                "status": "not_found",
                "message": format!("Claim with ID {claim_id} not found"),
            })),
        }
    }

    fn generate_new_claim(&self, args: GenerateArgs) -> serde_json::Value {
        // The reservation is honored by the ask flow, which starts the
        // pipeline when the final mode is NOVEL_CLAIM.
        serde_json::json!({
            "status": "triggered",
            "reservation_id": Uuid::new_v4(),
            "claim_text": args.claim_text,
            "reasoning": args.reasoning,
        })
    }
}

#[async_trait]
impl ToolExecutor for RouterService<'_> {
    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let parse = |e: serde_json::Error| ToolError(format!("bad arguments: {e}"));

        match call.name.as_str() {
            TOOL_SEARCH => {
                let args: SearchArgs =
                    serde_json::from_value(call.arguments.clone()).map_err(parse)?;
                self.search_existing_claims(args).await
            }
            TOOL_DETAILS => {
                let args: DetailsArgs =
                    serde_json::from_value(call.arguments.clone()).map_err(parse)?;
                self.get_claim_details(args).await
            }
            TOOL_GENERATE => {
                let args: GenerateArgs =
                    serde_json::from_value(call.arguments.clone()).map_err(parse)?;
                Ok(self.generate_new_claim(args))
            }
            other => Err(ToolError(format!("unknown tool '{other}'"))),
        }
    }
}
