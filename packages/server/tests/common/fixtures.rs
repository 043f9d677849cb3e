//! Test fixtures: agent prompt rows and pre-audited claim cards.

use anyhow::Result;
use sqlx::PgPool;

use audit_core::domains::claims::models::{
    AgentPrompt, ClaimCard, ClaimCardDetail, ConfidenceLevel, NewClaimCard, NewSource, Verdict,
};

/// Every agent the pipeline, router, and generation flows load.
pub const ALL_AGENTS: [&str; 8] = [
    "topic_finder",
    "source_checker",
    "adversarial_checker",
    "writer",
    "publisher",
    "router",
    "decomposer",
    "composer",
];

/// Seed a configuration row per agent.
pub async fn seed_agent_prompts(pool: &PgPool) -> Result<()> {
    for agent in ALL_AGENTS {
        AgentPrompt::upsert(
            agent,
            "anthropic",
            "claude-sonnet-4-5",
            &format!("You are the {agent} for a claim audit platform."),
            0.3,
            4096,
            pool,
        )
        .await?;
    }
    Ok(())
}

/// A verified source good enough to satisfy the store invariants.
pub fn verified_source(citation: &str) -> NewSource {
    NewSource {
        source_type: "SCHOLARLY_PEER_REVIEWED".to_string(),
        citation: citation.to_string(),
        url: "https://example.org/source".to_string(),
        quote_text: "Quoted supporting material.".to_string(),
        usage_context: "establishes the scholarly consensus".to_string(),
        verification_method: "semantic_scholar".to_string(),
        verification_status: "verified".to_string(),
        content_type: "exact_quote".to_string(),
        url_verified: true,
    }
}

/// Insert payload for a plain true-verdict card.
pub fn new_card(claim_text: &str, verdict: Verdict, short_answer: &str) -> NewClaimCard {
    NewClaimCard {
        claim_text: claim_text.to_string(),
        claimant: Some("Test Apologist".to_string()),
        claim_type: Some("history".to_string()),
        claim_type_category: Some("historical".to_string()),
        verdict,
        short_answer: short_answer.to_string(),
        deep_answer: "A longer analysis of the claim and its evidence.".to_string(),
        why_persists: vec!["familiarity".to_string(), "institutional repetition".to_string()],
        confidence_level: ConfidenceLevel::High,
        confidence_explanation: "Multiple independent verified sources agree.".to_string(),
        agent_audit: serde_json::json!({ "original_question": claim_text }),
        sources: vec![verified_source("Example, Scholarly Work (2020)")],
        apologetics_tags: vec![],
        category_tags: vec!["Canon".to_string()],
    }
}

/// Insert a pre-audited card with an explicit embedding.
pub async fn insert_card(
    pool: &PgPool,
    claim_text: &str,
    verdict: Verdict,
    short_answer: &str,
    embedding: &[f32],
) -> Result<ClaimCardDetail> {
    ClaimCard::insert_audited(&new_card(claim_text, verdict, short_answer), embedding, pool).await
}
