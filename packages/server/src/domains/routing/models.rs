//! Router decision log (append-only).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Response modes. Stored as the canonical uppercase constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingMode {
    ExactMatch,
    Contextual,
    NovelClaim,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "EXACT_MATCH",
            Self::Contextual => "CONTEXTUAL",
            Self::NovelClaim => "NOVEL_CLAIM",
        }
    }
}

/// One routing decision, logged for every ask regardless of mode.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RouterDecision {
    pub id: Uuid,
    pub question_text: String,
    pub reformulated_question: String,
    /// Recent history snapshot.
    pub conversation_context: serde_json::Value,
    pub mode_selected: String,
    pub claim_cards_referenced: Vec<Uuid>,
    /// Candidates from search_existing_claims; `[]` when the search
    /// returned nothing.
    pub search_candidates: serde_json::Value,
    /// Reasoning excerpt, capped at 500 chars.
    pub reasoning: Option<String>,
    pub response_time_ms: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a decision row.
#[derive(Debug, Clone)]
pub struct NewRouterDecision {
    pub question_text: String,
    pub reformulated_question: String,
    pub conversation_context: serde_json::Value,
    pub mode_selected: RoutingMode,
    pub claim_cards_referenced: Vec<Uuid>,
    pub search_candidates: serde_json::Value,
    pub reasoning: Option<String>,
    pub response_time_ms: i32,
}

impl RouterDecision {
    pub async fn insert(new: &NewRouterDecision, pool: &PgPool) -> Result<Self> {
        let reasoning = new
            .reasoning
            .as_ref()
            .map(|r| r.chars().take(500).collect::<String>());

        let decision = sqlx::query_as::<_, RouterDecision>(
            r#"
            INSERT INTO router_decisions (
                id, question_text, reformulated_question, conversation_context,
                mode_selected, claim_cards_referenced, search_candidates,
                reasoning, response_time_ms, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.question_text)
        .bind(&new.reformulated_question)
        .bind(&new.conversation_context)
        .bind(new.mode_selected.as_str())
        .bind(&new.claim_cards_referenced)
        .bind(&new.search_candidates)
        .bind(reasoning)
        .bind(new.response_time_ms)
        .fetch_one(pool)
        .await?;
        Ok(decision)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let decision =
            sqlx::query_as::<_, RouterDecision>("SELECT * FROM router_decisions WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(decision)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM router_decisions")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
