use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Source supporting a claim card verdict. Owned by the card, deleted
/// with it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub claim_card_id: Uuid,
    /// 'PRIMARY_HISTORICAL' | 'SCHOLARLY_PEER_REVIEWED'
    pub source_type: String,
    pub citation: String,
    /// Empty string rather than a guessed URL.
    pub url: String,
    pub quote_text: String,
    /// "used to establish X" note, required by the Source Checker.
    pub usage_context: String,
    /// library_reuse | google_books | semantic_scholar | arxiv | pubmed |
    /// ccel | perseus | tavily | llm_unverified
    pub verification_method: String,
    /// verified | partially_verified | unverified
    pub verification_status: String,
    /// exact_quote | verified_paraphrase | unverified_content
    pub content_type: String,
    pub url_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a source; the card id is assigned at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub source_type: String,
    pub citation: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub quote_text: String,
    pub usage_context: String,
    pub verification_method: String,
    pub verification_status: String,
    pub content_type: String,
    #[serde(default)]
    pub url_verified: bool,
}

impl Source {
    pub async fn insert_for_card(
        claim_card_id: Uuid,
        new: &NewSource,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let source = sqlx::query_as::<_, Source>(
            r#"
            INSERT INTO sources (
                id, claim_card_id, source_type, citation, url, quote_text,
                usage_context, verification_method, verification_status,
                content_type, url_verified, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(claim_card_id)
        .bind(&new.source_type)
        .bind(&new.citation)
        .bind(&new.url)
        .bind(&new.quote_text)
        .bind(&new.usage_context)
        .bind(&new.verification_method)
        .bind(&new.verification_status)
        .bind(&new.content_type)
        .bind(new.url_verified)
        .fetch_one(conn)
        .await?;
        Ok(source)
    }

    pub async fn find_by_claim_card(
        claim_card_id: Uuid,
        pool: &sqlx::PgPool,
    ) -> Result<Vec<Self>> {
        let sources = sqlx::query_as::<_, Source>(
            "SELECT * FROM sources WHERE claim_card_id = $1 ORDER BY created_at",
        )
        .bind(claim_card_id)
        .fetch_all(pool)
        .await?;
        Ok(sources)
    }
}
