//! ClaimCard - the atomic audit record.
//!
//! All claim-card SQL lives here. The embedding column is written and
//! searched but never selected into the struct; similarity queries return
//! it only as a score.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, QueryBuilder, Row};
use uuid::Uuid;

use crate::kernel::BaseEmbeddingService;

use super::enums::{verdict_matches_prose, ConfidenceLevel, Verdict};
use super::source::{NewSource, Source};
use super::tags::{ApologeticsTag, CategoryTag};

/// Columns selected into `ClaimCard` (everything but the vector).
const CARD_COLUMNS: &str = "id, claim_text, claimant, claim_type, claim_type_category, verdict, \
     short_answer, deep_answer, why_persists, confidence_level, confidence_explanation, \
     agent_audit, visible_in_audits, created_at, updated_at";

/// An audited claim.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClaimCard {
    pub id: Uuid,
    /// Normalized affirmative statement whose truth the card evaluates.
    pub claim_text: String,
    pub claimant: Option<String>,
    /// Free-form technical tag (history, science, doctrine, ...).
    pub claim_type: Option<String>,
    /// historical | epistemology | interpretation | theological | textual
    pub claim_type_category: Option<String>,
    /// Canonical uppercase verdict constant.
    pub verdict: String,
    pub short_answer: String,
    pub deep_answer: String,
    /// Ordered list of short strings.
    pub why_persists: JsonValue,
    pub confidence_level: String,
    pub confidence_explanation: String,
    /// Per-agent execution trace keyed by agent name.
    pub agent_audit: JsonValue,
    pub visible_in_audits: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A card with its owned satellites eagerly loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimCardDetail {
    #[serde(flatten)]
    pub card: ClaimCard,
    pub sources: Vec<Source>,
    pub apologetics_tags: Vec<ApologeticsTag>,
    pub category_tags: Vec<CategoryTag>,
}

/// Insert payload assembled by the Publisher from pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaimCard {
    pub claim_text: String,
    #[serde(default)]
    pub claimant: Option<String>,
    #[serde(default)]
    pub claim_type: Option<String>,
    #[serde(default)]
    pub claim_type_category: Option<String>,
    pub verdict: Verdict,
    pub short_answer: String,
    pub deep_answer: String,
    #[serde(default)]
    pub why_persists: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    pub confidence_explanation: String,
    pub agent_audit: JsonValue,
    pub sources: Vec<NewSource>,
    #[serde(default)]
    pub apologetics_tags: Vec<(String, Option<String>)>,
    #[serde(default)]
    pub category_tags: Vec<String>,
}

/// Filters for the public audits listing.
#[derive(Debug, Clone, Default)]
pub struct AuditFilters {
    pub category: Option<String>,
    pub verdict: Option<String>,
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl ClaimCard {
    /// Persist a fully audited card with its sources and tag links in one
    /// transaction. The embedding must have been computed from the exact
    /// `claim_text` beforehand.
    pub async fn insert_audited(
        new: &NewClaimCard,
        embedding: &[f32],
        pool: &PgPool,
    ) -> Result<ClaimCardDetail> {
        if new.claim_text.trim().is_empty() {
            bail!("claim_text cannot be empty");
        }
        if new.short_answer.trim().is_empty() {
            bail!("short_answer cannot be empty");
        }
        if new.sources.is_empty() {
            bail!("a claim card requires at least one source");
        }
        if !verdict_matches_prose(new.verdict, &new.short_answer) {
            bail!(
                "verdict {} is inconsistent with short_answer opening",
                new.verdict.as_str()
            );
        }
        for source in &new.sources {
            // Unverified model-memory sources must not carry URLs.
            if source.verification_method == "llm_unverified" && !source.url.is_empty() {
                bail!("llm_unverified source carries a URL: {}", source.citation);
            }
            // A fully verified source must carry an exact quote; anything
            // less is at most partially verified. Catches tier and agent
            // bugs before they persist.
            let has_exact_quote =
                source.content_type == "exact_quote" && !source.quote_text.is_empty();
            let non_verified = matches!(
                source.verification_status.as_str(),
                "partially_verified" | "unverified"
            );
            if !has_exact_quote && !non_verified {
                bail!(
                    "source '{}' is marked verified without an exact quote",
                    source.citation
                );
            }
        }

        let mut tx = pool.begin().await?;

        let card = sqlx::query_as::<_, ClaimCard>(&format!(
            r#"
            INSERT INTO claim_cards (
                id, claim_text, claimant, claim_type, claim_type_category,
                verdict, short_answer, deep_answer, why_persists,
                confidence_level, confidence_explanation, agent_audit,
                embedding, visible_in_audits, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE, NOW(), NOW())
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.claim_text)
        .bind(&new.claimant)
        .bind(&new.claim_type)
        .bind(&new.claim_type_category)
        .bind(new.verdict.as_str())
        .bind(&new.short_answer)
        .bind(&new.deep_answer)
        .bind(serde_json::json!(new.why_persists))
        .bind(new.confidence_level.as_str())
        .bind(&new.confidence_explanation)
        .bind(&new.agent_audit)
        .bind(Vector::from(embedding.to_vec()))
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert claim card")?;

        let mut sources = Vec::with_capacity(new.sources.len());
        for source in &new.sources {
            sources.push(Source::insert_for_card(card.id, source, &mut *tx).await?);
        }

        let mut apologetics_tags = Vec::with_capacity(new.apologetics_tags.len());
        for (name, description) in &new.apologetics_tags {
            apologetics_tags.push(
                ApologeticsTag::insert_for_card(card.id, name, description.as_deref(), &mut *tx)
                    .await?,
            );
        }

        let mut category_tags = Vec::with_capacity(new.category_tags.len());
        for name in &new.category_tags {
            category_tags.push(CategoryTag::insert_for_card(card.id, name, None, &mut *tx).await?);
        }

        tx.commit().await?;

        Ok(ClaimCardDetail {
            card,
            sources,
            apologetics_tags,
            category_tags,
        })
    }

    /// Fetch a card with sources and tags eagerly loaded.
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<ClaimCardDetail>> {
        let card = sqlx::query_as::<_, ClaimCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM claim_cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(card) = card else {
            return Ok(None);
        };

        let sources = Source::find_by_claim_card(card.id, pool).await?;
        let apologetics_tags = ApologeticsTag::find_by_claim_card(card.id, pool).await?;
        let category_tags = CategoryTag::find_by_claim_card(card.id, pool).await?;

        Ok(Some(ClaimCardDetail {
            card,
            sources,
            apologetics_tags,
            category_tags,
        }))
    }

    /// Semantic search over card embeddings.
    ///
    /// Returns `(card, similarity)` ordered by descending cosine
    /// similarity, ties broken by newer `created_at`. `exclude_ids` keeps
    /// already-picked cards out (intra-article deduplication).
    pub async fn search_by_embedding(
        embedding: &[f32],
        threshold: f64,
        limit: i64,
        exclude_ids: &[Uuid],
        pool: &PgPool,
    ) -> Result<Vec<(ClaimCard, f64)>> {
        let query_vector = Vector::from(embedding.to_vec());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {CARD_COLUMNS}, 1 - (embedding <=> $1) AS similarity
            FROM claim_cards
            WHERE embedding IS NOT NULL
              AND 1 - (embedding <=> $1) >= $2
              AND NOT (id = ANY($3))
            ORDER BY embedding <=> $1, created_at DESC
            LIMIT $4
            "#
        ))
        .bind(&query_vector)
        .bind(threshold)
        .bind(exclude_ids.to_vec())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("semantic search failed")?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let similarity: f64 = row.try_get("similarity")?;
            let card = ClaimCard::from_row(&row)?;
            results.push((card, similarity));
        }
        Ok(results)
    }

    /// Paginated public audits listing (visible cards only).
    pub async fn list_for_audits(filters: &AuditFilters, pool: &PgPool) -> Result<Vec<Self>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {CARD_COLUMNS} FROM claim_cards WHERE visible_in_audits = TRUE"
        ));

        if let Some(verdict) = &filters.verdict {
            builder.push(" AND verdict = ").push_bind(verdict.clone());
        }
        if let Some(search) = &filters.search {
            builder
                .push(" AND claim_text ILIKE ")
                .push_bind(format!("%{search}%"));
        }
        if let Some(category) = &filters.category {
            builder
                .push(" AND id IN (SELECT claim_card_id FROM category_tags WHERE category_name = ")
                .push_bind(category.clone())
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(filters.skip)
            .push(" LIMIT ")
            .push_bind(filters.limit.max(1));

        let cards = builder.build_query_as::<ClaimCard>().fetch_all(pool).await?;
        Ok(cards)
    }

    pub async fn count_for_audits(filters: &AuditFilters, pool: &PgPool) -> Result<i64> {
        let mut builder =
            QueryBuilder::new("SELECT COUNT(*) FROM claim_cards WHERE visible_in_audits = TRUE");

        if let Some(verdict) = &filters.verdict {
            builder.push(" AND verdict = ").push_bind(verdict.clone());
        }
        if let Some(search) = &filters.search {
            builder
                .push(" AND claim_text ILIKE ")
                .push_bind(format!("%{search}%"));
        }
        if let Some(category) = &filters.category {
            builder
                .push(" AND id IN (SELECT claim_card_id FROM category_tags WHERE category_name = ")
                .push_bind(category.clone())
                .push(")");
        }

        let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
        Ok(count)
    }

    /// Rewrite `claim_text`, regenerating the embedding from the new text
    /// inside the same transaction.
    pub async fn update_claim_text(
        id: Uuid,
        new_text: &str,
        embeddings: &dyn BaseEmbeddingService,
        pool: &PgPool,
    ) -> Result<Self> {
        if new_text.trim().is_empty() {
            bail!("claim_text cannot be empty");
        }

        let embedding = embeddings
            .generate(new_text)
            .await
            .context("failed to re-embed updated claim text")?;

        let mut tx = pool.begin().await?;
        let card = sqlx::query_as::<_, ClaimCard>(&format!(
            r#"
            UPDATE claim_cards
            SET claim_text = $2, embedding = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new_text)
        .bind(Vector::from(embedding))
        .fetch_one(&mut *tx)
        .await
        .context("claim card not found")?;
        tx.commit().await?;

        Ok(card)
    }

    /// Stored embedding for a card, if any. Used by tests and the
    /// re-embedding maintenance path.
    pub async fn embedding_of(id: Uuid, pool: &PgPool) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query("SELECT embedding FROM claim_cards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row
            .and_then(|r| r.try_get::<Option<Vector>, _>("embedding").ok().flatten())
            .map(|v| v.to_vec()))
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claim_cards")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Cards whose embedding is missing (backfill maintenance).
    pub async fn list_missing_embeddings(pool: &PgPool) -> Result<Vec<Self>> {
        let cards = sqlx::query_as::<_, ClaimCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM claim_cards WHERE embedding IS NULL ORDER BY created_at"
        ))
        .fetch_all(pool)
        .await?;
        Ok(cards)
    }

    pub async fn set_embedding(id: Uuid, embedding: &[f32], pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE claim_cards SET embedding = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(Vector::from(embedding.to_vec()))
            .execute(pool)
            .await?;
        Ok(())
    }
}
