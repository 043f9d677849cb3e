//! Verified source library (Tier 0 of source verification).
//!
//! Long-lived catalog of externally verified books, papers, and ancient
//! texts. Stores metadata and a topic embedding, never claim-specific
//! quotes. Survives content resets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

const VS_COLUMNS: &str = "id, source_type, title, author, publisher, publication_date, isbn, \
     doi, url, content_snippet, topic_keywords, verification_method, verification_status, \
     created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerifiedSource {
    pub id: Uuid,
    /// book | paper | ancient_text
    pub source_type: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
    /// Verified working URL; never empty in the library.
    pub url: String,
    pub content_snippet: Option<String>,
    pub topic_keywords: Vec<String>,
    pub verification_method: String,
    pub verification_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a library entry.
#[derive(Debug, Clone)]
pub struct NewVerifiedSource {
    pub source_type: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
    pub url: String,
    pub content_snippet: Option<String>,
    pub verification_method: String,
    pub verification_status: String,
}

impl VerifiedSource {
    /// Upsert keyed by normalized identifier: ISBN or DOI when present,
    /// else (title, author). Conflicts keep the existing row and refresh
    /// its snippet/url.
    pub async fn upsert(
        new: &NewVerifiedSource,
        embedding: &[f32],
        pool: &PgPool,
    ) -> Result<Self> {
        if let Some(existing) = Self::find_by_identifier(new, pool).await? {
            let updated = sqlx::query_as::<_, VerifiedSource>(&format!(
                r#"
                UPDATE verified_sources
                SET url = $2, content_snippet = COALESCE($3, content_snippet), updated_at = NOW()
                WHERE id = $1
                RETURNING {VS_COLUMNS}
                "#
            ))
            .bind(existing.id)
            .bind(&new.url)
            .bind(&new.content_snippet)
            .fetch_one(pool)
            .await?;
            return Ok(updated);
        }

        let title = truncate(&new.title, 1000);
        let author = truncate(&new.author, 500);
        let keywords = vec![title.clone(), author.clone()];

        let source = sqlx::query_as::<_, VerifiedSource>(&format!(
            r#"
            INSERT INTO verified_sources (
                id, source_type, title, author, publisher, publication_date,
                isbn, doi, url, content_snippet, topic_keywords, embedding,
                verification_method, verification_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW(), NOW())
            RETURNING {VS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.source_type)
        .bind(&title)
        .bind(&author)
        .bind(new.publisher.as_deref().map(|p| truncate(p, 500)))
        .bind(&new.publication_date)
        .bind(&new.isbn)
        .bind(&new.doi)
        .bind(&new.url)
        .bind(&new.content_snippet)
        .bind(&keywords)
        .bind(Vector::from(embedding.to_vec()))
        .bind(&new.verification_method)
        .bind(&new.verification_status)
        .fetch_one(pool)
        .await
        .context("failed to insert verified source")?;

        Ok(source)
    }

    async fn find_by_identifier(new: &NewVerifiedSource, pool: &PgPool) -> Result<Option<Self>> {
        if let Some(isbn) = &new.isbn {
            let found = sqlx::query_as::<_, VerifiedSource>(&format!(
                "SELECT {VS_COLUMNS} FROM verified_sources WHERE isbn = $1"
            ))
            .bind(isbn)
            .fetch_optional(pool)
            .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        if let Some(doi) = &new.doi {
            let found = sqlx::query_as::<_, VerifiedSource>(&format!(
                "SELECT {VS_COLUMNS} FROM verified_sources WHERE doi = $1"
            ))
            .bind(doi)
            .fetch_optional(pool)
            .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        let found = sqlx::query_as::<_, VerifiedSource>(&format!(
            "SELECT {VS_COLUMNS} FROM verified_sources WHERE lower(title) = lower($1) AND lower(author) = lower($2)"
        ))
        .bind(truncate(&new.title, 1000))
        .bind(truncate(&new.author, 500))
        .fetch_optional(pool)
        .await?;
        Ok(found)
    }

    /// Semantic search over library topic embeddings.
    pub async fn search_by_similarity(
        embedding: &[f32],
        threshold: f64,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<(Self, f64)>> {
        let query_vector = Vector::from(embedding.to_vec());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {VS_COLUMNS}, 1 - (embedding <=> $1) AS similarity
            FROM verified_sources
            WHERE embedding IS NOT NULL
              AND 1 - (embedding <=> $1) >= $2
            ORDER BY embedding <=> $1
            LIMIT $3
            "#
        ))
        .bind(&query_vector)
        .bind(threshold)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let similarity: f64 = row.try_get("similarity")?;
            let source = VerifiedSource::from_row(&row)?;
            results.push((source, similarity));
        }
        Ok(results)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verified_sources")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
