//! Generated articles. Unpublished until a reviewer approves.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: Uuid,
    /// Originating topic; nulled if the topic is deleted.
    pub topic_queue_id: Option<Uuid>,
    pub title: String,
    /// Synthesized narrative prose (500-1500 words).
    pub article_body: String,
    /// Component cards referenced in the body, in order.
    pub claim_card_ids: Vec<Uuid>,
    /// NULL until a reviewer approves.
    pub published_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    pub async fn create(
        topic_queue_id: Uuid,
        title: &str,
        article_body: &str,
        claim_card_ids: &[Uuid],
        pool: &PgPool,
    ) -> Result<Self> {
        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            INSERT INTO blog_posts (
                id, topic_queue_id, title, article_body, claim_card_ids,
                published_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, NULL, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(topic_queue_id)
        .bind(title)
        .bind(article_body)
        .bind(claim_card_ids.to_vec())
        .fetch_one(pool)
        .await?;
        Ok(post)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(post)
    }

    /// Public read listing: published posts only.
    pub async fn list(published_only: bool, skip: i64, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let posts = if published_only {
            sqlx::query_as::<_, BlogPost>(
                r#"
                SELECT * FROM blog_posts
                WHERE published_at IS NOT NULL
                ORDER BY published_at DESC
                OFFSET $1 LIMIT $2
                "#,
            )
            .bind(skip)
            .bind(limit)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, BlogPost>(
                "SELECT * FROM blog_posts ORDER BY created_at DESC OFFSET $1 LIMIT $2",
            )
            .bind(skip)
            .bind(limit)
            .fetch_all(pool)
            .await?
        };
        Ok(posts)
    }

    pub async fn publish(
        id: Uuid,
        reviewed_by: &str,
        review_notes: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts
            SET published_at = NOW(), reviewed_by = $2,
                review_notes = COALESCE($3, review_notes), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reviewed_by)
        .bind(review_notes)
        .fetch_optional(pool)
        .await?;
        Ok(post)
    }

    pub async fn unpublish(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts
            SET published_at = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(post)
    }

    pub async fn count(published_only: bool, pool: &PgPool) -> Result<i64> {
        let count: i64 = if published_only {
            sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts WHERE published_at IS NOT NULL")
                .fetch_one(pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts")
                .fetch_one(pool)
                .await?
        };
        Ok(count)
    }
}
