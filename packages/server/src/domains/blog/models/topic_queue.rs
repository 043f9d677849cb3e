//! Topic generation queue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Processing status. The QUEUED → PROCESSING transition is the lease
/// that keeps two workers off the same topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    PendingReview,
    Approved,
    Rejected,
    NeedsRevision,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "PENDING_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::NeedsRevision => "NEEDS_REVISION",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicQueueEntry {
    pub id: Uuid,
    pub topic_text: String,
    /// 1-10, higher processes sooner.
    pub priority: i32,
    pub status: String,
    pub review_status: String,
    /// Where this topic came from (manual, auto_suggest, ...).
    pub source: Option<String>,
    pub claim_card_ids: Vec<Uuid>,
    pub blog_post_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub admin_feedback: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopicQueueEntry {
    pub async fn create(
        topic_text: &str,
        priority: i32,
        source: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            INSERT INTO topic_queue (
                id, topic_text, priority, status, review_status, source,
                claim_card_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, 'QUEUED', 'PENDING_REVIEW', $4, '{}', NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(topic_text)
        .bind(priority.clamp(1, 10))
        .bind(source)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>("SELECT * FROM topic_queue WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(entry)
    }

    pub async fn list(status: Option<TopicStatus>, skip: i64, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let entries = match status {
            Some(status) => {
                sqlx::query_as::<_, TopicQueueEntry>(
                    r#"
                    SELECT * FROM topic_queue WHERE status = $1
                    ORDER BY priority DESC, created_at ASC
                    OFFSET $2 LIMIT $3
                    "#,
                )
                .bind(status.as_str())
                .bind(skip)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TopicQueueEntry>(
                    r#"
                    SELECT * FROM topic_queue
                    ORDER BY priority DESC, created_at ASC
                    OFFSET $1 LIMIT $2
                    "#,
                )
                .bind(skip)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(entries)
    }

    /// Take the processing lease on the highest-priority queued topic.
    /// The conditional status transition IS the lease; a topic another
    /// worker already leased no longer matches the WHERE clause.
    pub async fn lease_next_queued(pool: &PgPool) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            UPDATE topic_queue
            SET status = 'PROCESSING', updated_at = NOW()
            WHERE id = (
                SELECT id FROM topic_queue
                WHERE status = 'QUEUED'
                ORDER BY priority DESC, created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(pool)
        .await?;
        Ok(entry)
    }

    /// Success: record the produced cards and article, await review.
    pub async fn mark_completed(
        id: Uuid,
        claim_card_ids: &[Uuid],
        blog_post_id: Uuid,
        pool: &PgPool,
    ) -> Result<Self> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            UPDATE topic_queue
            SET status = 'COMPLETED', review_status = 'PENDING_REVIEW',
                claim_card_ids = $2, blog_post_id = $3, error_message = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(claim_card_ids.to_vec())
        .bind(blog_post_id)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    /// Failure is terminal unless a reviewer requeues with feedback.
    pub async fn mark_failed(id: Uuid, error_message: &str, pool: &PgPool) -> Result<Self> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            UPDATE topic_queue
            SET status = 'FAILED', error_message = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error_message)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    pub async fn set_review_status(
        id: Uuid,
        review_status: ReviewStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            UPDATE topic_queue
            SET review_status = $2, reviewed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(review_status.as_str())
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    /// Reviewer sends the topic back through generation with feedback.
    pub async fn requeue_for_revision(
        id: Uuid,
        admin_feedback: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let entry = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            UPDATE topic_queue
            SET status = 'QUEUED', review_status = 'NEEDS_REVISION',
                admin_feedback = $2, error_message = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_feedback)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    pub async fn list_pending_review(pool: &PgPool) -> Result<Vec<Self>> {
        let entries = sqlx::query_as::<_, TopicQueueEntry>(
            r#"
            SELECT * FROM topic_queue
            WHERE status = 'COMPLETED' AND review_status = 'PENDING_REVIEW'
            ORDER BY updated_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }

    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM topic_queue WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topic_queue")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
