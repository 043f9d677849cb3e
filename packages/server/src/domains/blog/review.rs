//! Review gating for generated articles.
//!
//! Nothing the scheduler produces is publicly visible until a reviewer
//! approves it. Rejection keeps the component claim cards (they stay in
//! the audits surface); revision requests requeue the topic with
//! feedback.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sqlx::PgPool;

use super::models::{BlogPost, ReviewStatus, TopicQueueEntry, TopicStatus};

/// What a revision request targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target", content = "claim_id")]
pub enum RevisionTarget {
    Decomposer,
    Composer,
    Claim(Uuid),
}

impl RevisionTarget {
    fn describe(&self) -> String {
        match self {
            Self::Decomposer => "revise decomposition".to_string(),
            Self::Composer => "revise composition".to_string(),
            Self::Claim(id) => format!("revise component claim {id}"),
        }
    }
}

/// Approve: publish the article and close the review.
pub async fn approve(
    topic_id: Uuid,
    reviewed_by: &str,
    review_notes: Option<&str>,
    pool: &PgPool,
) -> Result<(TopicQueueEntry, BlogPost)> {
    let topic = TopicQueueEntry::find_by_id(topic_id, pool)
        .await?
        .context("topic not found")?;

    if topic.status != TopicStatus::Completed.as_str() {
        bail!("topic is not completed (status: {})", topic.status);
    }
    let post_id = topic.blog_post_id.context("topic has no generated article")?;

    let post = BlogPost::publish(post_id, reviewed_by, review_notes, pool)
        .await?
        .context("blog post not found")?;
    let topic = TopicQueueEntry::set_review_status(topic_id, ReviewStatus::Approved, pool).await?;

    tracing::info!(topic_id = %topic_id, blog_post_id = %post_id, "article approved and published");
    Ok((topic, post))
}

/// Reject: the article stays unpublished; component claim cards are kept.
pub async fn reject(
    topic_id: Uuid,
    _reviewed_by: &str,
    pool: &PgPool,
) -> Result<TopicQueueEntry> {
    let topic = TopicQueueEntry::find_by_id(topic_id, pool)
        .await?
        .context("topic not found")?;

    if let Some(post_id) = topic.blog_post_id {
        BlogPost::unpublish(post_id, pool).await?;
    }
    let topic = TopicQueueEntry::set_review_status(topic_id, ReviewStatus::Rejected, pool).await?;

    tracing::info!(topic_id = %topic_id, "article rejected; claim cards retained");
    Ok(topic)
}

/// Request revision: the topic goes back through generation with the
/// reviewer's feedback attached.
pub async fn request_revision(
    topic_id: Uuid,
    target: RevisionTarget,
    feedback: &str,
    pool: &PgPool,
) -> Result<TopicQueueEntry> {
    TopicQueueEntry::find_by_id(topic_id, pool)
        .await?
        .context("topic not found")?;

    let annotated = format!("[{}] {}", target.describe(), feedback);
    let topic = TopicQueueEntry::requeue_for_revision(topic_id, &annotated, pool).await?;

    tracing::info!(topic_id = %topic_id, "topic requeued for revision");
    Ok(topic)
}
