//! Content reset.
//!
//! Deletes all generated content in one transaction while preserving
//! system configuration (agent_prompts) and the verified source library.
//! Deletion order respects foreign keys: children before parents.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;

/// Per-table counts removed by a reset.
#[derive(Debug, Clone, Serialize)]
pub struct ResetSummary {
    pub claim_cards: i64,
    pub blog_posts: i64,
    pub topics: i64,
    pub router_decisions: i64,
}

/// Delete all claim cards (cascading sources and tag links), blog posts,
/// queued topics, and router decisions. Rolls back on any error, leaving
/// the store unchanged.
pub async fn reset_generated_content(pool: &PgPool) -> Result<ResetSummary> {
    let mut tx = pool.begin().await.context("failed to open reset transaction")?;

    let claim_cards: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claim_cards")
        .fetch_one(&mut *tx)
        .await?;
    let blog_posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(&mut *tx)
        .await?;
    let topics: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topic_queue")
        .fetch_one(&mut *tx)
        .await?;
    let router_decisions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM router_decisions")
        .fetch_one(&mut *tx)
        .await?;

    // FK order: decisions and posts first, then card satellites, then
    // cards, then topics (blog_post_id FK is SET NULL by the post delete).
    sqlx::query("DELETE FROM router_decisions")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM blog_posts").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sources").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM apologetics_tags")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM category_tags").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM claim_cards").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM topic_queue").execute(&mut *tx).await?;

    tx.commit().await.context("reset transaction failed to commit")?;

    tracing::info!(
        claim_cards,
        blog_posts,
        topics,
        router_decisions,
        "generated content reset; agent prompts and verified sources preserved"
    );

    Ok(ResetSummary {
        claim_cards,
        blog_posts,
        topics,
        router_decisions,
    })
}
