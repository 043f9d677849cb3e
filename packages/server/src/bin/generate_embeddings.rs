//! Backfill missing claim-card embeddings.
//!
//! One-shot maintenance tool: finds cards whose embedding column is NULL
//! (imports, partial failures) and regenerates each from its claim text.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use audit_core::config::Config;
use audit_core::domains::claims::models::ClaimCard;
use audit_core::kernel::{BaseEmbeddingService, EmbeddingService};
use llm_client::LlmClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    let llm = Arc::new(LlmClient::new(config.openai_api_key.clone(), None));
    let embeddings = EmbeddingService::new(llm);

    let missing = ClaimCard::list_missing_embeddings(&pool).await?;
    let total = missing.len();
    tracing::info!(total, "cards missing embeddings");

    let mut updated = 0usize;
    let mut failed = 0usize;

    for (i, card) in missing.iter().enumerate() {
        tracing::info!(progress = format!("{}/{}", i + 1, total), card_id = %card.id, "embedding card");

        match embeddings.generate(&card.claim_text).await {
            Ok(embedding) => match ClaimCard::set_embedding(card.id, &embedding, &pool).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(card_id = %card.id, error = %e, "failed to store embedding");
                }
            },
            Err(e) => {
                failed += 1;
                tracing::error!(card_id = %card.id, error = %e, "failed to generate embedding");
            }
        }

        // Stay under the embedding API rate limits.
        if i + 1 < total {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    tracing::info!(updated, failed, total, "embedding backfill complete");
    Ok(())
}
