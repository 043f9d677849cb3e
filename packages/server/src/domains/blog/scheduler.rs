//! Scheduled topic-to-article generation.
//!
//! For each leased topic: decompose into component claims, reuse cached
//! cards above the dedup threshold, run the pipeline for novel ones,
//! compose the article, and park it unpublished awaiting review. One
//! topic failing fast does not stop the others.

use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domains::agents::{composer::ComposerCard, framework, AgentContext, Composer, Decomposer, JsonMap};
use crate::domains::claims::models::ClaimCard;
use crate::domains::pipeline::PipelineOrchestrator;
use crate::kernel::ServerDeps;

use super::models::{BlogPost, TopicQueueEntry};

/// Admin-editable generation schedule. Held behind a RwLock in
/// `ServerDeps`; the cron job re-reads it on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub posts_per_day: usize,
    pub cron_hour: u8,
    pub cron_minute: u8,
    pub max_concurrent: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            posts_per_day: 1,
            cron_hour: 2,
            cron_minute: 0,
            max_concurrent: 1,
        }
    }
}

/// Outcome of one topic's generation.
#[derive(Debug, Serialize)]
pub struct GenerationReport {
    pub topic_id: Uuid,
    pub blog_post_id: Uuid,
    pub title: String,
    pub word_count: usize,
    pub claim_card_count: usize,
    pub reused_card_count: usize,
}

/// One scheduler tick: lease up to `posts_per_day` topics by priority and
/// generate them with bounded concurrency.
pub async fn run_scheduled_generation(deps: &ServerDeps) -> Result<Vec<GenerationReport>> {
    let settings = deps.scheduler_settings.read().await.clone();
    if !settings.enabled {
        tracing::debug!("scheduler disabled; skipping tick");
        return Ok(Vec::new());
    }

    let mut leased = Vec::new();
    for _ in 0..settings.posts_per_day {
        match TopicQueueEntry::lease_next_queued(&deps.db_pool).await? {
            Some(topic) => leased.push(topic),
            None => break,
        }
    }

    if leased.is_empty() {
        tracing::info!("no queued topics available for generation");
        return Ok(Vec::new());
    }

    tracing::info!(count = leased.len(), "generating articles for leased topics");

    let reports: Vec<Result<GenerationReport>> = stream::iter(leased)
        .map(|topic| async move {
            let topic_id = topic.id;
            match generate_for_topic(deps, &topic).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    // Fail fast per topic; others still run.
                    tracing::error!(topic_id = %topic_id, error = %e, "article generation failed");
                    let _ = TopicQueueEntry::mark_failed(topic_id, &e.to_string(), &deps.db_pool)
                        .await;
                    Err(e)
                }
            }
        })
        .buffer_unordered(settings.max_concurrent.max(1))
        .collect()
        .await;

    Ok(reports.into_iter().filter_map(Result::ok).collect())
}

/// Generate one article for one leased topic.
pub async fn generate_for_topic(
    deps: &ServerDeps,
    topic: &TopicQueueEntry,
) -> Result<GenerationReport> {
    let ctx = AgentContext::new(deps, None);

    // Step 1: decompose the topic into component claims.
    let mut decomposer_inputs = JsonMap::new();
    decomposer_inputs.insert("topic".to_string(), serde_json::json!(topic.topic_text));
    if let Some(feedback) = &topic.admin_feedback {
        decomposer_inputs.insert("context".to_string(), serde_json::json!(feedback));
    }

    let decomposition = framework::run(&Decomposer, &ctx, &decomposer_inputs)
        .await
        .map_err(|e| anyhow!("decomposer failed: {e}"))?;

    let component_claims: Vec<String> = decomposition
        .get("component_claims")
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();

    tracing::info!(
        topic_id = %topic.id,
        claims = component_claims.len(),
        "decomposer identified component claims"
    );

    // Step 2: resolve each component claim (reuse or generate).
    let mut claim_card_ids: Vec<Uuid> = Vec::new();
    let mut composer_cards: Vec<ComposerCard> = Vec::new();
    let mut reused = 0usize;

    for claim_text in &component_claims {
        let resolved = resolve_component_claim(deps, claim_text, &claim_card_ids).await?;
        if claim_card_ids.contains(&resolved.id) {
            tracing::debug!(card_id = %resolved.id, "skipping duplicate component card");
            continue;
        }
        if resolved.reused {
            reused += 1;
        }
        claim_card_ids.push(resolved.id);
        composer_cards.push(resolved.card);
    }

    if claim_card_ids.is_empty() {
        bail!("no claim cards could be produced for topic");
    }

    // Step 3: compose the article.
    let mut composer_inputs = JsonMap::new();
    composer_inputs.insert("topic".to_string(), serde_json::json!(topic.topic_text));
    composer_inputs.insert(
        "claim_cards".to_string(),
        serde_json::to_value(&composer_cards)?,
    );

    let composition = framework::run(&Composer, &ctx, &composer_inputs)
        .await
        .map_err(|e| anyhow!("composer failed: {e}"))?;

    let title = composition
        .get("title")
        .and_then(|v| v.as_str())
        .context("composer output missing title")?
        .to_string();
    let article_body = composition
        .get("article_body")
        .and_then(|v| v.as_str())
        .context("composer output missing article_body")?
        .to_string();
    let word_count = composition
        .get("word_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;

    // Step 4: persist the unpublished article and close out the topic.
    let post = BlogPost::create(topic.id, &title, &article_body, &claim_card_ids, &deps.db_pool)
        .await?;
    TopicQueueEntry::mark_completed(topic.id, &claim_card_ids, post.id, &deps.db_pool).await?;

    tracing::info!(
        topic_id = %topic.id,
        blog_post_id = %post.id,
        word_count,
        cards = claim_card_ids.len(),
        reused,
        "article generated, queued for review"
    );

    Ok(GenerationReport {
        topic_id: topic.id,
        blog_post_id: post.id,
        title,
        word_count,
        claim_card_count: claim_card_ids.len(),
        reused_card_count: reused,
    })
}

struct ResolvedClaim {
    id: Uuid,
    card: ComposerCard,
    reused: bool,
}

/// Reuse an existing card above the dedup threshold, or run the full
/// pipeline to create one. Cards already picked for this article are
/// excluded from the search so distinct component claims cannot collapse
/// onto one card.
async fn resolve_component_claim(
    deps: &ServerDeps,
    claim_text: &str,
    exclude_ids: &[Uuid],
) -> Result<ResolvedClaim> {
    let threshold = deps.config.scheduler_dedup_threshold;

    match deps.embedding_service.generate(claim_text).await {
        Ok(embedding) => {
            let matches =
                ClaimCard::search_by_embedding(&embedding, threshold, 1, exclude_ids, &deps.db_pool)
                    .await?;
            if let Some((card, similarity)) = matches.into_iter().next() {
                tracing::info!(card_id = %card.id, similarity, "reusing existing claim card");
                let detail = ClaimCard::find_by_id(card.id, &deps.db_pool)
                    .await?
                    .context("matched card vanished")?;
                return Ok(ResolvedClaim {
                    id: detail.card.id,
                    card: ComposerCard {
                        claim_text: detail.card.claim_text,
                        verdict: detail.card.verdict,
                        short_answer: detail.card.short_answer,
                        deep_answer: detail.card.deep_answer,
                        confidence_level: detail.card.confidence_level,
                        source_count: detail.sources.len(),
                    },
                    reused: true,
                });
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "dedup embedding failed; treating claim as novel");
        }
    }

    // Novel claim: run the full pipeline (no progress session for
    // scheduled runs).
    let orchestrator = PipelineOrchestrator::new(deps);
    let cancel = CancellationToken::new();
    let outcome = orchestrator
        .run(claim_text, None, &cancel)
        .await
        .map_err(|e| anyhow!("pipeline failed for component claim: {e}"))?;

    let card_id = outcome
        .claim_card_id
        .context("pipeline completed without a claim card")?;
    let detail = ClaimCard::find_by_id(card_id, &deps.db_pool)
        .await?
        .context("generated card not found")?;

    Ok(ResolvedClaim {
        id: card_id,
        card: ComposerCard {
            claim_text: detail.card.claim_text,
            verdict: detail.card.verdict,
            short_answer: detail.card.short_answer,
            deep_answer: detail.card.deep_answer,
            confidence_level: detail.card.confidence_level,
            source_count: detail.sources.len(),
        },
        reused: false,
    })
}
