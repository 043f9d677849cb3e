//! Content reset: generated content removed, system configuration and
//! the verified source library preserved, all in one transaction.

mod common;

use test_context::test_context;

use audit_core::domains::blog::{BlogPost, TopicQueueEntry};
use audit_core::domains::claims::models::{
    AgentPrompt, ClaimCard, NewVerifiedSource, Verdict, VerifiedSource,
};
use audit_core::domains::claims::reset_generated_content;
use audit_core::domains::routing::{NewRouterDecision, RouterDecision, RoutingMode};
use audit_core::kernel::test_support::unit_vector;

use crate::common::{insert_card, seed_agent_prompts, TestHarness};

async fn seed_generated_content(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    VerifiedSource::upsert(
        &NewVerifiedSource {
            source_type: "book".to_string(),
            title: "Misquoting Jesus".to_string(),
            author: "Bart Ehrman".to_string(),
            publisher: Some("HarperOne".to_string()),
            publication_date: Some("2005".to_string()),
            isbn: Some("9780060859510".to_string()),
            doi: None,
            url: "https://example.org/misquoting".to_string(),
            content_snippet: Some("Textual criticism of the New Testament.".to_string()),
            verification_method: "google_books".to_string(),
            verification_status: "verified".to_string(),
        },
        &unit_vector(9),
        &ctx.db_pool,
    )
    .await
    .unwrap();

    let card = insert_card(
        &ctx.db_pool,
        "Luke used Mark as a source",
        Verdict::True,
        "This claim is true.",
        &unit_vector(0),
    )
    .await
    .unwrap();

    let topic = TopicQueueEntry::create("Noah's Flood", 7, Some("manual"), &ctx.db_pool)
        .await
        .unwrap();
    let post = BlogPost::create(topic.id, "Title", "Body", &[card.card.id], &ctx.db_pool)
        .await
        .unwrap();
    TopicQueueEntry::mark_completed(topic.id, &[card.card.id], post.id, &ctx.db_pool)
        .await
        .unwrap();

    RouterDecision::insert(
        &NewRouterDecision {
            question_text: "Did Luke copy Mark?".to_string(),
            reformulated_question: "Did Luke copy Mark?".to_string(),
            conversation_context: serde_json::json!([]),
            mode_selected: RoutingMode::ExactMatch,
            claim_cards_referenced: vec![card.card.id],
            search_candidates: serde_json::json!([]),
            reasoning: None,
            response_time_ms: 12,
        },
        &ctx.db_pool,
    )
    .await
    .unwrap();
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reset_clears_generated_content_and_preserves_config(ctx: &TestHarness) {
    seed_generated_content(ctx).await;

    let prompts_before = AgentPrompt::count(&ctx.db_pool).await.unwrap();
    let sources_before = VerifiedSource::count(&ctx.db_pool).await.unwrap();
    assert!(prompts_before > 0);
    assert_eq!(sources_before, 1);

    let summary = reset_generated_content(&ctx.db_pool).await.unwrap();
    assert_eq!(summary.claim_cards, 1);
    assert_eq!(summary.blog_posts, 1);
    assert_eq!(summary.topics, 1);
    assert_eq!(summary.router_decisions, 1);

    // Generated content is gone.
    assert_eq!(ClaimCard::count(&ctx.db_pool).await.unwrap(), 0);
    assert_eq!(BlogPost::count(false, &ctx.db_pool).await.unwrap(), 0);
    assert_eq!(TopicQueueEntry::count(&ctx.db_pool).await.unwrap(), 0);
    assert_eq!(RouterDecision::count(&ctx.db_pool).await.unwrap(), 0);

    // Child rows went with their parents.
    let orphan_sources: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(orphan_sources, 0);

    // System configuration and the library are untouched.
    assert_eq!(AgentPrompt::count(&ctx.db_pool).await.unwrap(), prompts_before);
    assert_eq!(VerifiedSource::count(&ctx.db_pool).await.unwrap(), sources_before);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reset_on_empty_store_reports_zero_counts(ctx: &TestHarness) {
    let summary = reset_generated_content(&ctx.db_pool).await.unwrap();
    assert_eq!(summary.claim_cards, 0);
    assert_eq!(summary.blog_posts, 0);
    assert_eq!(summary.topics, 0);
    assert_eq!(summary.router_decisions, 0);
}
