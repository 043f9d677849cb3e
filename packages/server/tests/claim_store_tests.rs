//! Integration tests for the claim store: insert/find round trip,
//! invariants at insert time, semantic search, and embedding freshness.

mod common;

use test_context::test_context;
use uuid::Uuid;

use audit_core::domains::claims::models::{AuditFilters, ClaimCard, Verdict};
use audit_core::kernel::test_support::{unit_vector, vector_with_similarity, MockEmbeddingService};
use audit_core::kernel::{BaseEmbeddingService, EMBEDDING_DIM};

use crate::common::{insert_card, new_card, TestHarness};

// =============================================================================
// Insert / find round trip
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_then_find_returns_equivalent_card(ctx: &TestHarness) {
    let inserted = insert_card(
        &ctx.db_pool,
        "Luke used Mark as a source",
        Verdict::True,
        "This claim is true: the verbal overlap is extensive.",
        &unit_vector(0),
    )
    .await
    .unwrap();

    let found = ClaimCard::find_by_id(inserted.card.id, &ctx.db_pool)
        .await
        .unwrap()
        .expect("card exists");

    assert_eq!(found.card.claim_text, inserted.card.claim_text);
    assert_eq!(found.card.claimant, inserted.card.claimant);
    assert_eq!(found.card.verdict, "TRUE");
    assert_eq!(found.card.short_answer, inserted.card.short_answer);
    assert_eq!(found.card.why_persists, inserted.card.why_persists);
    assert_eq!(found.card.confidence_level, "HIGH");
    assert_eq!(found.sources.len(), 1);
    assert_eq!(found.sources[0].citation, inserted.sources[0].citation);
    assert_eq!(found.category_tags.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn find_missing_card_is_none(ctx: &TestHarness) {
    let found = ClaimCard::find_by_id(Uuid::new_v4(), &ctx.db_pool).await.unwrap();
    assert!(found.is_none());
}

// =============================================================================
// Insert-time invariants
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_rejects_empty_claim_text(ctx: &TestHarness) {
    let mut card = new_card("  ", Verdict::True, "This claim is true.");
    card.claim_text = "   ".to_string();

    let err = ClaimCard::insert_audited(&card, &unit_vector(0), &ctx.db_pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("claim_text"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_requires_at_least_one_source(ctx: &TestHarness) {
    let mut card = new_card("A claim", Verdict::True, "This claim is true.");
    card.sources.clear();

    let err = ClaimCard::insert_audited(&card, &unit_vector(0), &ctx.db_pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("source"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_rejects_verdict_inconsistent_with_prose(ctx: &TestHarness) {
    let card = new_card(
        "A global flood covered the earth",
        Verdict::True,
        "This claim is false. No geological stratum records it.",
    );

    let err = ClaimCard::insert_audited(&card, &unit_vector(0), &ctx.db_pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("inconsistent"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_rejects_verified_source_without_exact_quote(ctx: &TestHarness) {
    let mut card = new_card("A claim", Verdict::True, "This claim is true.");
    // Claims full verification but carries no quote.
    card.sources[0].verification_status = "verified".to_string();
    card.sources[0].content_type = "verified_paraphrase".to_string();
    card.sources[0].quote_text = String::new();

    let err = ClaimCard::insert_audited(&card, &unit_vector(0), &ctx.db_pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("without an exact quote"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn insert_rejects_unverified_source_with_url(ctx: &TestHarness) {
    let mut card = new_card("A claim", Verdict::True, "This claim is true.");
    card.sources[0].verification_method = "llm_unverified".to_string();
    card.sources[0].verification_status = "unverified".to_string();
    // A synthesized URL on a model-memory source is exactly the bug this
    // guard exists for.
    card.sources[0].url = "https://fabricated.example/doc".to_string();

    let err = ClaimCard::insert_audited(&card, &unit_vector(0), &ctx.db_pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("llm_unverified"));
}

// =============================================================================
// Embedding freshness
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn updating_claim_text_regenerates_the_embedding(ctx: &TestHarness) {
    let inserted = insert_card(
        &ctx.db_pool,
        "Original claim text",
        Verdict::True,
        "This claim is true.",
        &unit_vector(0),
    )
    .await
    .unwrap();

    let embeddings = MockEmbeddingService::new()
        .with_pattern_embedding("rewritten", unit_vector(7));

    let updated = ClaimCard::update_claim_text(
        inserted.card.id,
        "A rewritten claim text",
        &embeddings,
        &ctx.db_pool,
    )
    .await
    .unwrap();

    assert_eq!(updated.claim_text, "A rewritten claim text");
    assert_eq!(embeddings.calls(), vec!["A rewritten claim text".to_string()]);

    let stored = ClaimCard::embedding_of(inserted.card.id, &ctx.db_pool)
        .await
        .unwrap()
        .expect("embedding present");
    assert_eq!(stored.len(), EMBEDDING_DIM);
    assert_eq!(stored[7], 1.0);
    assert_eq!(stored[0], 0.0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn embedding_failure_leaves_claim_text_unchanged(ctx: &TestHarness) {
    struct FailingEmbeddings;

    #[async_trait::async_trait]
    impl BaseEmbeddingService for FailingEmbeddings {
        async fn generate(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("embedding transport down")
        }
    }

    let inserted = insert_card(
        &ctx.db_pool,
        "Stable claim text",
        Verdict::True,
        "This claim is true.",
        &unit_vector(0),
    )
    .await
    .unwrap();

    let err = ClaimCard::update_claim_text(
        inserted.card.id,
        "Never applied",
        &FailingEmbeddings,
        &ctx.db_pool,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("re-embed"));

    let found = ClaimCard::find_by_id(inserted.card.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.card.claim_text, "Stable claim text");
}

// =============================================================================
// Semantic search
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn search_orders_by_similarity_and_applies_threshold(ctx: &TestHarness) {
    let close = insert_card(
        &ctx.db_pool,
        "Close claim",
        Verdict::True,
        "This claim is true.",
        &vector_with_similarity(0, 0.95),
    )
    .await
    .unwrap();
    let mid = insert_card(
        &ctx.db_pool,
        "Mid claim",
        Verdict::True,
        "This claim is true.",
        &vector_with_similarity(0, 0.85),
    )
    .await
    .unwrap();
    let _far = insert_card(
        &ctx.db_pool,
        "Far claim",
        Verdict::True,
        "This claim is true.",
        &vector_with_similarity(0, 0.30),
    )
    .await
    .unwrap();

    let results = ClaimCard::search_by_embedding(&unit_vector(0), 0.80, 5, &[], &ctx.db_pool)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, close.card.id);
    assert_eq!(results[1].0.id, mid.card.id);
    assert!(results[0].1 > 0.94 && results[0].1 < 0.96);
    assert!(results[1].1 > 0.84 && results[1].1 < 0.86);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn search_breaks_similarity_ties_by_newer_created_at(ctx: &TestHarness) {
    let older = insert_card(
        &ctx.db_pool,
        "Older duplicate",
        Verdict::True,
        "This claim is true.",
        &unit_vector(3),
    )
    .await
    .unwrap();
    // Force distinct created_at even on fast machines.
    sqlx::query("UPDATE claim_cards SET created_at = created_at - INTERVAL '1 hour' WHERE id = $1")
        .bind(older.card.id)
        .execute(&ctx.db_pool)
        .await
        .unwrap();

    let newer = insert_card(
        &ctx.db_pool,
        "Newer duplicate",
        Verdict::True,
        "This claim is true.",
        &unit_vector(3),
    )
    .await
    .unwrap();

    let results = ClaimCard::search_by_embedding(&unit_vector(3), 0.9, 5, &[], &ctx.db_pool)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, newer.card.id);
    assert_eq!(results[1].0.id, older.card.id);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn search_excludes_listed_ids(ctx: &TestHarness) {
    let excluded = insert_card(
        &ctx.db_pool,
        "Excluded claim",
        Verdict::True,
        "This claim is true.",
        &unit_vector(4),
    )
    .await
    .unwrap();

    let results = ClaimCard::search_by_embedding(
        &unit_vector(4),
        0.9,
        5,
        &[excluded.card.id],
        &ctx.db_pool,
    )
    .await
    .unwrap();
    assert!(results.is_empty());
}

// =============================================================================
// Audits listing
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn audits_listing_respects_visibility_and_filters(ctx: &TestHarness) {
    let visible = insert_card(
        &ctx.db_pool,
        "The flood story has Mesopotamian parallels",
        Verdict::True,
        "This claim is true.",
        &unit_vector(0),
    )
    .await
    .unwrap();
    let hidden = insert_card(
        &ctx.db_pool,
        "A hidden card about the flood",
        Verdict::False,
        "This claim is false.",
        &unit_vector(1),
    )
    .await
    .unwrap();
    sqlx::query("UPDATE claim_cards SET visible_in_audits = FALSE WHERE id = $1")
        .bind(hidden.card.id)
        .execute(&ctx.db_pool)
        .await
        .unwrap();

    let filters = AuditFilters {
        search: Some("flood".to_string()),
        skip: 0,
        limit: 20,
        ..Default::default()
    };

    let cards = ClaimCard::list_for_audits(&filters, &ctx.db_pool).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, visible.card.id);

    let total = ClaimCard::count_for_audits(&filters, &ctx.db_pool).await.unwrap();
    assert_eq!(total, 1);

    // Verdict filter
    let verdict_filters = AuditFilters {
        verdict: Some("FALSE".to_string()),
        skip: 0,
        limit: 20,
        ..Default::default()
    };
    let cards = ClaimCard::list_for_audits(&verdict_filters, &ctx.db_pool).await.unwrap();
    assert!(cards.is_empty());
}
