//! Scheduled article generation: decomposition, dedup against cached
//! cards, pipeline fan-out, composition, and review gating.

mod common;

use test_context::test_context;

use audit_core::domains::blog::{
    self, generate_for_topic, run_scheduled_generation, BlogPost, RevisionTarget, TopicQueueEntry,
};
use audit_core::domains::claims::models::Verdict;
use audit_core::kernel::test_support::{
    unit_vector, MockEmbeddingService, MockLlm, MockVerifier, TestDependencies,
};
use audit_core::kernel::ServerDeps;

use crate::common::{insert_card, seed_agent_prompts, TestHarness};

const COMPONENT_CLAIMS: [&str; 5] = [
    "A global flood covered the entire earth about 4,000 years ago",
    "Noah's Ark could fit all animal species",
    "Geological evidence supports a worldwide flood",
    "Flood myths appear independently across ancient cultures",
    "Radiometric dating of flood strata is unreliable",
];

/// Embedding axes per component claim; the first two match pre-inserted
/// cards.
fn embeddings_for_flood_topic() -> MockEmbeddingService {
    MockEmbeddingService::new()
        .with_pattern_embedding("global flood covered", unit_vector(0))
        .with_pattern_embedding("ark could fit", unit_vector(1))
        .with_pattern_embedding("geological evidence supports", unit_vector(2))
        .with_pattern_embedding("flood myths appear", unit_vector(3))
        .with_pattern_embedding("radiometric dating", unit_vector(4))
}

/// Six responses for one pipeline run over `claim_text`.
fn queue_claim_pipeline(llm: MockLlm, claim_text: &str) -> MockLlm {
    llm.with_json_response(&serde_json::json!({
        "claim_text": claim_text,
        "claimant": "Young-earth apologists",
        "claim_type": "history",
        "claim_type_category": "historical",
        "why_matters": "Component of the flood narrative.",
        "category_tags": ["Genesis"],
    }))
    .with_json_response(&serde_json::json!({
        "source_queries": [
            {
                "search_query": format!("survey literature {claim_text}"),
                "usage_context": "establishes the mainstream assessment",
                "domain": "paper",
                "bucket": "scholarly"
            },
            {
                "search_query": format!("primary records {claim_text}"),
                "usage_context": "primary evidence baseline",
                "domain": "ancient_text",
                "bucket": "primary"
            },
            {
                "search_query": format!("reference handbook {claim_text}"),
                "usage_context": "background reference",
                "domain": "book",
                "bucket": "scholarly"
            }
        ]
    }))
    .with_response("The sources weigh against the component claim.")
    .with_json_response(&serde_json::json!({
        "verdict": "False",
        "confidence_level": "High",
        "confidence_explanation": "Consistent independent evidence.",
        "apologetics_techniques": [],
        "counterevidence": "None identified",
    }))
    .with_json_response(&serde_json::json!({
        "short_answer": "This claim is false. The evidence does not support it.",
        "deep_answer": "Stage-by-stage review of the evidence shows the claim fails.",
        "why_persists": ["familiarity", "community reinforcement"],
        "confidence_level": "High",
        "confidence_explanation": "The sources agree.",
    }))
    .with_json_response(&serde_json::json!({
        "audit_summary": "Framed, sourced, adversarially checked, written.",
        "limitations": ["Secondary literature only."],
        "change_verdict_if": "Verified contrary primary evidence.",
        "category_tags": ["Genesis"],
    }))
}

fn article_body(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The full response queue for the flood topic: decomposer, three novel
/// claim pipelines (claims 1 and 2 are deduplicated), composer.
fn flood_topic_llm() -> MockLlm {
    let mut llm = MockLlm::new().with_json_response(&serde_json::json!({
        "component_claims": COMPONENT_CLAIMS,
        "reasoning": "The flood narrative decomposes into independent factual claims.",
    }));
    for claim in &COMPONENT_CLAIMS[2..] {
        llm = queue_claim_pipeline(llm, claim);
    }
    llm.with_json_response(&serde_json::json!({
        "title": "Noah's Flood: What the Evidence Actually Shows",
        "article_body": article_body(600),
    }))
}

fn deps_for(ctx: &TestHarness, llm: MockLlm) -> ServerDeps {
    TestDependencies::new()
        .mock_llm(llm)
        .mock_embeddings(embeddings_for_flood_topic())
        .mock_verifier(MockVerifier::new())
        .into_deps(ctx.db_pool.clone())
}

#[test_context(TestHarness)]
#[tokio::test]
async fn generation_reuses_cached_cards_and_parks_the_article(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    // Two of the five expected component cards already exist.
    let cached_flood = insert_card(
        &ctx.db_pool,
        "A global flood covered the entire earth ~4,000 years ago",
        Verdict::False,
        "This claim is false.",
        &unit_vector(0),
    )
    .await
    .unwrap();
    let cached_ark = insert_card(
        &ctx.db_pool,
        "Noah's Ark could fit all animal species",
        Verdict::False,
        "This claim is false.",
        &unit_vector(1),
    )
    .await
    .unwrap();

    let deps = deps_for(ctx, flood_topic_llm());

    let topic = TopicQueueEntry::create("Noah's Flood", 8, Some("manual"), &ctx.db_pool)
        .await
        .unwrap();
    let leased = TopicQueueEntry::lease_next_queued(&ctx.db_pool)
        .await
        .unwrap()
        .expect("topic leased");
    assert_eq!(leased.id, topic.id);
    assert_eq!(leased.status, "PROCESSING");

    let report = generate_for_topic(&deps, &leased).await.unwrap();

    // Decomposer bounds held and the cached cards were reused, not
    // regenerated.
    assert!(report.claim_card_count >= 3 && report.claim_card_count <= 12);
    assert_eq!(report.claim_card_count, 5);
    assert_eq!(report.reused_card_count, 2);

    let topic = TopicQueueEntry::find_by_id(topic.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic.status, "COMPLETED");
    assert_eq!(topic.review_status, "PENDING_REVIEW");
    assert!(topic.claim_card_ids.contains(&cached_flood.card.id));
    assert!(topic.claim_card_ids.contains(&cached_ark.card.id));
    assert_eq!(topic.claim_card_ids.len(), 5);

    // The article exists but is not published.
    let post = BlogPost::find_by_id(report.blog_post_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert!(post.published_at.is_none());
    assert_eq!(post.claim_card_ids.len(), 5);
    assert!(post.claim_card_ids.len() >= 3 && post.claim_card_ids.len() <= 12);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unpublished_articles_are_invisible_until_approved(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let card = insert_card(
        &ctx.db_pool,
        "A component claim",
        Verdict::False,
        "This claim is false.",
        &unit_vector(0),
    )
    .await
    .unwrap();
    let topic = TopicQueueEntry::create("Some topic", 5, None, &ctx.db_pool)
        .await
        .unwrap();
    let post = BlogPost::create(topic.id, "Title", &article_body(500), &[card.card.id], &ctx.db_pool)
        .await
        .unwrap();
    TopicQueueEntry::mark_completed(topic.id, &[card.card.id], post.id, &ctx.db_pool)
        .await
        .unwrap();

    // Not in the public listing before approval.
    let published = BlogPost::list(true, 0, 20, &ctx.db_pool).await.unwrap();
    assert!(published.is_empty());

    let (topic, post) = blog::review::approve(topic.id, "admin", Some("looks solid"), &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(topic.review_status, "APPROVED");
    assert!(post.published_at.is_some());
    assert_eq!(post.reviewed_by.as_deref(), Some("admin"));

    let published = BlogPost::list(true, 0, 20, &ctx.db_pool).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, post.id);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn rejection_keeps_component_cards(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let card = insert_card(
        &ctx.db_pool,
        "A kept component claim",
        Verdict::False,
        "This claim is false.",
        &unit_vector(0),
    )
    .await
    .unwrap();
    let topic = TopicQueueEntry::create("Rejected topic", 5, None, &ctx.db_pool)
        .await
        .unwrap();
    let post = BlogPost::create(topic.id, "Title", &article_body(500), &[card.card.id], &ctx.db_pool)
        .await
        .unwrap();
    TopicQueueEntry::mark_completed(topic.id, &[card.card.id], post.id, &ctx.db_pool)
        .await
        .unwrap();

    let topic = blog::review::reject(topic.id, "admin", &ctx.db_pool).await.unwrap();
    assert_eq!(topic.review_status, "REJECTED");

    // The article stays unpublished; the card remains in the audits store.
    let post = BlogPost::find_by_id(post.id, &ctx.db_pool).await.unwrap().unwrap();
    assert!(post.published_at.is_none());

    let detail = audit_core::domains::claims::models::ClaimCard::find_by_id(
        card.card.id,
        &ctx.db_pool,
    )
    .await
    .unwrap();
    assert!(detail.is_some());
    assert!(detail.unwrap().card.visible_in_audits);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn revision_request_requeues_with_feedback(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let topic = TopicQueueEntry::create("Revised topic", 5, None, &ctx.db_pool)
        .await
        .unwrap();
    // Simulate a completed generation.
    let card = insert_card(
        &ctx.db_pool,
        "Component",
        Verdict::False,
        "This claim is false.",
        &unit_vector(0),
    )
    .await
    .unwrap();
    let post = BlogPost::create(topic.id, "Title", &article_body(500), &[card.card.id], &ctx.db_pool)
        .await
        .unwrap();
    TopicQueueEntry::mark_completed(topic.id, &[card.card.id], post.id, &ctx.db_pool)
        .await
        .unwrap();

    let topic = blog::review::request_revision(
        topic.id,
        RevisionTarget::Composer,
        "Tone is too combative for the read page.",
        &ctx.db_pool,
    )
    .await
    .unwrap();

    assert_eq!(topic.status, "QUEUED");
    assert_eq!(topic.review_status, "NEEDS_REVISION");
    let feedback = topic.admin_feedback.unwrap();
    assert!(feedback.contains("revise composition"));
    assert!(feedback.contains("too combative"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn failed_generation_marks_the_topic_failed(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    // Decomposer produces too few claims: the bounds check fails the run.
    let llm = MockLlm::new().with_json_response(&serde_json::json!({
        "component_claims": ["only one claim", "and another"],
        "reasoning": "too thin",
    }));
    let deps = TestDependencies::new()
        .mock_llm(llm)
        .into_deps(ctx.db_pool.clone());
    deps.scheduler_settings.write().await.enabled = true;

    let topic = TopicQueueEntry::create("Thin topic", 5, None, &ctx.db_pool)
        .await
        .unwrap();

    let reports = run_scheduled_generation(&deps).await.unwrap();
    assert!(reports.is_empty());

    let topic = TopicQueueEntry::find_by_id(topic.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic.status, "FAILED");
    assert!(topic.error_message.unwrap().contains("decomposer"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn disabled_scheduler_leases_nothing(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let deps = TestDependencies::new().into_deps(ctx.db_pool.clone());
    // Settings default to disabled.
    let topic = TopicQueueEntry::create("Idle topic", 5, None, &ctx.db_pool)
        .await
        .unwrap();

    let reports = run_scheduled_generation(&deps).await.unwrap();
    assert!(reports.is_empty());

    let topic = TopicQueueEntry::find_by_id(topic.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic.status, "QUEUED");
}
