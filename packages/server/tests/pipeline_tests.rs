//! Full pipeline runs with mocked LLM and verification: persistence,
//! event ordering, adversarial reverification flags, cancellation, and
//! config failures.

mod common;

use test_context::test_context;
use tokio_util::sync::CancellationToken;

use audit_core::domains::claims::models::ClaimCard;
use audit_core::domains::pipeline::{PipelineError, PipelineOrchestrator};
use audit_core::domains::verification::{
    ContentType, SourceMetadata, VerificationMethod, VerificationOutcome, VerificationStatus,
};
use audit_core::kernel::test_support::{MockLlm, MockVerifier, TestDependencies};
use audit_core::kernel::ServerDeps;

use crate::common::{seed_agent_prompts, TestHarness};

/// Queue the six LLM responses one pipeline run consumes, in stage order.
fn queue_pipeline_responses(
    llm: MockLlm,
    claim_text: &str,
    category: &str,
    verdict: &str,
    short_answer: &str,
) -> MockLlm {
    llm
        // 1. topic finder
        .with_json_response(&serde_json::json!({
            "claim_text": claim_text,
            "claimant": "Ken Ham",
            "claim_type": "history",
            "claim_type_category": category,
            "why_matters": "Widely circulated in apologetics material.",
            "category_tags": ["Genesis"],
        }))
        // 2. source checker: candidate queries
        .with_json_response(&serde_json::json!({
            "source_queries": [
                {
                    "search_query": "Bart Ehrman Misquoting Jesus",
                    "usage_context": "establishes the scholarly view of transmission",
                    "domain": "book",
                    "bucket": "scholarly"
                },
                {
                    "search_query": "Epic of Gilgamesh flood tablet XI",
                    "usage_context": "earlier flood narrative parallel",
                    "domain": "ancient_text",
                    "bucket": "primary"
                },
                {
                    "search_query": "flood geology sedimentary strata survey",
                    "usage_context": "geological evidence baseline",
                    "domain": "paper",
                    "bucket": "scholarly"
                }
            ]
        }))
        // 3. source checker: evidence summary
        .with_response("The verified sources consistently cut against the claim.")
        // 4. adversarial checker
        .with_json_response(&serde_json::json!({
            "verdict": verdict,
            "confidence_level": "High",
            "confidence_explanation": "Multiple independent sources point the same way.",
            "apologetics_techniques": [
                {"technique_name": "quote-mining", "description": "selective quotation"}
            ],
            "counterevidence": "None identified",
        }))
        // 5. writer
        .with_json_response(&serde_json::json!({
            "short_answer": short_answer,
            "deep_answer": "The evidence, reviewed source by source, does not support the claim as stated. Three paragraphs of analysis follow.",
            "why_persists": ["familiarity", "community reinforcement", "institutional repetition"],
            "confidence_level": "High",
            "confidence_explanation": "The sources agree and were independently verified.",
        }))
        // 6. publisher
        .with_json_response(&serde_json::json!({
            "audit_summary": "Claim framed, sourced through the tier walk, adversarially re-verified, and written up.",
            "limitations": ["No manuscript images were inspected directly."],
            "change_verdict_if": "A verified primary source attesting the opposite.",
            "category_tags": ["Genesis", "Historical Claims"],
        }))
}

fn deps_for(ctx: &TestHarness, llm: MockLlm, verifier: MockVerifier) -> ServerDeps {
    TestDependencies::new()
        .mock_llm(llm)
        .mock_verifier(verifier)
        .into_deps(ctx.db_pool.clone())
}

#[test_context(TestHarness)]
#[tokio::test]
async fn pipeline_persists_a_complete_card(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let llm = queue_pipeline_responses(
        MockLlm::new(),
        "A global flood covered the entire earth",
        "historical",
        "False",
        "This claim is false. The geological record preserves no global flood layer.",
    );
    let deps = deps_for(ctx, llm, MockVerifier::new());

    let outcome = PipelineOrchestrator::new(&deps)
        .run("Did a global flood really happen?", None, &CancellationToken::new())
        .await
        .unwrap();

    let card_id = outcome.claim_card_id.expect("card persisted");
    let detail = ClaimCard::find_by_id(card_id, &ctx.db_pool)
        .await
        .unwrap()
        .expect("card exists");

    assert_eq!(detail.card.claim_text, "A global flood covered the entire earth");
    assert_eq!(detail.card.verdict, "FALSE");
    assert_eq!(detail.card.confidence_level, "HIGH");
    assert_eq!(detail.card.claim_type_category.as_deref(), Some("historical"));
    assert!(detail.sources.len() >= 3);
    assert_eq!(detail.apologetics_tags.len(), 1);
    assert_eq!(detail.category_tags.len(), 2);

    // Source integrity: every source carries either an exact quote or a
    // non-verified status, and unverified model-memory sources carry no URL.
    for source in &detail.sources {
        let has_exact_quote =
            !source.quote_text.is_empty() && source.content_type == "exact_quote";
        let non_verified = source.verification_status == "partially_verified"
            || source.verification_status == "unverified";
        assert!(has_exact_quote || non_verified, "source {}", source.citation);
        if source.verification_method == "llm_unverified" {
            assert!(source.url.is_empty());
        }
    }

    // The embedding was generated from the exact claim text.
    let embedding = ClaimCard::embedding_of(card_id, &ctx.db_pool).await.unwrap();
    assert!(embedding.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn pipeline_emits_events_in_stage_order(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let llm = queue_pipeline_responses(
        MockLlm::new(),
        "Luke used Mark as a source",
        "textual",
        "True",
        "This claim is true: the verbal agreement is extensive.",
    );
    let deps = deps_for(ctx, llm, MockVerifier::new());

    let session = "pipeline-events-session";
    let mut rx = deps.stream_hub.subscribe(session).await;

    PipelineOrchestrator::new(&deps)
        .run("Did Luke copy Mark?", Some(session), &CancellationToken::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let kind = event["type"].as_str().unwrap().to_string();
        let agent = event["agent_name"].as_str().map(str::to_string);
        seen.push((kind, agent));
    }

    let kinds: Vec<&str> = seen.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(kinds.first(), Some(&"pipeline_started"));
    assert_eq!(kinds.last(), Some(&"pipeline_completed"));
    assert!(kinds.contains(&"claim_card_ready"));

    // Agent events appear in pipeline order.
    let agent_starts: Vec<&str> = seen
        .iter()
        .filter(|(k, _)| k == "agent_started")
        .filter_map(|(_, a)| a.as_deref())
        .collect();
    assert_eq!(
        agent_starts,
        vec!["topic_finder", "source_checker", "adversarial_checker", "writer", "publisher"]
    );

    // Every stage reported success.
    for (kind, _) in &seen {
        assert_ne!(kind, "pipeline_failed");
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn quote_discrepancy_is_flagged_not_fatal(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    // The tier walk returns a quote that does NOT appear in the refetched
    // content, so the adversarial pass must flag it.
    let verifier = MockVerifier::new().with_outcome(
        "Misquoting",
        VerificationOutcome {
            verified: true,
            tier: 1,
            method: VerificationMethod::GoogleBooks,
            status: VerificationStatus::Verified,
            citation: "Bart Ehrman, Misquoting Jesus (HarperOne, 2005)".to_string(),
            url: "https://example.org/misquoting".to_string(),
            quote_text: Some("scribes altered the wording in thousands of passages".to_string()),
            content_snippet: Some("An overview of New Testament transmission history.".to_string()),
            content_type: ContentType::ExactQuote,
            url_verified: true,
            metadata: SourceMetadata {
                title: "Misquoting Jesus".to_string(),
                author: "Bart Ehrman".to_string(),
                source_type: "book".to_string(),
                ..Default::default()
            },
        },
    );

    let llm = queue_pipeline_responses(
        MockLlm::new(),
        "The New Testament text is perfectly preserved",
        "textual",
        "Misleading",
        "No, the claim overstates the stability of the text.",
    );
    let deps = deps_for(ctx, llm, verifier);

    let outcome = PipelineOrchestrator::new(&deps)
        .run("Is the New Testament text perfectly preserved?", None, &CancellationToken::new())
        .await
        .unwrap();

    let card_id = outcome.claim_card_id.expect("pipeline still completes");
    let detail = ClaimCard::find_by_id(card_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();

    // The discrepancy landed in the audit trail...
    let notes = detail.card.agent_audit["reverification_notes"]
        .as_array()
        .expect("notes present")
        .clone();
    assert!(notes
        .iter()
        .any(|n| n["citation"].as_str().unwrap().contains("Misquoting")
            && n["note"].as_str().unwrap().contains("quote not found")));

    // ...and the verdict reflects it rather than silently reading True.
    assert_eq!(detail.card.verdict, "MISLEADING");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn epistemology_claims_are_categorized_as_such(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let llm = queue_pipeline_responses(
        MockLlm::new(),
        "God concealed the physical evidence of the flood",
        "epistemology",
        "Unfalsifiable",
        "The claim cannot be tested against any observable evidence.",
    );
    let deps = deps_for(ctx, llm, MockVerifier::new());

    let outcome = PipelineOrchestrator::new(&deps)
        .run("Could God have hidden the evidence?", None, &CancellationToken::new())
        .await
        .unwrap();

    let detail = ClaimCard::find_by_id(outcome.claim_card_id.unwrap(), &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.card.claim_type_category.as_deref(), Some("epistemology"));
    assert_eq!(detail.card.verdict, "UNFALSIFIABLE");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn cancelled_pipeline_stops_at_stage_boundary(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    let deps = deps_for(ctx, MockLlm::new(), MockVerifier::new());
    let session = "cancelled-session";
    let mut rx = deps.stream_hub.subscribe(session).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = PipelineOrchestrator::new(&deps)
        .run("Anything", Some(session), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));

    // No card was inserted.
    assert_eq!(ClaimCard::count(&ctx.db_pool).await.unwrap(), 0);

    // The failure is visible on the bus.
    let mut saw_failure = false;
    while let Ok(event) = rx.try_recv() {
        if event["type"] == "pipeline_failed" {
            assert!(event["error"].as_str().unwrap().contains("cancelled"));
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_agent_config_aborts_the_pipeline(ctx: &TestHarness) {
    // No agent prompts seeded.
    let deps = deps_for(ctx, MockLlm::new(), MockVerifier::new());

    let err = PipelineOrchestrator::new(&deps)
        .run("Anything", None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("configuration"));
    assert_eq!(ClaimCard::count(&ctx.db_pool).await.unwrap(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invalid_agent_output_fails_without_retry(ctx: &TestHarness) {
    seed_agent_prompts(&ctx.db_pool).await.unwrap();

    // Topic finder emits prose instead of JSON.
    let llm = MockLlm::new().with_response("I could not decide on a claim, sorry.");
    let deps = deps_for(ctx, llm, MockVerifier::new());

    let err = PipelineOrchestrator::new(&deps)
        .run("Anything", None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("invalid output"));
    // One LLM call was made: no silent retries.
    assert_eq!(ClaimCard::count(&ctx.db_pool).await.unwrap(), 0);
}
