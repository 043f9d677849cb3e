//! Auto-suggest: topic discovery for the generation queue.
//!
//! Extracts checkable topics from external content via the LLM,
//! deduplicates against existing claim cards (looser threshold than the
//! scheduler's), and enqueues what is novel. Topics go into the queue,
//! not claims.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use llm_client::{CallConfig, Provider};

use crate::domains::claims::models::ClaimCard;
use crate::kernel::ServerDeps;

use super::models::TopicQueueEntry;

const EXTRACTION_PROMPT: &str = r#"You are a topic extraction specialist for a religion claim analysis platform.

Your task: Analyze the provided text from apologetics sources and identify distinct factual claims or topics about Christianity that can be fact-checked.

Focus on:
- Specific factual claims (historical, scientific, theological)
- Topics commonly discussed in Christian apologetics
- Claims that can be verified or analyzed with evidence
- Broad enough for multiple component claims, but specific enough to analyze

Avoid:
- Purely philosophical debates without factual basis
- Personal testimonies or subjective experiences
- Topics too vague to analyze ("Is God real?")

Output JSON format:
{
  "topics": [
    {
      "topic_text": "Brief topic description (1-2 sentences)",
      "reasoning": "Why this topic matters",
      "estimated_priority": 5
    }
  ]
}

Priority scoring (1-10): 8-10 widely circulated claims from prominent apologists; 5-7 moderately common; 1-4 niche."#;

/// Seed queries used when discovering from the open web.
const DISCOVERY_QUERIES: [&str; 3] = [
    "christian apologetics arguments evidence",
    "biblical archaeology claims debate",
    "historicity of the gospels arguments",
];

#[derive(Debug, Deserialize)]
struct ExtractedTopics {
    #[serde(default)]
    topics: Vec<ExtractedTopic>,
}

#[derive(Debug, Deserialize)]
struct ExtractedTopic {
    topic_text: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default = "default_priority")]
    estimated_priority: i32,
}

fn default_priority() -> i32 {
    5
}

#[derive(Debug, Serialize)]
pub struct SuggestReport {
    pub extracted: usize,
    pub deduplicated: usize,
    pub enqueued: Vec<uuid::Uuid>,
}

fn extraction_config() -> CallConfig {
    CallConfig::new(Provider::Anthropic, "claude-3-5-haiku-latest")
        .system_prompt(EXTRACTION_PROMPT)
        .temperature(0.7)
        .max_tokens(2048)
        .timeout_secs(30)
}

/// Extract topics from a block of source text and enqueue the novel ones.
pub async fn suggest_from_text(
    deps: &ServerDeps,
    source_text: &str,
    source_name: Option<&str>,
    source_url: Option<&str>,
) -> Result<SuggestReport> {
    if source_text.trim().is_empty() {
        bail!("source text cannot be empty");
    }

    let excerpt: String = source_text.chars().take(4000).collect();
    let user_message = format!(
        "Source: {}\nURL: {}\n\nText:\n{}\n\nExtract factual claims/topics from this content. \
         Output JSON only, no other text.",
        source_name.unwrap_or("Unknown"),
        source_url.unwrap_or("N/A"),
        excerpt
    );

    let completion = deps
        .llm
        .complete(&extraction_config(), &user_message)
        .await
        .context("topic extraction failed")?;
    let value = llm_client::extract_json(&completion.content)
        .context("topic extraction returned invalid JSON")?;
    let extracted: ExtractedTopics = serde_json::from_value(value)?;

    let max_topics = deps.config.autosuggest_max_topics;
    let mut report = SuggestReport {
        extracted: extracted.topics.len(),
        deduplicated: 0,
        enqueued: Vec::new(),
    };

    let tag = source_name
        .map(|n| format!("auto_suggest:{n}"))
        .unwrap_or_else(|| "auto_suggest".to_string());

    for topic in extracted.topics.into_iter().take(max_topics) {
        if is_duplicate(deps, &topic.topic_text).await? {
            report.deduplicated += 1;
            continue;
        }

        let entry = TopicQueueEntry::create(
            &topic.topic_text,
            topic.estimated_priority.clamp(1, 10),
            Some(&tag),
            &deps.db_pool,
        )
        .await?;

        tracing::info!(
            topic_id = %entry.id,
            priority = entry.priority,
            reasoning = %topic.reasoning,
            "auto-suggested topic enqueued"
        );
        report.enqueued.push(entry.id);
    }

    Ok(report)
}

/// Discover topics from the open web via seed searches.
pub async fn discover(deps: &ServerDeps) -> Result<SuggestReport> {
    let mut combined = String::new();
    for query in DISCOVERY_QUERIES {
        match deps.web_searcher.search(query, 3).await {
            Ok(results) => {
                for result in results {
                    combined.push_str(&result.title);
                    combined.push('\n');
                    combined.push_str(&result.content);
                    combined.push_str("\n\n");
                }
            }
            Err(e) => tracing::warn!(query, error = %e, "discovery search failed"),
        }
    }

    if combined.trim().is_empty() {
        bail!("web discovery returned no content");
    }

    suggest_from_text(deps, &combined, Some("web_discovery"), None).await
}

/// Loose dedup against existing claim cards (0.85 by default — looser
/// than the scheduler's 0.92 on purpose: a near-topic is still not worth
/// a fresh article).
async fn is_duplicate(deps: &ServerDeps, topic_text: &str) -> Result<bool> {
    let threshold = deps.config.autosuggest_dedup_threshold;
    match deps.embedding_service.generate(topic_text).await {
        Ok(embedding) => {
            let matches =
                ClaimCard::search_by_embedding(&embedding, threshold, 1, &[], &deps.db_pool)
                    .await?;
            Ok(!matches.is_empty())
        }
        Err(e) => {
            tracing::warn!(error = %e, "dedup embedding failed; keeping topic");
            Ok(false)
        }
    }
}
