//! Composer - runs after the pipeline during article generation.
//!
//! Synthesizes component claim cards into one narrative article. The
//! claims appear as contextual footnote-style markers inside the prose,
//! never as a rendered list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::AgentPrompt;

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};

/// Article body bounds in words, with slight flexibility around the
/// published 500-1500 range.
const MIN_ARTICLE_WORDS: usize = 400;
const MAX_ARTICLE_WORDS: usize = 1600;

pub struct Composer;

/// Slice of a claim card the composer writes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerCard {
    pub claim_text: String,
    pub verdict: String,
    pub short_answer: String,
    pub deep_answer: String,
    pub confidence_level: String,
    pub source_count: usize,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: String,
    article_body: String,
}

#[derive(Debug, Serialize)]
pub struct ComposerOutput {
    pub title: String,
    pub article_body: String,
    pub word_count: usize,
}

#[async_trait]
impl Agent for Composer {
    fn name(&self) -> &'static str {
        "composer"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let topic = require_str(inputs, self.name(), "topic")?;

        let cards: Vec<ComposerCard> = inputs
            .get("claim_cards")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AgentError::Parse {
                agent: self.name(),
                message: format!("claim_cards payload malformed: {e}"),
            })?
            .ok_or_else(|| AgentError::BadInput {
                agent: self.name(),
                key: "claim_cards".to_string(),
            })?;

        if cards.is_empty() {
            return Err(AgentError::BadInput {
                agent: self.name(),
                key: "claim_cards".to_string(),
            });
        }

        let user_message = format!(
            "Topic: {topic}\n\n\
             Component Claim Cards:\n{}\n\
             Write a synthesized article telling a cohesive story about what the evidence \
             reveals. 500-1500 words of narrative prose. Reference component claims with \
             contextual footnote-style markers like [1], [2] where their findings are used; \
             do NOT render the cards as a list. The title must be engaging and accurate, \
             not clickbait.\n\n\
             Respond with JSON only:\n\
             {{\"title\": \"...\", \"article_body\": \"...\"}}",
            format_cards(&cards)
        );

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;
        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &user_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;

        let raw: RawArticle = parse_output(self.name(), &completion.content)?;

        let word_count = raw.article_body.split_whitespace().count();
        if word_count < MIN_ARTICLE_WORDS {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: format!("article too short: {word_count} words (expected 500-1500)"),
            });
        }
        if word_count > MAX_ARTICLE_WORDS {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: format!("article too long: {word_count} words (expected 500-1500)"),
            });
        }

        to_map(
            self.name(),
            &ComposerOutput {
                title: raw.title,
                article_body: raw.article_body,
                word_count,
            },
        )
    }
}

fn format_cards(cards: &[ComposerCard]) -> String {
    let mut formatted = String::new();
    for (i, card) in cards.iter().enumerate() {
        let deep: String = card.deep_answer.chars().take(500).collect();
        formatted.push_str(&format!(
            "Claim Card [{}]:\n  Claim: {}\n  Verdict: {}\n  Confidence: {}\n  Short Answer: {}\n  Deep Answer: {}{}\n  Sources: {}\n\n",
            i + 1,
            card.claim_text,
            card.verdict,
            card.confidence_level,
            card.short_answer,
            deep,
            if card.deep_answer.chars().count() > 500 { "..." } else { "" },
            card.source_count,
        ));
    }
    formatted
}
