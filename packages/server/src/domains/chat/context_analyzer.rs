//! Context analyzer for conversational follow-ups.
//!
//! Rewrites a new message into a standalone question using recent
//! dialogue. The prompt distinguishes clarifications of an
//! already-discussed claim from ALTERNATIVE EXPLANATIONS, which are new
//! claims in their own right.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use llm_client::{CallConfig, Provider};

use crate::kernel::BaseLlm;

/// Dialogue window handed to the analyzer.
const MAX_HISTORY_MESSAGES: usize = 6;
/// Assistant contributions are truncated for economy.
const MAX_ASSISTANT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = r#"You are a context analyzer for a conversational Q&A system about Christianity claims.

Your task: Given a conversation history and a new user message, reformulate the new message into a standalone, contextualized question.

Rules:
1. If the new message is already standalone, return it as-is
2. If it references previous context ("what about...", "and...", "also...", etc.), reformulate it to include that context
3. If the message proposes an ALTERNATIVE EXPLANATION or counter-claim ("couldn't X explain this instead?", "what if...", "but couldn't it be..."), treat it as a NEW CLAIM about that alternative - do NOT tie it back to the previous claim's verdict
4. Preserve the user's intent and specific focus
5. Output ONLY the reformulated question, no explanation
6. Keep it concise and clear

Examples:

History: ["Did Matthew copy Mark?"]
New: "What about Luke?"
Output: Did Luke copy Mark?

History: ["Did Moses write the Pentateuch?"]
New: "Can you explain that more?"
Output: Did Moses write the Pentateuch?

History: ["Did Matthew copy Mark?"]
New: "How do we know Matthew was copying? Couldn't they have determined the exact same messaging through divine inspiration?"
Output: Could divine inspiration explain the similarities between Matthew and Mark's gospels?

History: ["Did Jesus resurrect physically?"]
New: "What if the disciples just hallucinated?"
Output: Could the resurrection appearances be explained by hallucinations?

History: []
New: "Did Jesus exist?"
Output: Did Jesus exist?"#;

/// One turn of dialogue as received from the chat surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

pub struct ContextAnalyzer {
    llm: Arc<dyn BaseLlm>,
    timeout_secs: u64,
}

impl ContextAnalyzer {
    pub fn new(llm: Arc<dyn BaseLlm>, timeout_secs: u64) -> Self {
        Self { llm, timeout_secs }
    }

    fn config(&self, provider: Provider, model: &str) -> CallConfig {
        CallConfig::new(provider, model)
            .system_prompt(SYSTEM_PROMPT)
            .temperature(0.3)
            .max_tokens(200)
            .timeout_secs(self.timeout_secs)
    }

    /// Reformulate `new_message` against the dialogue. Standalone initial
    /// questions pass through unchanged without an LLM call.
    pub async fn analyze(&self, history: &[ChatMessage], new_message: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(new_message.to_string());
        }

        let user_message = build_user_message(history, new_message);

        // Prefer the fast Anthropic model, fall back to OpenAI.
        let primary = self.config(Provider::Anthropic, "claude-3-5-haiku-latest");
        match self.llm.complete(&primary, &user_message).await {
            Ok(completion) => Ok(completion.content.trim().to_string()),
            Err(primary_err) => {
                tracing::warn!(error = %primary_err, "context analyzer primary provider failed");
                let fallback = self.config(Provider::OpenAi, "gpt-4o-mini");
                let completion = self
                    .llm
                    .complete(&fallback, &user_message)
                    .await
                    .context("context analysis failed on both providers")?;
                Ok(completion.content.trim().to_string())
            }
        }
    }
}

/// Window and format the dialogue: at most six messages, both speakers,
/// assistant content capped at 500 chars.
fn build_user_message(history: &[ChatMessage], new_message: &str) -> String {
    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    let recent = &history[start..];

    let mut parts = Vec::with_capacity(recent.len());
    for message in recent {
        let content = if message.role == "assistant" && message.content.chars().count() > MAX_ASSISTANT_CHARS
        {
            let truncated: String = message.content.chars().take(MAX_ASSISTANT_CHARS).collect();
            format!("{truncated}...")
        } else {
            message.content.clone()
        };
        parts.push(format!("{}: {}", message.role.to_uppercase(), content));
    }

    format!(
        "=== Conversation History ===\n{}\n\n=== New Message ===\n{}\n\nReformulated question:",
        parts.join("\n"),
        new_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn window_keeps_at_most_six_messages() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| msg(if i % 2 == 0 { "user" } else { "assistant" }, &format!("message {i}")))
            .collect();

        let rendered = build_user_message(&history, "follow up");

        // Only the last six survive.
        assert!(!rendered.contains("message 3"));
        assert!(rendered.contains("message 4"));
        assert!(rendered.contains("message 9"));
    }

    #[test]
    fn assistant_messages_are_truncated_to_500_chars() {
        let long = "x".repeat(1200);
        let history = vec![msg("user", "Is abortion moral?"), msg("assistant", &long)];

        let rendered = build_user_message(&history, "What happened then?");

        let assistant_line = rendered
            .lines()
            .find(|l| l.starts_with("ASSISTANT:"))
            .unwrap();
        // 500 chars of content plus the marker and ellipsis.
        assert!(assistant_line.len() < 520);
        assert!(assistant_line.ends_with("..."));
    }

    #[test]
    fn user_messages_are_not_truncated() {
        let long = "y".repeat(800);
        let history = vec![msg("user", &long)];

        let rendered = build_user_message(&history, "and?");
        assert!(rendered.contains(&long));
    }
}
