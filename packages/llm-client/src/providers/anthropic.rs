//! Anthropic messages wire format.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::tool::{ToolCall, ToolExecutor, ToolInvocation, ToolSpec, ToolTranscript};
use crate::types::{CallConfig, Completion, Message, Usage};
use crate::MAX_TOOL_ITERATIONS;

const BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

fn map_send_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Provider(format!("Anthropic request failed: {e}"))
    }
}

async fn post_messages(
    http: &reqwest::Client,
    api_key: &str,
    body: &Value,
    timeout_secs: u64,
) -> Result<Value> {
    let response = http
        .post(format!("{BASE_URL}/messages"))
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(timeout_secs))
        .json(body)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %error_text, "Anthropic API error");
        return Err(LlmError::Provider(format!(
            "Anthropic API error {status}: {error_text}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::Provider(format!("Anthropic response not JSON: {e}")))
}

fn base_body(config: &CallConfig, messages: &[Value]) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": messages,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    });
    if !config.system_prompt.is_empty() {
        body["system"] = json!(config.system_prompt);
    }
    body
}

fn history_messages(history: &[Message]) -> Vec<Value> {
    history
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect()
}

fn parse_usage(response: &Value) -> Usage {
    Usage {
        input_tokens: response["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: response["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

/// Concatenated text blocks of a response.
fn text_content(response: &Value) -> String {
    response["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Single-shot completion.
pub async fn complete(
    http: &reqwest::Client,
    api_key: &str,
    config: &CallConfig,
    history: &[Message],
) -> Result<Completion> {
    let messages = history_messages(history);
    let body = base_body(config, &messages);
    let response = post_messages(http, api_key, &body, config.timeout_secs).await?;

    let content = text_content(&response);
    if content.is_empty() {
        return Err(LlmError::Provider(
            "no text content in Anthropic response".to_string(),
        ));
    }

    debug!(model = %config.model, output_len = content.len(), "Anthropic completion");
    Ok(Completion {
        content,
        usage: parse_usage(&response),
    })
}

fn tool_defs(tools: &[ToolSpec]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters,
            })
        })
        .collect()
}

/// Tool-augmented completion loop.
pub async fn complete_with_tools(
    http: &reqwest::Client,
    api_key: &str,
    config: &CallConfig,
    history: &[Message],
    tools: &[ToolSpec],
    executor: &dyn ToolExecutor,
) -> Result<ToolTranscript> {
    let mut messages = history_messages(history);
    let defs = tool_defs(tools);
    let mut invocations = Vec::new();
    let mut usage = Usage::default();

    for iteration in 1..=MAX_TOOL_ITERATIONS {
        let mut body = base_body(config, &messages);
        body["tools"] = Value::Array(defs.clone());

        let response = post_messages(http, api_key, &body, config.timeout_secs).await?;

        let turn_usage = parse_usage(&response);
        usage.input_tokens += turn_usage.input_tokens;
        usage.output_tokens += turn_usage.output_tokens;

        if response["stop_reason"].as_str() != Some("tool_use") {
            return Ok(ToolTranscript {
                content: text_content(&response),
                invocations,
                iterations: iteration,
                usage,
            });
        }

        // Echo the assistant turn, then answer each tool_use block.
        messages.push(json!({
            "role": "assistant",
            "content": response["content"].clone(),
        }));

        let mut result_blocks = Vec::new();
        let tool_uses: Vec<ToolCall> = response["content"]
            .as_array()
            .map(|blocks| blocks.iter().filter_map(parse_tool_use).collect())
            .unwrap_or_default();

        for call in tool_uses {
            debug!(tool = %call.name, iteration, "resolving tool call");
            let result = executor.execute(&call).await.map_err(|e| LlmError::Tool {
                name: call.name.clone(),
                message: e.to_string(),
            })?;

            result_blocks.push(json!({
                "type": "tool_result",
                "tool_use_id": call.id,
                "content": result.to_string(),
            }));
            invocations.push(ToolInvocation {
                name: call.name,
                arguments: call.arguments,
                result,
            });
        }

        messages.push(json!({"role": "user", "content": result_blocks}));
    }

    Err(LlmError::Provider(format!(
        "tool loop exceeded {MAX_TOOL_ITERATIONS} iterations"
    )))
}

fn parse_tool_use(block: &Value) -> Option<ToolCall> {
    if block["type"].as_str() != Some("tool_use") {
        return None;
    }
    Some(ToolCall {
        id: block["id"].as_str()?.to_string(),
        name: block["name"].as_str()?.to_string(),
        arguments: block["input"].clone(),
    })
}
