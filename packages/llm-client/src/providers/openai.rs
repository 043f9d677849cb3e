//! OpenAI chat-completions wire format.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::tool::{ToolCall, ToolExecutor, ToolInvocation, ToolSpec, ToolTranscript};
use crate::types::{CallConfig, Completion, Message, Usage};
use crate::MAX_TOOL_ITERATIONS;

const BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<RawUsage> for Usage {
    fn from(raw: RawUsage) -> Self {
        Usage {
            input_tokens: raw.prompt_tokens,
            output_tokens: raw.completion_tokens,
        }
    }
}

fn map_send_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Provider(format!("OpenAI request failed: {e}"))
    }
}

async fn post_chat(
    http: &reqwest::Client,
    api_key: &str,
    body: &Value,
    timeout_secs: u64,
) -> Result<Value> {
    let response = http
        .post(format!("{BASE_URL}/chat/completions"))
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(timeout_secs))
        .json(body)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %error_text, "OpenAI API error");
        return Err(LlmError::Provider(format!(
            "OpenAI API error {status}: {error_text}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::Provider(format!("OpenAI response not JSON: {e}")))
}

fn base_messages(config: &CallConfig, history: &[Message]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !config.system_prompt.is_empty() {
        messages.push(json!({"role": "system", "content": config.system_prompt}));
    }
    for msg in history {
        messages.push(json!({"role": msg.role, "content": msg.content}));
    }
    messages
}

/// Single-shot completion.
pub async fn complete(
    http: &reqwest::Client,
    api_key: &str,
    config: &CallConfig,
    history: &[Message],
) -> Result<Completion> {
    let body = json!({
        "model": config.model,
        "messages": base_messages(config, history),
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    });

    let response = post_chat(http, api_key, &body, config.timeout_secs).await?;

    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::Provider("no content in OpenAI response".to_string()))?
        .to_string();

    let usage = parse_usage(&response);

    debug!(model = %config.model, output_len = content.len(), "OpenAI completion");
    Ok(Completion { content, usage })
}

fn parse_usage(response: &Value) -> Usage {
    serde_json::from_value::<RawUsage>(response["usage"].clone())
        .map(Usage::from)
        .unwrap_or_default()
}

fn tool_defs(tools: &[ToolSpec]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
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
    let mut messages = base_messages(config, history);
    let defs = tool_defs(tools);
    let mut invocations = Vec::new();
    let mut usage = Usage::default();

    for iteration in 1..=MAX_TOOL_ITERATIONS {
        let body = json!({
            "model": config.model,
            "messages": messages,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "tools": defs,
            "tool_choice": "auto",
        });

        let response = post_chat(http, api_key, &body, config.timeout_secs).await?;

        let turn_usage = parse_usage(&response);
        usage.input_tokens += turn_usage.input_tokens;
        usage.output_tokens += turn_usage.output_tokens;

        let message = response["choices"][0]["message"].clone();
        let tool_calls: Vec<ToolCall> = message["tool_calls"]
            .as_array()
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        if tool_calls.is_empty() {
            let content = message["content"].as_str().unwrap_or("").to_string();
            return Ok(ToolTranscript {
                content,
                invocations,
                iterations: iteration,
                usage,
            });
        }

        messages.push(message.clone());

        for call in tool_calls {
            debug!(tool = %call.name, iteration, "resolving tool call");
            let result = executor.execute(&call).await.map_err(|e| LlmError::Tool {
                name: call.name.clone(),
                message: e.to_string(),
            })?;

            messages.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "content": result.to_string(),
            }));
            invocations.push(ToolInvocation {
                name: call.name,
                arguments: call.arguments,
                result,
            });
        }
    }

    Err(LlmError::Provider(format!(
        "tool loop exceeded {MAX_TOOL_ITERATIONS} iterations"
    )))
}

fn parse_tool_call(value: &Value) -> Option<ToolCall> {
    let arguments_raw = value["function"]["arguments"].as_str()?;
    Some(ToolCall {
        id: value["id"].as_str()?.to_string(),
        name: value["function"]["name"].as_str()?.to_string(),
        arguments: serde_json::from_str(arguments_raw).unwrap_or(Value::Null),
    })
}

/// Embedding generation (OpenAI only).
pub async fn create_embedding(
    http: &reqwest::Client,
    api_key: &str,
    text: &str,
    model: &str,
) -> Result<Vec<f32>> {
    let request = EmbeddingRequest { model, input: text };

    let response = http
        .post(format!("{BASE_URL}/embeddings"))
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(30))
        .json(&request)
        .send()
        .await
        .map_err(|e| map_send_error(e, 30))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %error_text, "OpenAI embedding error");
        return Err(LlmError::Provider(format!(
            "OpenAI embedding error {status}: {error_text}"
        )));
    }

    let embed_response: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Provider(format!("embedding response not JSON: {e}")))?;

    embed_response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| LlmError::Provider("no embedding in OpenAI response".to_string()))
}
