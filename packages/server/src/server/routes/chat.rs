//! The ask endpoint: context analysis → routing → mode-specific response.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domains::chat::{ChatMessage, ContextAnalyzer};
use crate::domains::claims::models::{ClaimCard, ClaimCardDetail};
use crate::domains::pipeline::PipelineOrchestrator;
use crate::domains::routing::{
    NewRouterDecision, RouterAgent, RouterDecision, RouterOutcome, RoutingMode,
};
use crate::kernel::ProgressEvent;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatAskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatAskResponse {
    pub mode: String,
    pub response: serde_json::Value,
    pub routing_decision_id: Uuid,
    pub websocket_session_id: Option<String>,
}

pub async fn chat_ask(
    State(state): State<AppState>,
    Json(request): Json<ChatAskRequest>,
) -> Result<Json<ChatAskResponse>, ApiError> {
    let deps = &state.deps;

    // Input validation.
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
    }
    if request.question.chars().count() > deps.config.max_question_length {
        return Err(ApiError::BadRequest(format!(
            "Question too long. Maximum {} characters allowed.",
            deps.config.max_question_length
        )));
    }
    if request.conversation_history.len() > deps.config.max_conversation_history {
        return Err(ApiError::BadRequest(format!(
            "Conversation history too long. Maximum {} messages allowed.",
            deps.config.max_conversation_history
        )));
    }

    let started = Instant::now();
    let session_id = Uuid::new_v4().to_string();

    // Step 1: reformulate with conversation context.
    deps.stream_hub
        .publish_event(&session_id, ProgressEvent::ContextAnalysisStarted)
        .await;

    let analyzer = ContextAnalyzer::new(deps.llm.clone(), deps.config.context_timeout_secs);
    let contextualized_question = analyzer
        .analyze(&request.conversation_history, &request.question)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "context analysis failed");
            ApiError::Internal(e)
        })?;

    deps.stream_hub
        .publish_event(
            &session_id,
            ProgressEvent::RoutingStarted {
                contextualized_question: contextualized_question.clone(),
            },
        )
        .await;

    // Step 2: route. Router failure degrades to a fresh pipeline run.
    let router = RouterAgent::new(deps);
    let outcome = match router
        .route(&contextualized_question, &request.question, &request.conversation_history)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "router failed; falling back to NOVEL_CLAIM");
            deps.stream_hub
                .publish_event(
                    &session_id,
                    ProgressEvent::RouterFallback {
                        reason: "Router failed, generating new claim".to_string(),
                    },
                )
                .await;
            RouterOutcome {
                mode: RoutingMode::NovelClaim,
                final_answer: String::new(),
                candidates: Vec::new(),
                inspected_ids: Vec::new(),
            }
        }
    };

    let mut mode = outcome.mode;
    let mut referenced: Vec<Uuid> = Vec::new();
    let mut response_data: Option<serde_json::Value> = None;

    // Step 3: mode-specific payloads.
    if mode == RoutingMode::ExactMatch {
        let best = outcome
            .candidates
            .iter()
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity));

        match best {
            Some(candidate) => {
                match ClaimCard::find_by_id(candidate.claim_id, &deps.db_pool).await? {
                    Some(detail) => {
                        referenced.push(detail.card.id);
                        response_data = Some(serde_json::json!({
                            "type": "exact_match",
                            "claim_card": detail,
                        }));
                    }
                    None => {
                        // Cited card vanished: fall forward to a new audit.
                        deps.stream_hub
                            .publish_event(
                                &session_id,
                                ProgressEvent::RouterFallback {
                                    reason: "Matched card no longer exists".to_string(),
                                },
                            )
                            .await;
                        mode = RoutingMode::NovelClaim;
                    }
                }
            }
            None => mode = RoutingMode::NovelClaim,
        }
    }

    if mode == RoutingMode::Contextual {
        // Cards the model inspected; else the top three candidates.
        referenced = if outcome.inspected_ids.is_empty() {
            outcome
                .candidates
                .iter()
                .take(3)
                .map(|c| c.claim_id)
                .collect()
        } else {
            outcome.inspected_ids.clone()
        };

        let mut source_cards: Vec<ClaimCardDetail> = Vec::new();
        for id in &referenced {
            if let Some(detail) = ClaimCard::find_by_id(*id, &deps.db_pool).await? {
                source_cards.push(detail);
            }
        }

        response_data = Some(serde_json::json!({
            "type": "contextual",
            "synthesized_response": &outcome.final_answer,
            "source_cards": source_cards,
        }));
    }

    if mode == RoutingMode::NovelClaim || response_data.is_none() {
        mode = RoutingMode::NovelClaim;
        response_data = Some(serde_json::json!({
            "type": "generating",
            "pipeline_status": "queued",
            "websocket_session_id": &session_id,
            "contextualized_question": &contextualized_question,
        }));

        // Start the pipeline in the background; progress streams over the
        // session channel.
        let pipeline_deps = deps.clone();
        let pipeline_question = contextualized_question.clone();
        let pipeline_session = session_id.clone();
        tokio::spawn(async move {
            let orchestrator = PipelineOrchestrator::new(&pipeline_deps);
            let cancel = CancellationToken::new();
            if let Err(e) = orchestrator
                .run(&pipeline_question, Some(&pipeline_session), &cancel)
                .await
            {
                tracing::error!(error = %e, "background pipeline run failed");
            }
        });
    }

    // Step 4: log the decision (candidates always present, `[]` if none).
    let response_time_ms = started.elapsed().as_millis() as i32;
    let reasoning = (!outcome.final_answer.is_empty()).then(|| outcome.final_answer.clone());

    let decision = RouterDecision::insert(
        &NewRouterDecision {
            question_text: request.question.clone(),
            reformulated_question: contextualized_question.clone(),
            conversation_context: serde_json::to_value(&request.conversation_history)
                .unwrap_or(serde_json::Value::Array(Vec::new())),
            mode_selected: mode,
            claim_cards_referenced: referenced,
            search_candidates: serde_json::to_value(&outcome.candidates)
                .unwrap_or(serde_json::Value::Array(Vec::new())),
            reasoning,
            response_time_ms,
        },
        &deps.db_pool,
    )
    .await?;

    deps.stream_hub
        .publish_event(
            &session_id,
            ProgressEvent::RoutingCompleted {
                mode: mode.as_str().to_string(),
                response_time_ms: response_time_ms as i64,
            },
        )
        .await;

    Ok(Json(ChatAskResponse {
        mode: mode.as_str().to_string(),
        response: response_data.expect("response payload set for every mode"),
        routing_decision_id: decision.id,
        websocket_session_id: (mode == RoutingMode::NovelClaim).then_some(session_id),
    }))
}
