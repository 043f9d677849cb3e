//! Pipeline orchestrator.
//!
//! Runs the five agents in order, merging each stage's output into the
//! aggregated state the next stage consumes. Fails fast on the first
//! agent error; cancellation is checked at stage boundaries; the whole
//! run sits under a wall-clock timeout.

use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domains::agents::{
    framework, AdversarialChecker, Agent, AgentContext, AgentError, JsonMap, Publisher,
    SourceChecker, TopicFinder, Writer,
};
use crate::kernel::{ProgressEvent, ServerDeps};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("pipeline timed out after {0}s")]
    Timeout(u64),
}

/// Result of a completed run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The persisted card (set by the Publisher stage).
    pub claim_card_id: Option<Uuid>,
    /// Aggregated stage outputs.
    pub data: JsonMap,
    pub duration_ms: i64,
}

pub struct PipelineOrchestrator<'a> {
    deps: &'a ServerDeps,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    /// Run all five stages for one question. Emits pipeline and agent
    /// events on the session's progress topic when one is given.
    pub async fn run(
        &self,
        question: &str,
        session_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let timeout_secs = self.deps.config.pipeline_timeout_secs;
        let deadline = std::time::Duration::from_secs(timeout_secs);

        match tokio::time::timeout(deadline, self.run_inner(question, session_id, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                self.emit_failed(session_id, &format!("timed out after {timeout_secs}s"), 1000 * timeout_secs as i64)
                    .await;
                Err(PipelineError::Timeout(timeout_secs))
            }
        }
    }

    async fn run_inner(
        &self,
        question: &str,
        session_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();
        let ctx = AgentContext::new(self.deps, session_id);

        ctx.emit(ProgressEvent::PipelineStarted {
            question: question.to_string(),
        })
        .await;

        let mut aggregated = JsonMap::new();
        aggregated.insert("question".to_string(), serde_json::json!(question));

        let stages: [&dyn Agent; 5] = [
            &TopicFinder,
            &SourceChecker,
            &AdversarialChecker,
            &Writer,
            &Publisher,
        ];

        for stage in stages {
            // Cooperative cancellation at stage boundaries.
            if cancel.is_cancelled() {
                let duration_ms = started.elapsed().as_millis() as i64;
                self.emit_failed(session_id, "cancelled", duration_ms).await;
                return Err(PipelineError::Cancelled);
            }

            match framework::run(stage, &ctx, &aggregated).await {
                Ok(output) => {
                    for (key, value) in output {
                        aggregated.insert(key, value);
                    }
                }
                Err(e) => {
                    let duration_ms = started.elapsed().as_millis() as i64;
                    self.emit_failed(session_id, &e.to_string(), duration_ms).await;
                    return Err(e.into());
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as i64;
        ctx.emit(ProgressEvent::PipelineCompleted { duration_ms }).await;

        let claim_card_id = aggregated
            .get("claim_card_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());

        tracing::info!(duration_ms, ?claim_card_id, "pipeline completed");

        Ok(PipelineOutcome {
            claim_card_id,
            data: aggregated,
            duration_ms,
        })
    }

    async fn emit_failed(&self, session_id: Option<&str>, error: &str, duration_ms: i64) {
        if let Some(session) = session_id {
            self.deps
                .stream_hub
                .publish_event(
                    session,
                    ProgressEvent::PipelineFailed {
                        error: error.to_string(),
                        duration_ms,
                    },
                )
                .await;
        }
    }
}
