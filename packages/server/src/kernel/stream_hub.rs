//! Per-session progress bus.
//!
//! Each chat session or pipeline run gets a broadcast channel of progress
//! events, keyed by session id. Subscribers may attach before or after
//! the session starts producing; an event published to a session nobody
//! is watching is dropped rather than buffered.
//!
//! Producers:
//!   hub.publish_event(&session_id, ProgressEvent::AgentStarted { .. }).await;
//!
//! Consumers (SSE endpoint):
//!   let rx = hub.subscribe(&session_id).await;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

/// Events carried on the bus, serialized as `{"type": ..., ...}` with a
/// timestamp injected at publish time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    ContextAnalysisStarted,
    RoutingStarted {
        contextualized_question: String,
    },
    RoutingCompleted {
        mode: String,
        response_time_ms: i64,
    },
    RouterFallback {
        reason: String,
    },
    PipelineStarted {
        question: String,
    },
    AgentStarted {
        agent_name: String,
    },
    AgentCompleted {
        agent_name: String,
        duration_ms: i64,
        success: bool,
    },
    PipelineCompleted {
        duration_ms: i64,
    },
    PipelineFailed {
        error: String,
        duration_ms: i64,
    },
    ClaimCardReady {
        claim_card: serde_json::Value,
    },
    Heartbeat,
}

impl ProgressEvent {
    /// The serialized `type` tag, for logging and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContextAnalysisStarted => "context_analysis_started",
            Self::RoutingStarted { .. } => "routing_started",
            Self::RoutingCompleted { .. } => "routing_completed",
            Self::RouterFallback { .. } => "router_fallback",
            Self::PipelineStarted { .. } => "pipeline_started",
            Self::AgentStarted { .. } => "agent_started",
            Self::AgentCompleted { .. } => "agent_completed",
            Self::PipelineCompleted { .. } => "pipeline_completed",
            Self::PipelineFailed { .. } => "pipeline_failed",
            Self::ClaimCardReady { .. } => "claim_card_ready",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Serialize with the publish-time timestamp injected.
    pub fn envelope(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("progress events serialize");
        value["timestamp"] = serde_json::Value::String(Utc::now().to_rfc3339());
        value
    }
}

/// Events buffered per session before slow subscribers start lagging.
const SESSION_EVENT_BUFFER: usize = 256;

/// In-process progress bus keyed by session id.
///
/// Thread-safe, cloneable. Subscribers receive the serialized event
/// envelopes; producers only ever hand over typed [`ProgressEvent`]s.
#[derive(Clone)]
pub struct StreamHub {
    sessions: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
}

impl StreamHub {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish a progress event to a session.
    ///
    /// The envelope is stamped here, once, so every subscriber sees the
    /// same timestamp. Sessions without a live subscriber swallow the
    /// event: either no channel exists yet, or every receiver is gone.
    pub async fn publish_event(&self, session_id: &str, event: ProgressEvent) {
        let payload = event.envelope();

        let delivered = match self.sessions.read().await.get(session_id) {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        };

        if !delivered {
            tracing::trace!(
                session = session_id,
                event = event.kind(),
                "progress event dropped (no subscribers)"
            );
        }
    }

    /// Attach to a session's event stream, opening the session channel if
    /// this subscriber arrived before the first event. Late subscribers
    /// miss whatever was published before they attached.
    pub async fn subscribe(&self, session_id: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(SESSION_EVENT_BUFFER);
                sessions.insert(session_id.to_string(), tx);
                rx
            }
        }
    }

    /// Drop session channels whose subscribers have all disconnected.
    /// Returns how many sessions were pruned.
    pub async fn prune_idle_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, tx| tx.receiver_count() > 0);
        before - sessions.len()
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe("session-1").await;

        hub.publish_event(
            "session-1",
            ProgressEvent::AgentStarted {
                agent_name: "topic_finder".to_string(),
            },
        )
        .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "agent_started");
        assert_eq!(received["agent_name"], "topic_finder");
        assert!(received["timestamp"].is_string());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        // Should not panic or buffer
        hub.publish_event("nobody", ProgressEvent::Heartbeat).await;
    }

    #[tokio::test]
    async fn late_subscriber_misses_early_events() {
        let hub = StreamHub::new();
        hub.publish_event(
            "session-2",
            ProgressEvent::PipelineStarted {
                question: "early".to_string(),
            },
        )
        .await;

        let mut rx = hub.subscribe("session-2").await;
        hub.publish_event("session-2", ProgressEvent::Heartbeat).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "heartbeat");
    }

    #[tokio::test]
    async fn prune_drops_sessions_with_no_subscribers() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("ephemeral").await;
        let _held = hub.subscribe("held").await;

        drop(rx);
        let pruned = hub.prune_idle_sessions().await;

        assert_eq!(pruned, 1);
        assert_eq!(hub.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe("ordered").await;

        for name in ["topic_finder", "source_checker", "adversarial_checker"] {
            hub.publish_event(
                "ordered",
                ProgressEvent::AgentStarted {
                    agent_name: name.to_string(),
                },
            )
            .await;
        }

        for expected in ["topic_finder", "source_checker", "adversarial_checker"] {
            let received = rx.recv().await.unwrap();
            assert_eq!(received["agent_name"], expected);
        }
    }

    #[test]
    fn kind_matches_the_serialized_tag() {
        let event = ProgressEvent::RoutingCompleted {
            mode: "EXACT_MATCH".to_string(),
            response_time_ms: 12,
        };
        assert_eq!(event.envelope()["type"], event.kind());
    }
}
