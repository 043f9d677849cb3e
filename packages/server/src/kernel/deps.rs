//! Server dependencies (using traits for testability)
//!
//! Central dependency container handed to routes, agents, and background
//! tasks. Everything external sits behind a trait so tests can inject
//! mocks.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::domains::blog::SchedulerSettings;
use crate::kernel::{
    stream_hub::StreamHub, BaseEmbeddingService, BaseLlm, BaseSearchService, BaseSourceVerifier,
};

/// Dependencies accessible to domain logic.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// LLM gateway for all agent completions and tool calls.
    pub llm: Arc<dyn BaseLlm>,
    pub embedding_service: Arc<dyn BaseEmbeddingService>,
    /// Web searcher (generic-web verification tier, auto-suggest discovery).
    pub web_searcher: Arc<dyn BaseSearchService>,
    /// Six-tier external source verification.
    pub verifier: Arc<dyn BaseSourceVerifier>,
    /// Per-session progress bus feeding the SSE endpoints.
    pub stream_hub: StreamHub,
    /// Admin-editable generation schedule.
    pub scheduler_settings: Arc<RwLock<SchedulerSettings>>,
    pub config: Arc<Config>,
}

impl ServerDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        llm: Arc<dyn BaseLlm>,
        embedding_service: Arc<dyn BaseEmbeddingService>,
        web_searcher: Arc<dyn BaseSearchService>,
        verifier: Arc<dyn BaseSourceVerifier>,
        stream_hub: StreamHub,
        scheduler_settings: Arc<RwLock<SchedulerSettings>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db_pool,
            llm,
            embedding_service,
            web_searcher,
            verifier,
            stream_hub,
            scheduler_settings,
            config,
        }
    }
}
