//! Claim audit API server.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audit_core::config::Config;
use audit_core::domains::blog::SchedulerSettings;
use audit_core::domains::verification::SourceVerificationService;
use audit_core::kernel::{
    BaseSearchService, EmbeddingService, GenerationScheduler, NoopSearchService, ServerDeps,
    StreamHub, TavilyClient,
};
use audit_core::server::build_app;
use llm_client::LlmClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,audit_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting claim audit server");

    let config = Arc::new(Config::from_env()?);

    // Database pool + migrations.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    // LLM gateway + embeddings.
    let llm = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        config.anthropic_api_key.clone(),
    ));
    let embedding_service = Arc::new(EmbeddingService::new(llm.clone()));

    // Web search (tier 4 + auto-suggest discovery).
    let web_searcher: Arc<dyn BaseSearchService> = match &config.tavily_api_key {
        Some(key) => Arc::new(TavilyClient::new(key.clone())?),
        None => Arc::new(NoopSearchService),
    };

    // Six-tier source verification.
    let verifier = Arc::new(SourceVerificationService::new(
        pool.clone(),
        llm.clone(),
        embedding_service.clone(),
        web_searcher.clone(),
        config.google_books_api_key.clone(),
        config.semantic_scholar_api_key.clone(),
    ));

    let deps = ServerDeps::new(
        pool.clone(),
        llm,
        embedding_service,
        web_searcher,
        verifier,
        StreamHub::new(),
        Arc::new(RwLock::new(SchedulerSettings::default())),
        config.clone(),
    );

    // Cron-driven article generation.
    let scheduler = Arc::new(GenerationScheduler::start(deps.clone()).await?);

    let app = build_app(deps, Some(scheduler));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    Ok(())
}
