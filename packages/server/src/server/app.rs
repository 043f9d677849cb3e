//! Application setup and router assembly.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{GenerationScheduler, ServerDeps};
use crate::server::routes::{admin, audits, blog, chat, health};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    /// Absent in tests that never start the cron scheduler.
    pub scheduler: Option<Arc<GenerationScheduler>>,
}

/// Build the Axum application router.
pub fn build_app(deps: ServerDeps, scheduler: Option<Arc<GenerationScheduler>>) -> Router {
    let stream_hub = deps.stream_hub.clone();
    let state = AppState { deps, scheduler };

    // SSE routes carry their own state (the hub alone).
    let sse_routes = Router::new()
        .route("/api/streams/{session_id}", get(crate::kernel::sse::stream_handler))
        .with_state(stream_hub);

    let api_routes = Router::new()
        // Chat surface
        .route("/api/chat/ask", post(chat::chat_ask))
        // Public audits
        .route("/api/audits/cards", get(audits::list_cards))
        .route("/api/audits/cards/{id}", get(audits::get_card))
        .route("/api/categories", get(audits::list_categories))
        // Public read page
        .route("/api/blog/posts", get(blog::list_posts))
        .route("/api/blog/posts/{id}", get(blog::get_post))
        // Admin: topic queue
        .route("/api/admin/topics", post(admin::create_topic).get(admin::list_topics))
        .route("/api/admin/topics/{id}", delete(admin::delete_topic))
        // Admin: review gating
        .route("/api/admin/review/pending", get(admin::list_pending_review))
        .route("/api/admin/review/{id}/approve", post(admin::approve_topic))
        .route("/api/admin/review/{id}/reject", post(admin::reject_topic))
        .route("/api/admin/review/{id}/revision", post(admin::request_revision))
        // Admin: scheduler + auto-suggest
        .route(
            "/api/admin/scheduler/settings",
            get(admin::get_scheduler_settings).put(admin::put_scheduler_settings),
        )
        .route("/api/admin/scheduler/run-now", post(admin::run_scheduler_now))
        .route("/api/admin/autosuggest/trigger", post(admin::trigger_autosuggest))
        .route("/api/admin/autosuggest/discover", post(admin::discover_topics))
        // Admin: content reset
        .route("/api/admin/database/reset", post(admin::database_reset))
        .with_state(state);

    api_routes
        .merge(sse_routes)
        .route("/health", get(health::health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
