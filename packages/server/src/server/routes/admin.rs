//! Admin surface: topic queue, review gating, schedule settings,
//! auto-suggest triggers, and the content reset.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domains::blog::{self, RevisionTarget, SchedulerSettings, TopicQueueEntry, TopicStatus};
use crate::domains::claims::reset::reset_generated_content;
use crate::server::app::AppState;
use crate::server::error::ApiError;

// =============================================================================
// Topic queue
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    pub topic_text: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub source: Option<String>,
}

fn default_priority() -> i32 {
    5
}

pub async fn create_topic(
    State(state): State<AppState>,
    Json(request): Json<CreateTopicRequest>,
) -> Result<Json<TopicQueueEntry>, ApiError> {
    if request.topic_text.trim().is_empty() {
        return Err(ApiError::BadRequest("topic_text cannot be empty".to_string()));
    }

    let entry = TopicQueueEntry::create(
        &request.topic_text,
        request.priority,
        request.source.as_deref().or(Some("manual")),
        &state.deps.db_pool,
    )
    .await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<Vec<TopicQueueEntry>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some("QUEUED") => Some(TopicStatus::Queued),
        Some("PROCESSING") => Some(TopicStatus::Processing),
        Some("COMPLETED") => Some(TopicStatus::Completed),
        Some("FAILED") => Some(TopicStatus::Failed),
        Some(other) => {
            return Err(ApiError::BadRequest(format!("unknown status '{other}'")));
        }
    };

    let entries = TopicQueueEntry::list(
        status,
        query.skip.max(0),
        query.limit.clamp(1, 100),
        &state.deps.db_pool,
    )
    .await?;
    Ok(Json(entries))
}

pub async fn delete_topic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = TopicQueueEntry::delete(id, &state.deps.db_pool).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("topic {id} not found")));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// =============================================================================
// Review gating
// =============================================================================

pub async fn list_pending_review(
    State(state): State<AppState>,
) -> Result<Json<Vec<TopicQueueEntry>>, ApiError> {
    let entries = TopicQueueEntry::list_pending_review(&state.deps.db_pool).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub reviewed_by: String,
    pub notes: Option<String>,
}

pub async fn approve_topic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (topic, post) = blog::review::approve(
        id,
        &request.reviewed_by,
        request.notes.as_deref(),
        &state.deps.db_pool,
    )
    .await
    .map_err(|e| ApiError::Conflict(e.to_string()))?;

    Ok(Json(serde_json::json!({ "topic": topic, "blog_post": post })))
}

pub async fn reject_topic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<TopicQueueEntry>, ApiError> {
    let topic = blog::review::reject(id, &request.reviewed_by, &state.deps.db_pool)
        .await
        .map_err(|e| ApiError::Conflict(e.to_string()))?;
    Ok(Json(topic))
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    #[serde(flatten)]
    pub target: RevisionTarget,
    pub feedback: String,
}

pub async fn request_revision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RevisionRequest>,
) -> Result<Json<TopicQueueEntry>, ApiError> {
    let topic =
        blog::review::request_revision(id, request.target, &request.feedback, &state.deps.db_pool)
            .await
            .map_err(|e| ApiError::Conflict(e.to_string()))?;
    Ok(Json(topic))
}

// =============================================================================
// Scheduler settings
// =============================================================================

pub async fn get_scheduler_settings(
    State(state): State<AppState>,
) -> Json<SchedulerSettings> {
    Json(state.deps.scheduler_settings.read().await.clone())
}

pub async fn put_scheduler_settings(
    State(state): State<AppState>,
    Json(settings): Json<SchedulerSettings>,
) -> Result<Json<SchedulerSettings>, ApiError> {
    if settings.cron_hour > 23 || settings.cron_minute > 59 {
        return Err(ApiError::BadRequest("invalid schedule time".to_string()));
    }

    *state.deps.scheduler_settings.write().await = settings.clone();

    if let Some(scheduler) = &state.scheduler {
        scheduler
            .apply_settings(&state.deps)
            .await
            .map_err(ApiError::Internal)?;
    }

    Ok(Json(settings))
}

pub async fn run_scheduler_now(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reports = blog::run_scheduled_generation(&state.deps).await?;
    Ok(Json(serde_json::json!({ "generated": reports })))
}

// =============================================================================
// Auto-suggest
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub source_text: String,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
}

pub async fn trigger_autosuggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = blog::autosuggest::suggest_from_text(
        &state.deps,
        &request.source_text,
        request.source_name.as_deref(),
        request.source_url.as_deref(),
    )
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

pub async fn discover_topics(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = blog::autosuggest::discover(&state.deps).await?;
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

// =============================================================================
// Content reset
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn database_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !request.confirm {
        return Err(ApiError::BadRequest(
            "Confirmation required: set 'confirm' to true".to_string(),
        ));
    }

    let summary = reset_generated_content(&state.deps.db_pool)
        .await
        .map_err(|e| ApiError::Conflict(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "deleted": summary,
        "preserved": ["agent_prompts", "verified_sources"],
    })))
}
