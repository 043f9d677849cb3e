//! Public audits surface: visible claim cards with filters.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domains::claims::models::{AuditFilters, CategoryTag, ClaimCard};
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub category: Option<String>,
    pub verdict: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filters = AuditFilters {
        category: query.category,
        verdict: query.verdict,
        search: query.search,
        skip: query.skip.max(0),
        limit: query.limit.clamp(1, 100),
    };

    let cards = ClaimCard::list_for_audits(&filters, &state.deps.db_pool).await?;
    let total = ClaimCard::count_for_audits(&filters, &state.deps.db_pool).await?;

    Ok(Json(serde_json::json!({
        "cards": cards,
        "total": total,
        "skip": filters.skip,
        "limit": filters.limit,
    })))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let detail = ClaimCard::find_by_id(id, &state.deps.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("claim card {id} not found")))?;

    if !detail.card.visible_in_audits {
        return Err(ApiError::NotFound(format!("claim card {id} not found")));
    }

    Ok(Json(serde_json::to_value(detail).unwrap_or_default()))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let categories = CategoryTag::unique_categories(&state.deps.db_pool).await?;
    Ok(Json(categories))
}
