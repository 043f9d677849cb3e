//! Public read surface: published articles only.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domains::blog::BlogPost;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, 100);

    let posts = BlogPost::list(true, skip, limit, &state.deps.db_pool).await?;
    let total = BlogPost::count(true, &state.deps.db_pool).await?;

    Ok(Json(serde_json::json!({
        "posts": posts,
        "total": total,
        "skip": skip,
        "limit": limit,
    })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = BlogPost::find_by_id(id, &state.deps.db_pool)
        .await?
        .filter(|p| p.published_at.is_some())
        .ok_or_else(|| ApiError::NotFound(format!("blog post {id} not found")))?;

    Ok(Json(post))
}
