use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{
    database,
    error::AppError,
    ideas::{Idea, Page, SortMode, UpvoteResult},
    state::State as AppState,
};

/// Uniform response wrapper; every endpoint speaks this shape.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match database::health_check(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "db": "ok" }))).into_response(),
        Err(err) => {
            error!("health probe failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": "database unavailable" })),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CreateIdea {
    #[serde(default)]
    text: String,
}

pub async fn create_idea_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateIdea>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // keep the envelope even for bodies that never parse
    let Json(payload) = payload.map_err(|_| AppError::Validation("Invalid JSON body".into()))?;

    let idea = state.store.create(&payload.text).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(idea))))
}

/// Query params land as raw strings so junk values degrade to defaults
/// instead of a deserialization rejection.
#[derive(Deserialize)]
pub struct ListParams {
    limit: Option<String>,
    offset: Option<String>,
    sort: Option<String>,
}

pub async fn list_ideas_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Idea>>>, AppError> {
    let page = Page::clamped(
        params.limit.as_deref().and_then(|v| v.parse().ok()),
        params.offset.as_deref().and_then(|v| v.parse().ok()),
    );
    let sort = params
        .sort
        .as_deref()
        .map(SortMode::from_param)
        .unwrap_or_default();

    let ideas = state.store.list(page, sort).await?;

    Ok(Json(ApiResponse::success(ideas)))
}

pub async fn upvote_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UpvoteResult>>, AppError> {
    let id: i32 = id
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation("Invalid id".into()))?;

    let result = state.store.upvote(id).await?;

    Ok(Json(ApiResponse::success(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn success_envelope_omits_error_field() {
        let value = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(value, json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn failure_envelope_omits_data_field() {
        let value = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn idea_serializes_created_at_as_iso8601() {
        let idea = Idea {
            id: 7,
            text: "Dark mode".into(),
            upvotes: 0,
            created_at: chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };

        let value = serde_json::to_value(&idea).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["upvotes"], 0);
        assert_eq!(value["created_at"], "2026-01-02T03:04:05Z");
    }
}
