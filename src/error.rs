use axum::{
    Json,
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{rate_limit::WINDOW_SECS, routes::ApiResponse};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => envelope(StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => envelope(StatusCode::NOT_FOUND, message),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, WINDOW_SECS.to_string())],
                Json(ApiResponse::failure("Too many requests")),
            )
                .into_response(),
            AppError::Store(err) => {
                // full detail stays server-side
                error!("store failure: {err}");
                envelope(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn envelope(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::failure(message))).into_response()
}
