//! HTTP error taxonomy.
//!
//! Errors surface at the HTTP boundary as a status code with a JSON body of
//! the shape `{"error": "<message>"}`. Nothing is retried; store failures
//! map to an opaque internal error while the cause is logged server-side.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors produced by the record API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested key does not exist in the store.
    #[error("{0}")]
    NotFound(&'static str),

    /// A record with this id already exists; records are immutable.
    #[error("already exists")]
    Conflict,

    /// The store or an encoding step failed; reported, never retried.
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            tracing::error!(name: "api.error.internal", error = %source, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
