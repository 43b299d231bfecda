//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rides_core::validate::ValidationErrors;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A business rule turned the request down; nothing was changed.
  #[error("declined: {0}")]
  Declined(String),

  #[error("ride is invalid: {0}")]
  Invalid(ValidationErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<rides_core::Error> for ApiError {
  fn from(e: rides_core::Error) -> Self {
    use rides_core::Error as E;
    match e {
      E::RideNotFound(id) => ApiError::NotFound(format!("ride {id} not found")),
      E::ConversationNotFound(id) => {
        ApiError::NotFound(format!("conversation {id} not found"))
      }
      E::Invalid(errors) => ApiError::Invalid(errors),
      E::Conflict(id) => {
        ApiError::Declined(format!("ride {id} was modified concurrently"))
      }
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Declined(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Invalid(errors) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": errors.to_string(), "fields": errors }),
      ),
      ApiError::Store(e) => {
        tracing::error!("request failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
