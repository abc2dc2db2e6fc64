//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<meadow_state::Error> for ApiError {
  fn from(e: meadow_state::Error) -> Self {
    match e {
      meadow_state::Error::NotFound(id) => {
        ApiError::NotFound(format!("contact {id} not found"))
      }
      meadow_state::Error::IdRetired(id) => {
        ApiError::Conflict(format!("contact {id} was deleted"))
      }
      meadow_state::Error::Store(source) => ApiError::Store(source),
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl From<meadow_core::Error> for ApiError {
  fn from(e: meadow_core::Error) -> Self {
    match e {
      meadow_core::Error::IdRetired(id) => {
        ApiError::Conflict(format!("contact {id} was deleted"))
      }
      meadow_core::Error::MissingField(field) => {
        ApiError::BadRequest(format!("{field} is required"))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
