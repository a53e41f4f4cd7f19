//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": "...", "code": "..."}`. Store failures
//! carry their [`ErrorKind`], which picks the status code; storage and
//! configuration failures are logged and replaced by a generic message.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use medicontrol_core::{ErrorKind, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error from a read: a missing entity is a 404.
  pub fn store<E: StoreError>(e: E) -> Self {
    ApiError::Store { kind: e.kind(), source: Box::new(e) }
  }

  /// Wrap a store error from a write: an id in the request body that does
  /// not exist is the caller's mistake, so it becomes a 400.
  pub fn write<E: StoreError>(e: E) -> Self {
    match e.kind() {
      ErrorKind::NotFound => ApiError::BadRequest(e.to_string()),
      _ => Self::store(e),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store { kind, .. } => match kind {
        ErrorKind::Validation | ErrorKind::InsufficientStock => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Storage | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::NotFound(_) => ErrorKind::NotFound.into(),
      ApiError::BadRequest(_) => ErrorKind::Validation.into(),
      ApiError::Store { kind, .. } => (*kind).into(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };
    (status, Json(json!({ "error": message, "code": self.code() }))).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}
