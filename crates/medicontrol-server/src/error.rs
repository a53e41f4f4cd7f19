//! Error types for the auth layer and their `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("missing or malformed bearer token")]
  MissingToken,
  #[error("invalid token: {0}")]
  InvalidToken(#[source] jsonwebtoken::errors::Error),
  #[error("cannot issue token: {0}")]
  Issue(#[source] jsonwebtoken::errors::Error),
  #[error("password hashing failed: {0}")]
  Hash(String),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::InvalidCredentials | Error::MissingToken | Error::InvalidToken(_) => {
        StatusCode::UNAUTHORIZED
      }
      Error::Issue(_) | Error::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "auth failure");
      let body = json!({ "error": "internal server error", "code": "internal" });
      return (status, Json(body)).into_response();
    }
    tracing::debug!(error = %self, "rejected request");
    (status, Json(json!({ "error": self.to_string(), "code": "unauthorized" }))).into_response()
  }
}
