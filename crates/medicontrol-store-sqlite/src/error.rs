//! Error type for `medicontrol-store-sqlite`.

use std::path::PathBuf;

use medicontrol_core::{ErrorKind, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] medicontrol_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("i/o error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode column value: {0}")]
  Decode(String),

  /// A statement was requested that the registry never loaded.
  #[error("sql query not loaded: {0}")]
  MissingQuery(String),

  #[error("required sql queries not loaded: {}", .0.join(", "))]
  MissingCriticalQueries(Vec<String>),

  #[error("sql query {name:?} defined twice: {first:?} and {second:?}")]
  DuplicateQuery {
    name:   String,
    first:  PathBuf,
    second: PathBuf,
  },

  #[error("medication not found: {0}")]
  MedicationNotFound(String),

  #[error("category not found: {0}")]
  CategoryNotFound(String),

  #[error(
    "insufficient stock for {name}: requested {requested}, available {available}"
  )]
  InsufficientStock {
    name:      String,
    requested: i64,
    available: i64,
  },

  #[error("medication {id} is referenced by {references} movement(s) or sale item(s)")]
  MedicationReferenced { id: String, references: i64 },
}

impl Error {
  fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _)
      )) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Database(_) if self.is_constraint_violation() => ErrorKind::Conflict,
      Error::Database(_)
      | Error::Io { .. }
      | Error::Json(_)
      | Error::DateParse(_)
      | Error::Decode(_) => ErrorKind::Storage,
      Error::MissingQuery(_)
      | Error::MissingCriticalQueries(_)
      | Error::DuplicateQuery { .. } => ErrorKind::Config,
      Error::MedicationNotFound(_) | Error::CategoryNotFound(_) => {
        ErrorKind::NotFound
      }
      Error::InsufficientStock { .. } => ErrorKind::InsufficientStock,
      Error::MedicationReferenced { .. } => ErrorKind::Conflict,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
