//! Error types for `medicontrol-core`.
//!
//! [`Error`] covers input validation, which needs no storage. [`ErrorKind`]
//! is the backend-independent taxonomy every store error maps onto, so the
//! HTTP layer can pick a status code without knowing which backend failed.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("medication name must not be empty")]
  EmptyName,

  #[error("category name must not be empty")]
  EmptyCategoryName,

  #[error("price must be a finite, non-negative number, got {0}")]
  InvalidPrice(f64),

  #[error("quantity must not be negative, got {0}")]
  NegativeQuantity(i64),

  #[error("quantity must be greater than zero, got {0}")]
  NonPositiveQuantity(i64),

  #[error("medication id must not be empty")]
  MissingMedicationId,

  #[error("a sale must contain at least one item")]
  EmptySale,

  #[error("moving {quantity} units against a stock of {current} overflows")]
  QuantityOverflow { current: i64, quantity: i64 },
}

impl Error {
  /// Every core error is a rejected input.
  pub fn kind(&self) -> ErrorKind { ErrorKind::Validation }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Coarse classification of a failure, shared by every backend.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// Malformed input, negative quantity, empty sale, unknown movement kind.
  Validation,
  /// A referenced medication or sale does not exist.
  NotFound,
  /// An exit or sale line exceeds the quantity on hand.
  InsufficientStock,
  /// The operation would break a uniqueness or referential rule.
  Conflict,
  /// The underlying store failed; the operation was rolled back.
  Storage,
  /// The store is misconfigured (e.g. a required SQL statement is missing).
  Config,
}

/// Implemented by every [`InventoryStore`](crate::store::InventoryStore)
/// error type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind { Error::kind(self) }
}

impl StoreError for std::convert::Infallible {
  fn kind(&self) -> ErrorKind { match *self {} }
}
