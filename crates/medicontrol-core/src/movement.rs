//! Audited stock adjustments, independent of sales.
//!
//! A movement is write-once: after it commits it is never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Direction of a stock adjustment.
///
/// The wire and database form is Portuguese (`entrada` / `saida`); the
/// English names are accepted as aliases on input.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum MovementKind {
  #[serde(rename = "entrada", alias = "entry")]
  #[strum(to_string = "entrada", serialize = "entry")]
  Entry,
  #[serde(rename = "saida", alias = "exit")]
  #[strum(to_string = "saida", serialize = "exit")]
  Exit,
}

impl MovementKind {
  /// Apply this movement to `current`.
  ///
  /// `Ok(None)` means an exit would drive stock below zero. A result that
  /// does not fit in an `i64` is [`Error::QuantityOverflow`].
  pub fn apply(self, current: i64, quantity: i64) -> Result<Option<i64>> {
    let next = match self {
      MovementKind::Entry => current.checked_add(quantity),
      MovementKind::Exit if current >= quantity => current.checked_sub(quantity),
      MovementKind::Exit => return Ok(None),
    };
    next
      .map(Some)
      .ok_or(Error::QuantityOverflow { current, quantity })
  }
}

/// Input for [`InventoryStore::record_movement`](crate::store::InventoryStore::record_movement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
  #[serde(rename = "medicamento_id")]
  pub medication_id: String,
  #[serde(rename = "tipo")]
  pub kind:          MovementKind,
  #[serde(rename = "quantidade")]
  pub quantity:      i64,
  #[serde(rename = "observacao", default)]
  pub note:          String,
}

impl NewMovement {
  pub fn new(
    medication_id: impl Into<String>,
    kind: MovementKind,
    quantity: i64,
  ) -> Self {
    Self {
      medication_id: medication_id.into(),
      kind,
      quantity,
      note: String::new(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.medication_id.trim().is_empty() {
      return Err(Error::MissingMedicationId);
    }
    if self.quantity <= 0 {
      return Err(Error::NonPositiveQuantity(self.quantity));
    }
    Ok(())
  }
}

/// A committed movement. `timestamp` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
  pub id:            String,
  #[serde(rename = "medicamento_id")]
  pub medication_id: String,
  #[serde(rename = "tipo")]
  pub kind:          MovementKind,
  #[serde(rename = "quantidade")]
  pub quantity:      i64,
  #[serde(rename = "data")]
  pub timestamp:     DateTime<Utc>,
  #[serde(rename = "observacao")]
  pub note:          String,
}

/// A movement joined with the name and form of its medication, for the
/// history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementWithMedication {
  #[serde(flatten)]
  pub movement:        Movement,
  #[serde(rename = "nome_medicamento")]
  pub medication_name: String,
  #[serde(rename = "tipo_medicamento")]
  pub medication_form: String,
}
