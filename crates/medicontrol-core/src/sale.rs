//! Multi-line sales.
//!
//! A sale owns its items. Both are append-only; the unit price on each item
//! is frozen from the medication's price at the moment the sale commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// User id recorded on a sale when no session user is attached.
pub const DEFAULT_USER_ID: &str = "system";

// ─── Input ───────────────────────────────────────────────────────────────────

/// One requested line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
  #[serde(rename = "medicamento_id")]
  pub medication_id: String,
  #[serde(rename = "quantidade")]
  pub quantity:      i64,
}

impl SaleLine {
  pub fn new(medication_id: impl Into<String>, quantity: i64) -> Self {
    Self { medication_id: medication_id.into(), quantity }
  }
}

/// Input for [`InventoryStore::record_sale`](crate::store::InventoryStore::record_sale).
///
/// Lines are applied in the order given. Duplicate medication ids are not
/// merged: each line is its own item and sees the stock left by the previous
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
  #[serde(rename = "itens", default)]
  pub lines:   Vec<SaleLine>,
  /// Set by the caller from the session; never read from a request body.
  #[serde(default, skip_deserializing)]
  pub user_id: Option<String>,
}

impl NewSale {
  pub fn new(lines: Vec<SaleLine>) -> Self { Self { lines, user_id: None } }

  pub fn validate(&self) -> Result<()> {
    if self.lines.is_empty() {
      return Err(Error::EmptySale);
    }
    for line in &self.lines {
      if line.medication_id.trim().is_empty() {
        return Err(Error::MissingMedicationId);
      }
      if line.quantity <= 0 {
        return Err(Error::NonPositiveQuantity(line.quantity));
      }
    }
    Ok(())
  }

  /// The user id to record, falling back to [`DEFAULT_USER_ID`].
  pub fn effective_user(&self) -> &str {
    self
      .user_id
      .as_deref()
      .filter(|u| !u.trim().is_empty())
      .unwrap_or(DEFAULT_USER_ID)
  }
}

// ─── Stored ──────────────────────────────────────────────────────────────────

/// A committed sale line with its frozen unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
  pub id:            i64,
  #[serde(rename = "venda_id")]
  pub sale_id:       i64,
  #[serde(rename = "medicamento_id")]
  pub medication_id: String,
  #[serde(rename = "quantidade")]
  pub quantity:      i64,
  #[serde(rename = "preco_unitario")]
  pub unit_price:    f64,
}

impl SaleItem {
  pub fn subtotal(&self) -> f64 { self.quantity as f64 * self.unit_price }
}

/// Per-sale aggregate used by the sales listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummary {
  pub id:           i64,
  #[serde(rename = "data")]
  pub timestamp:    DateTime<Utc>,
  pub user_id:      String,
  #[serde(rename = "quantidade_itens")]
  pub item_count:   i64,
  #[serde(rename = "total_venda")]
  pub total_amount: f64,
}
