//! Medications: inventoried drug products.
//!
//! Field names on the wire follow the frontend's Portuguese contract; the Rust
//! names are the English equivalents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, category::Category, serde_ext};

// ─── Stored medication ───────────────────────────────────────────────────────

/// A catalog entry as read back from the store, with its category joined in.
///
/// Nullable columns are decoded to their empty value: `""` for text, `0.0` for
/// price, `None` for expiry and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
  pub id:            String,
  #[serde(rename = "nome")]
  pub name:          String,
  #[serde(rename = "fabricante")]
  pub manufacturer:  String,
  /// Dosage form, e.g. "comprimido" or "suspensão".
  #[serde(rename = "tipo")]
  pub form:          String,
  #[serde(rename = "codigo_anvisa")]
  pub registry_code: String,
  #[serde(rename = "quantidade")]
  pub quantity:      i64,
  #[serde(rename = "validade")]
  pub expiry:        Option<NaiveDate>,
  #[serde(rename = "preco")]
  pub price:         f64,
  #[serde(rename = "criado_em")]
  pub created_at:    DateTime<Utc>,
  #[serde(rename = "categoria_id")]
  pub category_id:   Option<String>,
  #[serde(rename = "categoria")]
  pub category:      Option<Category>,
}

impl Medication {
  /// Case-insensitive substring match over name, manufacturer and registry
  /// code. An empty term matches everything; any other term, whitespace
  /// included, is matched as given.
  pub fn matches(&self, term: &str) -> bool {
    if term.is_empty() {
      return true;
    }
    let needle = term.to_lowercase();
    [&self.name, &self.manufacturer, &self.registry_code]
      .iter()
      .any(|field| field.to_lowercase().contains(&needle))
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Input for [`InventoryStore::add_medication`](crate::store::InventoryStore::add_medication).
///
/// `quantity` is the stock on creation; afterwards it changes only through
/// movements and sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMedication {
  /// Caller-chosen id; a fresh UUID is assigned when absent or blank.
  #[serde(default, deserialize_with = "serde_ext::empty_string")]
  pub id:            Option<String>,
  #[serde(rename = "nome", default)]
  pub name:          String,
  #[serde(rename = "fabricante", default)]
  pub manufacturer:  String,
  #[serde(rename = "tipo", default)]
  pub form:          String,
  #[serde(rename = "codigo_anvisa", default)]
  pub registry_code: String,
  #[serde(rename = "quantidade", default)]
  pub quantity:      i64,
  #[serde(
    rename = "validade",
    default,
    deserialize_with = "serde_ext::empty_date"
  )]
  pub expiry:        Option<NaiveDate>,
  #[serde(rename = "preco", default)]
  pub price:         f64,
  #[serde(
    rename = "categoria_id",
    default,
    deserialize_with = "serde_ext::empty_string"
  )]
  pub category_id:   Option<String>,
  /// Overrides the server-assigned creation stamp (used by the seed import).
  #[serde(rename = "criado_em", default)]
  pub created_at:    Option<DateTime<Utc>>,
}

impl NewMedication {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn with_registry_code(mut self, code: impl Into<String>) -> Self {
    self.registry_code = code.into();
    self
  }

  pub fn with_quantity(mut self, quantity: i64) -> Self {
    self.quantity = quantity;
    self
  }

  pub fn with_price(mut self, price: f64) -> Self {
    self.price = price;
    self
  }

  pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
    self.manufacturer = manufacturer.into();
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::EmptyName);
    }
    if self.quantity < 0 {
      return Err(Error::NegativeQuantity(self.quantity));
    }
    validate_price(self.price)
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Replacement values for the mutable fields of a medication.
///
/// Quantity is absent on purpose: stock is adjusted only by movements and
/// sales. A `quantidade` key in the request body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationUpdate {
  #[serde(rename = "nome", default)]
  pub name:          String,
  #[serde(rename = "fabricante", default)]
  pub manufacturer:  String,
  #[serde(rename = "tipo", default)]
  pub form:          String,
  #[serde(rename = "codigo_anvisa", default)]
  pub registry_code: String,
  #[serde(
    rename = "validade",
    default,
    deserialize_with = "serde_ext::empty_date"
  )]
  pub expiry:        Option<NaiveDate>,
  #[serde(rename = "preco", default)]
  pub price:         f64,
  #[serde(
    rename = "categoria_id",
    default,
    deserialize_with = "serde_ext::empty_string"
  )]
  pub category_id:   Option<String>,
}

impl MedicationUpdate {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::EmptyName);
    }
    validate_price(self.price)
  }
}

impl From<&Medication> for MedicationUpdate {
  fn from(m: &Medication) -> Self {
    Self {
      name:          m.name.clone(),
      manufacturer:  m.manufacturer.clone(),
      form:          m.form.clone(),
      registry_code: m.registry_code.clone(),
      expiry:        m.expiry,
      price:         m.price,
      category_id:   m.category_id.clone(),
    }
  }
}

fn validate_price(price: f64) -> Result<()> {
  if !price.is_finite() || price < 0.0 {
    return Err(Error::InvalidPrice(price));
  }
  Ok(())
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Projection returned by the low-stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEntry {
  pub id:           String,
  #[serde(rename = "nome")]
  pub name:         String,
  #[serde(rename = "fabricante")]
  pub manufacturer: String,
  #[serde(rename = "quantidade")]
  pub quantity:     i64,
}
