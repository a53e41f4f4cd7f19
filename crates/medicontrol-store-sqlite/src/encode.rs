//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! Nullable columns are read into `Option`s here and collapsed to their empty
//! value (`""`, `0`, `None`) when converted to domain types.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use medicontrol_core::{
  category::Category,
  medication::{LowStockEntry, Medication},
  movement::{Movement, MovementKind, MovementWithMedication},
  sale::{SaleItem, SaleSummary},
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

/// Parse a stored timestamp. Besides RFC 3339, accepts the space-separated
/// layouts older databases were written with.
pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
    .map(|naive| naive.and_utc())
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

/// Lenient date parsing: blank or unrecognised values read as "no date"
/// rather than failing the whole row.
pub fn decode_date(s: Option<&str>) -> Option<NaiveDate> {
  let s = s?.trim();
  if s.is_empty() {
    return None;
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

// ─── MovementKind ────────────────────────────────────────────────────────────

pub fn encode_kind(k: MovementKind) -> &'static str { k.into() }

pub fn decode_kind(s: &str) -> Result<MovementKind> {
  MovementKind::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown movement kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every medication SELECT:
/// `id, name, manufacturer, form, registry_code, quantity, expiry, price,
/// created_at, category_id, category_name`.
pub struct RawMedication {
  pub id:            String,
  pub name:          String,
  pub manufacturer:  Option<String>,
  pub form:          Option<String>,
  pub registry_code: Option<String>,
  pub quantity:      Option<i64>,
  pub expiry:        Option<String>,
  pub price:         Option<f64>,
  pub created_at:    String,
  pub category_id:   Option<String>,
  pub category_name: Option<String>,
}

impl RawMedication {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      manufacturer:  row.get(2)?,
      form:          row.get(3)?,
      registry_code: row.get(4)?,
      quantity:      row.get(5)?,
      expiry:        row.get(6)?,
      price:         row.get(7)?,
      created_at:    row.get(8)?,
      category_id:   row.get(9)?,
      category_name: row.get(10)?,
    })
  }

  pub fn into_medication(self) -> Result<Medication> {
    let category = match (&self.category_id, self.category_name) {
      (Some(id), Some(name)) => Some(Category { id: id.clone(), name }),
      _ => None,
    };
    Ok(Medication {
      id: self.id,
      name: self.name,
      manufacturer: self.manufacturer.unwrap_or_default(),
      form: self.form.unwrap_or_default(),
      registry_code: self.registry_code.unwrap_or_default(),
      quantity: self.quantity.unwrap_or_default(),
      expiry: decode_date(self.expiry.as_deref()),
      price: self.price.unwrap_or_default(),
      created_at: decode_dt(&self.created_at)?,
      category_id: self.category_id.filter(|id| !id.is_empty()),
      category,
    })
  }
}

pub fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
  Ok(Category { id: row.get(0)?, name: row.get(1)? })
}

pub fn low_stock_from_row(row: &Row<'_>) -> rusqlite::Result<LowStockEntry> {
  Ok(LowStockEntry {
    id:           row.get(0)?,
    name:         row.get(1)?,
    manufacturer: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    quantity:     row.get(3)?,
  })
}

/// A `movements` row joined with its medication's name and form.
pub struct RawMovement {
  pub id:              String,
  pub medication_id:   String,
  pub kind:            String,
  pub quantity:        i64,
  pub created_at:      String,
  pub note:            Option<String>,
  pub medication_name: Option<String>,
  pub medication_form: Option<String>,
}

impl RawMovement {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      medication_id:   row.get(1)?,
      kind:            row.get(2)?,
      quantity:        row.get(3)?,
      created_at:      row.get(4)?,
      note:            row.get(5)?,
      medication_name: row.get(6)?,
      medication_form: row.get(7)?,
    })
  }

  pub fn into_history(self) -> Result<MovementWithMedication> {
    Ok(MovementWithMedication {
      movement:        Movement {
        id:            self.id,
        medication_id: self.medication_id,
        kind:          decode_kind(&self.kind)?,
        quantity:      self.quantity,
        timestamp:     decode_dt(&self.created_at)?,
        note:          self.note.unwrap_or_default(),
      },
      medication_name: self.medication_name.unwrap_or_default(),
      medication_form: self.medication_form.unwrap_or_default(),
    })
  }
}

pub fn sale_item_from_row(row: &Row<'_>) -> rusqlite::Result<SaleItem> {
  Ok(SaleItem {
    id:            row.get(0)?,
    sale_id:       row.get(1)?,
    medication_id: row.get(2)?,
    quantity:      row.get(3)?,
    unit_price:    row.get::<_, Option<f64>>(4)?.unwrap_or_default(),
  })
}

pub struct RawSaleSummary {
  pub id:           i64,
  pub created_at:   String,
  pub user_id:      Option<String>,
  pub item_count:   i64,
  pub total_amount: f64,
}

impl RawSaleSummary {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      created_at:   row.get(1)?,
      user_id:      row.get(2)?,
      item_count:   row.get(3)?,
      total_amount: row.get(4)?,
    })
  }

  pub fn into_summary(self) -> Result<SaleSummary> {
    Ok(SaleSummary {
      id:           self.id,
      timestamp:    decode_dt(&self.created_at)?,
      user_id:      self.user_id.unwrap_or_default(),
      item_count:   self.item_count,
      total_amount: self.total_amount,
    })
  }
}
