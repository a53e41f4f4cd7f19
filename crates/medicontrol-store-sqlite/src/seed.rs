//! Startup bootstrap: price back-fill and one-shot catalog import.
//!
//! The seed file is a JSON array of product records. Both passes are
//! best-effort: a missing or malformed file, or an individual bad entry, is
//! logged and skipped. Nothing here can abort startup.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use medicontrol_core::{medication::NewMedication, store::InventoryStore};
use serde::Deserialize;

use crate::{Error, Result, SqliteStore, encode::decode_date};

// ─── Seed record ─────────────────────────────────────────────────────────────

/// One product in the seed file. The Portuguese keys are primary;
/// English keys are accepted as aliases. The leaflet text and the numeric id
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
  #[serde(rename = "nome", alias = "name")]
  pub name:          String,
  #[serde(rename = "codigo_anvisa", alias = "registry_code", default)]
  pub registry_code: String,
  #[serde(rename = "quantidade_estoque", alias = "stock", default)]
  pub stock:         i64,
  #[serde(rename = "preco_venda", alias = "price", default)]
  pub price:         f64,
  #[serde(rename = "fabricante", alias = "manufacturer", default)]
  pub manufacturer:  String,
  #[serde(rename = "data_validade", alias = "expiry", default)]
  pub expiry:        String,
  #[serde(rename = "data_entrada", alias = "entry_date", default)]
  pub entry_date:    String,
}

impl SeedEntry {
  /// Map to a catalog insert: `stock → quantity`, `entry_date → created_at`.
  /// An unreadable entry date falls back to "now".
  pub fn to_new_medication(&self) -> NewMedication {
    let created_at = parse_entry_date(&self.entry_date);
    if created_at.is_none() && !self.entry_date.trim().is_empty() {
      tracing::warn!(
        name = %self.name,
        entry_date = %self.entry_date,
        "unreadable entry date, using current time"
      );
    }
    NewMedication {
      id: None,
      name: self.name.clone(),
      manufacturer: self.manufacturer.clone(),
      form: String::new(),
      registry_code: self.registry_code.clone(),
      quantity: self.stock,
      expiry: decode_date(Some(&self.expiry)),
      price: self.price,
      category_id: None,
      created_at,
    }
  }
}

fn parse_entry_date(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  decode_date(Some(s))
    .and_then(|d: NaiveDate| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// Read the seed file, keeping every entry that decodes and logging the rest.
pub async fn load_entries(path: &Path) -> Result<Vec<SeedEntry>> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
  let values: Vec<serde_json::Value> = serde_json::from_slice(&bytes)?;

  let mut entries = Vec::with_capacity(values.len());
  for (index, value) in values.into_iter().enumerate() {
    match serde_json::from_value::<SeedEntry>(value) {
      Ok(entry) => entries.push(entry),
      Err(e) => tracing::warn!(index, error = %e, "skipping malformed seed entry"),
    }
  }
  Ok(entries)
}

// ─── Passes ──────────────────────────────────────────────────────────────────

/// Outcome of [`bootstrap`], mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub backfilled: usize,
  pub imported:   usize,
  pub skipped:    usize,
  /// The catalog already had rows, so the import pass did nothing.
  pub populated:  bool,
}

/// Fill in zero prices from the seed, then import the seed if the catalog is
/// empty.
pub async fn bootstrap(store: &SqliteStore, path: &Path) -> SeedReport {
  let mut report = SeedReport::default();

  let entries = match load_entries(path).await {
    Ok(entries) => entries,
    Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
      tracing::info!(path = %path.display(), "no seed file, skipping bootstrap");
      return report;
    }
    Err(e) => {
      tracing::warn!(path = %path.display(), error = %e, "cannot read seed file");
      return report;
    }
  };

  match backfill_prices(store, &entries).await {
    Ok(n) => report.backfilled = n,
    Err(e) => tracing::warn!(error = %e, "price back-fill failed"),
  }

  match import_if_empty(store, &entries).await {
    Ok(Some((imported, skipped))) => {
      report.imported = imported;
      report.skipped = skipped;
    }
    Ok(None) => report.populated = true,
    Err(e) => tracing::warn!(error = %e, "seed import failed"),
  }

  tracing::info!(
    backfilled = report.backfilled,
    imported = report.imported,
    skipped = report.skipped,
    "bootstrap finished"
  );
  report
}

/// Set the seed price on catalog rows whose price is zero. Additive and safe
/// to re-run.
pub async fn backfill_prices(store: &SqliteStore, entries: &[SeedEntry]) -> Result<usize> {
  let prices = entries
    .iter()
    .map(|e| (e.registry_code.trim().to_owned(), e.price))
    .collect();
  let changed = store.backfill_prices(prices).await?;
  if changed > 0 {
    tracing::info!(changed, "back-filled medication prices");
  }
  Ok(changed)
}

/// Insert every entry when the catalog is empty. Returns `None` when the
/// catalog already had rows, else `(imported, skipped)`.
pub async fn import_if_empty(
  store: &SqliteStore,
  entries: &[SeedEntry],
) -> Result<Option<(usize, usize)>> {
  if store.count_medications().await? > 0 {
    tracing::info!("catalog already populated, skipping seed import");
    return Ok(None);
  }

  let (mut imported, mut skipped) = (0, 0);
  for entry in entries {
    match store.add_medication(entry.to_new_medication()).await {
      Ok(_) => imported += 1,
      Err(e) => {
        skipped += 1;
        tracing::warn!(name = %entry.name, error = %e, "skipping seed entry");
      }
    }
  }
  Ok(Some((imported, skipped)))
}
