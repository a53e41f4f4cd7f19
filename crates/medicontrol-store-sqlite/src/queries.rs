//! Named SQL statements loaded from disk.
//!
//! Every file ending in `.sql` under the query directory (searched
//! recursively) is registered under its file stem, so
//! `sql/sales/insert_sale.sql` becomes `insert_sale`. The registry is built
//! once at startup and is read-only afterwards.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Statements the store cannot run without. [`SqliteStore::open`] refuses to
/// start when any of these is absent.
///
/// [`SqliteStore::open`]: crate::SqliteStore::open
pub const CRITICAL_QUERIES: &[&str] = &[
  "create_categories_table",
  "create_medications_table",
  "create_movements_table",
  "create_sales_table",
  "create_sale_items_table",
  "select_medication_stock",
  "update_medication_stock",
  "insert_movement",
  "insert_sale",
  "insert_sale_item",
];

#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
  queries: HashMap<String, String>,
  origins: HashMap<String, PathBuf>,
}

impl QueryRegistry {
  /// Load every `.sql` file below `dir`.
  pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
    let mut registry = Self::default();
    registry.load_dir(dir.as_ref())?;
    tracing::info!(
      dir = %dir.as_ref().display(),
      count = registry.len(),
      "loaded sql queries"
    );
    Ok(registry)
  }

  fn load_dir(&mut self, dir: &Path) -> Result<()> {
    let io_err = |source| Error::Io { path: dir.to_path_buf(), source };

    let mut entries = std::fs::read_dir(dir)
      .map_err(io_err)?
      .collect::<std::io::Result<Vec<_>>>()
      .map_err(io_err)?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
      let path = entry.path();
      if path.is_dir() {
        self.load_dir(&path)?;
        continue;
      }
      if path.extension().and_then(|e| e.to_str()) != Some("sql") {
        continue;
      }
      let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      let text = std::fs::read_to_string(&path)
        .map_err(|source| Error::Io { path: path.clone(), source })?;
      self.insert_from(name.to_owned(), text, path.clone())?;
    }
    Ok(())
  }

  fn insert_from(&mut self, name: String, text: String, path: PathBuf) -> Result<()> {
    if let Some(first) = self.origins.get(&name) {
      return Err(Error::DuplicateQuery {
        name,
        first: first.clone(),
        second: path,
      });
    }
    tracing::debug!(query = %name, path = %path.display(), "registered sql query");
    self.origins.insert(name.clone(), path);
    self.queries.insert(name, text);
    Ok(())
  }

  /// Remove a statement; used to exercise missing-query handling.
  pub fn without_query(mut self, name: &str) -> Self {
    self.queries.remove(name);
    self.origins.remove(name);
    self
  }

  /// The text registered under `name`.
  pub fn get(&self, name: &str) -> Result<&str> {
    self
      .queries
      .get(name)
      .map(String::as_str)
      .ok_or_else(|| Error::MissingQuery(name.to_owned()))
  }

  /// Fail unless every name in `names` is registered.
  pub fn require(&self, names: &[&str]) -> Result<()> {
    let missing: Vec<String> = names
      .iter()
      .filter(|n| !self.queries.contains_key(**n))
      .map(|n| (*n).to_owned())
      .collect();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(Error::MissingCriticalQueries(missing))
    }
  }

  pub fn contains(&self, name: &str) -> bool { self.queries.contains_key(name) }

  pub fn len(&self) -> usize { self.queries.len() }

  pub fn is_empty(&self) -> bool { self.queries.is_empty() }
}
