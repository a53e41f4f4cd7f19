//! Drug registry lookup.
//!
//! The regulatory registry is modelled as a pure in-memory dictionary. No
//! network access happens here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What the registry knows about a registry code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
  #[serde(rename = "codigo")]
  pub code:         String,
  #[serde(rename = "nome")]
  pub name:         String,
  #[serde(rename = "fabricante")]
  pub manufacturer: String,
  #[serde(rename = "categoria")]
  pub category:     String,
}

/// Lookup of canonical product data by registry code.
pub trait DrugRegistry: Send + Sync {
  fn lookup(&self, code: &str) -> Option<RegistryRecord>;
}

/// A fixed dictionary of well-known products.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
  records: HashMap<String, RegistryRecord>,
}

const CANNED: &[(&str, &str, &str, &str)] = &[
  ("1097401420043", "Paracetamol (Tylenol) 500mg", "Janssen-Cilag", "Analgésico"),
  ("1024701490043", "Dipirona Monoidratada (Novalgina)", "Sanofi", "Analgésico"),
  ("1004307270013", "Amoxicilina 500mg", "EMS", "Antibiótico"),
  ("1781700780021", "Losartana Potássica 50mg", "Medley", "Anti-hipertensivo"),
  ("1058302990029", "Ibuprofeno 600mg", "Medley", "Anti-inflamatório"),
];

impl StaticRegistry {
  /// An empty registry; every lookup misses.
  pub fn empty() -> Self { Self { records: HashMap::new() } }

  pub fn with_record(mut self, record: RegistryRecord) -> Self {
    self.records.insert(record.code.clone(), record);
    self
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

impl Default for StaticRegistry {
  /// The registry preloaded with the canned product list.
  fn default() -> Self {
    CANNED.iter().fold(Self::empty(), |reg, (code, name, maker, cat)| {
      reg.with_record(RegistryRecord {
        code:         (*code).to_owned(),
        name:         (*name).to_owned(),
        manufacturer: (*maker).to_owned(),
        category:     (*cat).to_owned(),
      })
    })
  }
}

impl DrugRegistry for StaticRegistry {
  fn lookup(&self, code: &str) -> Option<RegistryRecord> {
    self.records.get(code.trim()).cloned()
  }
}
