//! Coarse classification labels for medications.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A category row. Names are unique and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id:   String,
  #[serde(rename = "nome")]
  pub name: String,
}

/// Trim a requested category name and reject blanks.
pub fn normalize_name(name: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::EmptyCategoryName);
  }
  Ok(trimmed.to_owned())
}
