//! Serde helpers for the loosely-typed fields the frontend sends.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Accept `null`, a missing field, or `""` as "no date"; otherwise parse
/// `YYYY-MM-DD`.
pub fn empty_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(de)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .map(Some)
      .map_err(serde::de::Error::custom),
  }
}

/// Treat `""` the same as an absent optional string.
pub fn empty_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(de)?;
  Ok(raw.filter(|s| !s.trim().is_empty()))
}
