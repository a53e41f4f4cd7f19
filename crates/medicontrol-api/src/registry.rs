//! Handler for `/anvisa/{codigo}`: registry-code lookup.

use axum::{Json, extract::State};
use medicontrol_core::store::InventoryStore;
use serde::Serialize;

use crate::{ApiState, error::ApiError, extract::ApiPath};

#[derive(Debug, Serialize)]
pub struct LookupResponse {
  pub nome:       String,
  pub fabricante: String,
  /// Whether the code is already in the local catalog.
  pub exists:     bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub categoria:  Option<String>,
}

/// `GET /anvisa/{codigo}`: the local catalog first, then the drug registry.
pub async fn lookup<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiPath(code): ApiPath<String>,
) -> Result<Json<LookupResponse>, ApiError> {
  let known = state
    .store
    .get_medication_by_registry_code(code.clone())
    .await
    .map_err(ApiError::store)?;
  if let Some(m) = known {
    return Ok(Json(LookupResponse {
      nome:       m.name,
      fabricante: m.manufacturer,
      exists:     true,
      categoria:  m.category.map(|c| c.name),
    }));
  }

  let record = state
    .registry
    .lookup(&code)
    .ok_or_else(|| ApiError::NotFound(format!("registry code {code} not found")))?;
  Ok(Json(LookupResponse {
    nome:       record.name,
    fabricante: record.manufacturer,
    exists:     false,
    categoria:  Some(record.category),
  }))
}
