//! Handlers for `/medicamentos` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/medicamentos` | Optional `?search=<term>` |
//! | `POST`   | `/medicamentos` | 201; optional `categoria_nome` |
//! | `GET`    | `/medicamentos/{id}` | 404 if not found |
//! | `PUT`    | `/medicamentos/{id}` | quantity in the body is ignored |
//! | `DELETE` | `/medicamentos/{id}` | 204; 409 if movements or sales reference it |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use medicontrol_core::{
  medication::{Medication, MedicationUpdate, NewMedication},
  store::InventoryStore,
};
use serde::Deserialize;

use crate::{
  ApiState,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub search: String,
}

/// `GET /medicamentos[?search=<term>]`
pub async fn list<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Medication>>, ApiError> {
  let found = state
    .store
    .search_medications(params.search)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(found))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /medicamentos/{id}`
pub async fn get_one<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<String>,
) -> Result<Json<Medication>, ApiError> {
  let medication = state
    .store
    .get_medication(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("medication {id} not found")))?;
  Ok(Json(medication))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub medication:     NewMedication,
  /// Category to file the medication under, created if it does not exist.
  #[serde(default)]
  pub categoria_nome: Option<String>,
}

/// `POST /medicamentos`
pub async fn create<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let mut input = body.medication;
  fill_from_registry(&state, &mut input).await?;
  input.validate().map_err(ApiError::store)?;

  // Filed only once the medication itself is known to be acceptable.
  if let Some(name) = body.categoria_nome.filter(|n| !n.trim().is_empty()) {
    let category = state
      .store
      .add_category(name)
      .await
      .map_err(ApiError::write)?;
    input.category_id = Some(category.id);
  }

  let medication = state
    .store
    .add_medication(input)
    .await
    .map_err(ApiError::write)?;
  tracing::info!(id = %medication.id, name = %medication.name, "created medication");
  Ok((StatusCode::CREATED, Json(medication)))
}

/// Complete a blank name or manufacturer from the registry code: the local
/// catalog is consulted first, then the drug registry.
async fn fill_from_registry<S: InventoryStore>(
  state: &ApiState<S>,
  input: &mut NewMedication,
) -> Result<(), ApiError> {
  let code = input.registry_code.trim();
  let needs_fill = input.name.trim().is_empty() || input.manufacturer.trim().is_empty();
  if code.is_empty() || !needs_fill {
    return Ok(());
  }

  let known = state
    .store
    .get_medication_by_registry_code(code.to_owned())
    .await
    .map_err(ApiError::store)?;
  let (name, manufacturer) = match known {
    Some(m) => (m.name, m.manufacturer),
    None => match state.registry.lookup(code) {
      Some(rec) => (rec.name, rec.manufacturer),
      None => return Ok(()),
    },
  };

  if input.name.trim().is_empty() {
    input.name = name;
  }
  if input.manufacturer.trim().is_empty() {
    input.manufacturer = manufacturer;
  }
  Ok(())
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /medicamentos/{id}`
pub async fn update<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<MedicationUpdate>,
) -> Result<Json<Medication>, ApiError> {
  let medication = state
    .store
    .update_medication(id.clone(), body)
    .await
    .map_err(ApiError::write)?
    .ok_or_else(|| ApiError::NotFound(format!("medication {id} not found")))?;
  Ok(Json(medication))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /medicamentos/{id}`
pub async fn delete<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
  let deleted = state
    .store
    .delete_medication(id.clone())
    .await
    .map_err(ApiError::write)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("medication {id} not found")));
  }
  tracing::info!(%id, "deleted medication");
  Ok(StatusCode::NO_CONTENT)
}
