//! Handlers for `/categorias` endpoints.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use medicontrol_core::{category::Category, store::InventoryStore};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, extract::ApiJson};

/// `GET /categorias`, sorted by name. Always an array, `[]` when empty.
pub async fn list<S: InventoryStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Category>>, ApiError> {
  let mut categories = state.store.list_categories().await.map_err(ApiError::store)?;
  categories.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub nome: String,
}

/// `POST /categorias`: idempotent, an existing name returns the existing
/// category.
pub async fn create<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let category = state
    .store
    .add_category(body.nome)
    .await
    .map_err(ApiError::write)?;
  Ok((StatusCode::CREATED, Json(category)))
}
