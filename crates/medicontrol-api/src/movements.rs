//! Handlers for `/movimentacoes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/movimentacoes` | Newest first, joined with medication name and form |
//! | `POST` | `/movimentacoes` | Body: `{"medicamento_id", "tipo": "entrada"\|"saida", "quantidade"}` |

use axum::{Json, extract::State};
use medicontrol_core::{
  movement::{Movement, MovementWithMedication, NewMovement},
  store::InventoryStore,
};

use crate::{ApiState, error::ApiError, extract::ApiJson};

/// `GET /movimentacoes`
pub async fn list<S: InventoryStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<MovementWithMedication>>, ApiError> {
  let history = state.store.list_movements().await.map_err(ApiError::store)?;
  Ok(Json(history))
}

/// `POST /movimentacoes`: 200 with the recorded movement; 400 for an unknown
/// medication or insufficient stock.
pub async fn create<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<NewMovement>,
) -> Result<Json<Movement>, ApiError> {
  let movement = state
    .store
    .record_movement(body)
    .await
    .map_err(ApiError::write)?;
  Ok(Json(movement))
}
