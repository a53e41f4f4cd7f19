//! Handlers for `/relatorios` endpoints.

use axum::{Json, extract::State};
use medicontrol_core::{medication::LowStockEntry, store::InventoryStore};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiState, error::ApiError, extract::ApiQuery};

/// Threshold used when `limite` is not given.
pub const DEFAULT_LOW_STOCK_LIMIT: i64 = 50;

/// `GET /relatorios/vendas`: `{"total_vendas": <units sold>}`
pub async fn units_sold<S: InventoryStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Value>, ApiError> {
  let total = state.store.total_units_sold().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "total_vendas": total })))
}

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
  pub limite: Option<i64>,
}

/// `GET /relatorios/baixo-estoque[?limite=N]`: medications with fewer than
/// `N` units on hand.
pub async fn low_stock<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiQuery(params): ApiQuery<LowStockParams>,
) -> Result<Json<Vec<LowStockEntry>>, ApiError> {
  let limit = params.limite.unwrap_or(DEFAULT_LOW_STOCK_LIMIT);
  let entries = state.store.list_low_stock(limit).await.map_err(ApiError::store)?;
  Ok(Json(entries))
}
