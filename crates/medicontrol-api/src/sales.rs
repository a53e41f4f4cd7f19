//! Handlers for `/vendas` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/vendas` | Summaries, newest first |
//! | `POST` | `/vendas` | Body: `{"itens": [{"medicamento_id", "quantidade"}]}`; 201 `{"venda_id"}` |
//! | `GET`  | `/vendas/{id}/itens` | 404 if the sale does not exist |

use axum::{
  Extension,
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use medicontrol_core::{
  sale::{NewSale, SaleItem, SaleSummary},
  store::InventoryStore,
};
use serde_json::json;

use crate::{
  Actor,
  ApiState,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /vendas`
pub async fn list<S: InventoryStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<SaleSummary>>, ApiError> {
  let sales = state.store.list_sales_summary().await.map_err(ApiError::store)?;
  Ok(Json(sales))
}

/// `POST /vendas`. The acting user is the authenticated [`Actor`], else the
/// default placeholder.
pub async fn create<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  actor: Option<Extension<Actor>>,
  ApiJson(mut body): ApiJson<NewSale>,
) -> Result<impl IntoResponse, ApiError> {
  body.user_id = actor.map(|Extension(Actor(user))| user);
  let sale_id = state.store.record_sale(body).await.map_err(ApiError::write)?;
  Ok((StatusCode::CREATED, Json(json!({ "venda_id": sale_id }))))
}

/// `GET /vendas/{id}/itens`
pub async fn items<S: InventoryStore>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<SaleItem>>, ApiError> {
  let items = state
    .store
    .get_sale_items(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("sale {id} not found")))?;
  Ok(Json(items))
}
