//! JSON REST API for MediControl.
//!
//! Exposes an axum [`Router`] backed by any
//! [`medicontrol_core::store::InventoryStore`]. Auth, CORS and static files
//! are the caller's responsibility; an auth layer that knows who is calling
//! may attach an [`Actor`] extension to the request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", medicontrol_api::api_router(store.clone(), registry))
//! ```

pub mod categories;
pub mod error;
pub mod extract;
pub mod medications;
pub mod movements;
pub mod registry;
pub mod reports;
pub mod sales;

use std::sync::Arc;

use axum::{Router, routing::get};
use medicontrol_core::{registry::DrugRegistry, store::InventoryStore};

pub use error::ApiError;

/// Shared state for every handler.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub registry: Arc<dyn DrugRegistry>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), registry: self.registry.clone() }
  }
}

/// The authenticated user behind a request, inserted as a request extension
/// by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, registry: Arc<dyn DrugRegistry>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Catalog
    .route(
      "/medicamentos",
      get(medications::list::<S>).post(medications::create::<S>),
    )
    .route(
      "/medicamentos/{id}",
      get(medications::get_one::<S>)
        .put(medications::update::<S>)
        .delete(medications::delete::<S>),
    )
    .route(
      "/categorias",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    .route("/anvisa/{codigo}", get(registry::lookup::<S>))
    // Stock
    .route(
      "/movimentacoes",
      get(movements::list::<S>).post(movements::create::<S>),
    )
    // Sales
    .route("/vendas", get(sales::list::<S>).post(sales::create::<S>))
    .route("/vendas/{id}/itens", get(sales::items::<S>))
    // Reports
    .route("/relatorios/vendas", get(reports::units_sold::<S>))
    .route("/relatorios/baixo-estoque", get(reports::low_stock::<S>))
    .with_state(ApiState { store, registry })
}
