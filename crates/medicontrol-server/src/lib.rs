//! HTTP server for MediControl.
//!
//! Wraps the JSON API in bearer-token auth, serves the single-page frontend
//! from a static directory, and applies CORS and request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json,
  Router,
  extract::{Request, State},
  http::{Method, header},
  middleware::{self, Next},
  response::Response,
  routing::post,
};
use medicontrol_api::{Actor, api_router, extract::ApiJson};
use medicontrol_core::{registry::DrugRegistry, store::InventoryStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
  cors::{Any, CorsLayer},
  services::ServeDir,
  trace::TraceLayer,
};

use auth::{AuthConfig, TokenIssuer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MEDICONTROL_*` environment variables. Every field has a default.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub database_path:      PathBuf,
  pub sql_dir:            PathBuf,
  pub static_dir:         PathBuf,
  pub seed_path:          PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: Option<String>,
  /// HMAC secret for session tokens; a random one is generated when unset.
  pub jwt_secret:         Option<String>,
  pub token_ttl_hours:    i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "0.0.0.0".to_string(),
      port:               8080,
      database_path:      PathBuf::from("data/medicontrol.db"),
      sql_dir:            PathBuf::from("sql"),
      static_dir:         PathBuf::from("static"),
      seed_path:          PathBuf::from("data/medicamentos_500_com_bula.json"),
      auth_username:      "admin".to_string(),
      auth_password_hash: None,
      jwt_secret:         None,
      token_ttl_hours:    24,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the login handler and auth middleware.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub registry: Arc<dyn DrugRegistry>,
  pub auth:     Arc<AuthConfig>,
  pub tokens:   Arc<TokenIssuer>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      registry: self.registry.clone(),
      auth:     self.auth.clone(),
      tokens:   self.tokens.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application: `/api/login`, the authenticated `/api/*`
/// routes, and static files from `static_dir` for everything else.
pub fn router<S>(state: AppState<S>, static_dir: impl Into<PathBuf>) -> Router
where
  S: InventoryStore + 'static,
{
  let protected = api_router(state.store.clone(), state.registry.clone())
    .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer::<S>));

  let api = Router::new()
    .route("/login", post(login::<S>))
    .with_state(state)
    .merge(protected);

  Router::new()
    .nest("/api", api)
    .fallback_service(ServeDir::new(static_dir.into()))
    .layer(TraceLayer::new_for_http())
    .layer(cors())
}

fn cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
    .max_age(Duration::from_secs(12 * 60 * 60))
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /api/login` → `{"token": "<jwt>"}`
async fn login<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<Value>, Error> {
  if let Err(e) = state.auth.verify(&body.username, &body.password) {
    tracing::warn!(username = %body.username, "login refused");
    return Err(e);
  }
  let token = state.tokens.issue(&body.username)?;
  tracing::info!(username = %body.username, "login");
  Ok(Json(json!({ "token": token })))
}

/// Reject requests without a valid bearer token; attach the token subject as
/// the request's [`Actor`].
async fn require_bearer<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let claims = state.tokens.verify(auth::bearer_token(req.headers())?)?;
  req.extensions_mut().insert(Actor(claims.sub));
  Ok(next.run(req).await)
}
