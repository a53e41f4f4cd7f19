//! MediControl server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `MEDICONTROL_*` environment overrides, opens the SQLite database, runs
//! the startup seed, and serves the API and frontend over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```
//! cargo run -p medicontrol-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use medicontrol_core::registry::StaticRegistry;
use medicontrol_server::{
  AppState,
  ServerConfig,
  auth::{self, AuthConfig, TokenIssuer},
};
use medicontrol_store_sqlite::{QueryRegistry, SqliteStore, seed};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "MediControl pharmacy back-office server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", auth::hash_password(&password)?);
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MEDICONTROL").try_parsing(true))
    .build()
    .context("failed to read configuration")?;
  let cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let database_path = expand_tilde(&cfg.database_path);
  if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let queries = QueryRegistry::load(&cfg.sql_dir)
    .with_context(|| format!("failed to load queries from {:?}", cfg.sql_dir))?;
  let store = SqliteStore::open(&database_path, Arc::new(queries))
    .await
    .with_context(|| format!("failed to open database at {database_path:?}"))?;

  seed::bootstrap(&store, &expand_tilde(&cfg.seed_path)).await;

  if cfg.auth_password_hash.is_none() {
    tracing::warn!("auth_password_hash is not set; every login will be refused");
  }
  let tokens = match cfg.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
    Some(secret) => TokenIssuer::new(secret, cfg.token_ttl_hours),
    None => {
      tracing::warn!("jwt_secret is not set; sessions will not survive a restart");
      TokenIssuer::random(cfg.token_ttl_hours)
    }
  };

  let state = AppState {
    store:    Arc::new(store),
    registry: Arc::new(StaticRegistry::default()),
    auth:     Arc::new(AuthConfig {
      username:      cfg.auth_username.clone(),
      password_hash: cfg.auth_password_hash.clone(),
    }),
    tokens:   Arc::new(tokens),
  };

  let app = medicontrol_server::router(state, cfg.static_dir.clone());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
