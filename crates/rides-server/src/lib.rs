//! Ride lifecycle server.
//!
//! Wires the SQLite store into a [`RideService`], serves the JSON API, and
//! runs the background tasks in [`tasks`].

pub mod tasks;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use rides_core::RideService;
use rides_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// The service as this server runs it: one store plays every collaborator.
pub type Service = RideService<SqliteStore, SqliteStore, SqliteStore>;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rides/rides.db") }

fn default_sweep_interval_secs() -> u64 { 60 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `RIDES_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Seconds between sweeps of scheduled rides. `0` disables the sweep.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

impl ServerConfig {
  /// Read `path` (if it exists) layered under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("RIDES").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app(service: Arc<Service>) -> Router {
  Router::new()
    .nest("/api", rides_api::api_router(service))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/rides.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.sweep_interval_secs, 60);
    assert_eq!(cfg.address(), format!("{}:8080", cfg.host));
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/rides.db")),
      PathBuf::from(home).join("rides.db")
    );
    assert_eq!(expand_tilde(Path::new("/var/rides.db")), PathBuf::from("/var/rides.db"));
  }
}
