//! Meadow server wiring: configuration and the application router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use meadow_core::store::ContactStore;
use meadow_state::{ContactPublisher, PublisherConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MEADOW_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// How long an unwatched live view keeps running, in milliseconds.
  pub linger_ms:  u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       5233,
      store_path: PathBuf::from("~/.local/share/meadow/contacts.db"),
      linger_ms:  5_000,
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional) under `MEADOW_*` environment variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("MEADOW"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn publisher_config(&self) -> PublisherConfig {
    PublisherConfig { linger: Duration::from_millis(self.linger_ms) }
  }

  /// `store_path` with a leading `~/` expanded to the home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted at the root, with request tracing.
pub fn app<S>(publisher: Arc<ContactPublisher<S>>) -> Router
where
  S: ContactStore + 'static,
{
  meadow_api::api_router(publisher).layer(TraceLayer::new_for_http())
}
