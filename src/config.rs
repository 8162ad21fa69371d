//! Loading app configuration (editor timing, storage, optional extra challenges) from TOML.
//!
//! See `AppConfig` for the expected schema:
//!
//! ```toml
//! [editor]
//! debounce_ms = 500
//!
//! [storage]
//! progress_dir = "./progress"
//!
//! [sessions]
//! idle_ttl_secs = 1800
//!
//! [[challenges]]
//! id = "custom-1"
//! level = 1
//! # ...remaining challenge fields
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Challenge, LevelMeta};

/// Quiet period before a live edit is re-validated.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub editor: EditorCfg,
  #[serde(default)]
  pub storage: StorageCfg,
  #[serde(default)]
  pub sessions: SessionCfg,
  /// Extra challenges appended after the built-in catalog.
  #[serde(default)]
  pub challenges: Vec<Challenge>,
  /// Extra level metadata (only used for levels the built-in catalog lacks).
  #[serde(default)]
  pub levels: Vec<LevelMeta>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EditorCfg {
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

impl Default for EditorCfg {
  fn default() -> Self {
    Self { debounce_ms: DEFAULT_DEBOUNCE_MS }
  }
}

fn default_debounce_ms() -> u64 { DEFAULT_DEBOUNCE_MS }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StorageCfg {
  /// Directory for per-user progress files. `None` keeps progress in memory.
  #[serde(default)]
  pub progress_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionCfg {
  #[serde(default = "default_idle_ttl_secs")]
  pub idle_ttl_secs: u64,
}

impl Default for SessionCfg {
  fn default() -> Self {
    Self { idle_ttl_secs: DEFAULT_SESSION_IDLE_TTL_SECS }
  }
}

fn default_idle_ttl_secs() -> u64 { DEFAULT_SESSION_IDLE_TTL_SECS }

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Load `AppConfig` from APP_CONFIG_PATH, then apply PROGRESS_DIR on top.
/// Read or parse failures are logged and the defaults are used instead.
pub fn load_app_config_from_env() -> AppConfig {
  let path = std::env::var("APP_CONFIG_PATH").ok();
  let progress_dir = std::env::var("PROGRESS_DIR").ok();
  resolve_app_config(path.as_deref(), progress_dir.as_deref())
}

pub fn resolve_app_config(path: Option<&str>, progress_dir: Option<&str>) -> AppConfig {
  let mut cfg = path.map(read_config_file).unwrap_or_default();
  if let Some(dir) = progress_dir.filter(|d| !d.trim().is_empty()) {
    cfg.storage.progress_dir = Some(PathBuf::from(dir));
  }
  cfg
}

fn read_config_file(path: &str) -> AppConfig {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "prabodha", %path, "Loaded app config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "prabodha", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "prabodha", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}
