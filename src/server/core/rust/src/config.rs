/* src/server/core/rust/src/config.rs */

use std::path::Path;

use serde::Deserialize;

use crate::errors::RouterError;
use crate::params::ParamPrecedence;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorefrontConfig {
  #[serde(default)]
  pub app: AppSection,
  #[serde(default)]
  pub router: RouterSection,
  #[serde(default)]
  pub server: ServerSection,
  #[serde(default)]
  pub history: HistorySection,
  #[serde(default)]
  pub runtime_caching: RuntimeCachingSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Cache namespace token; bump it on every deploy.
  #[serde(default = "default_api_version")]
  pub api_version: String,
}

impl Default for AppSection {
  fn default() -> Self {
    Self { api_version: default_api_version() }
  }
}

fn default_api_version() -> String {
  "dev".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterSection {
  #[serde(default)]
  pub param_precedence: ParamPrecedence,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default = "default_data_id")]
  pub data_id: String,
  pub shell: Option<String>,
}

impl Default for ServerSection {
  fn default() -> Self {
    Self { port: default_port(), data_id: default_data_id(), shell: None }
  }
}

fn default_port() -> u16 {
  3000
}

fn default_data_id() -> String {
  "__data".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  /// Browsers cap `history.state` at 640k.
  #[serde(default = "default_max_state_bytes")]
  pub max_state_bytes: usize,
}

impl Default for HistorySection {
  fn default() -> Self {
    Self { debounce_ms: default_debounce_ms(), max_state_bytes: default_max_state_bytes() }
  }
}

fn default_debounce_ms() -> u64 {
  150
}

fn default_max_state_bytes() -> usize {
  640 * 1024
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeCachingSection {
  pub max_entries: Option<usize>,
  pub max_age_seconds: Option<u64>,
}

impl StorefrontConfig {
  pub fn from_toml_str(content: &str) -> Result<Self, RouterError> {
    let config: Self =
      toml::from_str(content).map_err(|e| RouterError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self, RouterError> {
    let content = std::fs::read_to_string(path)
      .map_err(|e| RouterError::Config(format!("failed to read {}: {e}", path.display())))?;
    Self::from_toml_str(&content)
  }

  pub fn validate(&self) -> Result<(), RouterError> {
    if self.app.api_version.trim().is_empty() {
      return Err(RouterError::Config("app.api_version must not be empty".into()));
    }
    if self.history.max_state_bytes == 0 {
      return Err(RouterError::Config("history.max_state_bytes must be positive".into()));
    }
    Ok(())
  }

  /// Apply `STOREFRONT_API_VERSION` and `PORT` from the process environment.
  pub fn apply_env_overrides(&mut self) -> Result<(), RouterError> {
    self.apply_env(|name| std::env::var(name).ok())
  }

  pub fn apply_env(
    &mut self,
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<(), RouterError> {
    if let Some(version) = lookup("STOREFRONT_API_VERSION") {
      self.app.api_version = version;
    }
    if let Some(port) = lookup("PORT") {
      self.server.port =
        port.parse().map_err(|_| RouterError::Config(format!("PORT is not a valid port: {port}")))?;
    }
    self.validate()
  }
}
