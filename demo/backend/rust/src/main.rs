/* demo/backend/rust/src/main.rs */

mod catalog;
mod routes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use storefront_router::StorefrontConfig;
use storefront_router_axum::{EdgeCache, IntoAxumRouter, ServeOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let path = std::env::args().nth(1).map_or_else(|| PathBuf::from("storefront.toml"), PathBuf::from);
  let mut config = if path.exists() {
    StorefrontConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
  } else {
    tracing::warn!(path = %path.display(), "config file not found, using defaults");
    StorefrontConfig::default()
  };
  config.apply_env_overrides()?;

  let base = path.parent().unwrap_or(Path::new("."));
  let router = routes::build(&config)?;
  let options = ServeOptions::from_config(&config, base)?.with_edge_cache(Arc::new(EdgeCache::new()));

  router.serve(&format!("0.0.0.0:{}", config.server.port), options).await?;
  Ok(())
}
