/* src/server/adapter/axum/src/lib.rs */

mod error;
mod handler;

pub mod edge_cache;
pub mod render;

use std::path::Path;
use std::sync::Arc;

use storefront_router::{Router, RouterError, StorefrontConfig};
use tracing::info;

pub use edge_cache::{CachedResponse, EdgeCache};
pub use error::AxumError;

/// Re-export the router core for convenience
pub use storefront_router;

const DEFAULT_SHELL: &str =
  "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body><div id=\"root\"></div></body></html>";

/// How HTML responses are assembled and whether rendered pages are cached.
#[derive(Debug, Clone)]
pub struct ServeOptions {
  /// HTML template the state script is injected into.
  pub shell: String,
  /// `id` of the state script element.
  pub data_id: String,
  pub edge_cache: Option<Arc<EdgeCache>>,
}

impl Default for ServeOptions {
  fn default() -> Self {
    Self { shell: DEFAULT_SHELL.to_string(), data_id: "__data".to_string(), edge_cache: None }
  }
}

impl ServeOptions {
  /// Build from the `[server]` section, reading the shell template relative to `base`.
  pub fn from_config(config: &StorefrontConfig, base: &Path) -> Result<Self, RouterError> {
    let shell = match &config.server.shell {
      Some(file) => {
        let path = base.join(file);
        std::fs::read_to_string(&path)
          .map_err(|e| RouterError::Config(format!("failed to read shell {}: {e}", path.display())))?
      }
      None => DEFAULT_SHELL.to_string(),
    };
    Ok(Self { shell, data_id: config.server.data_id.clone(), edge_cache: None })
  }

  pub fn with_edge_cache(mut self, cache: Arc<EdgeCache>) -> Self {
    self.edge_cache = Some(cache);
    self
  }
}

/// Extension trait that serves a storefront `Router` with axum.
pub trait IntoAxumRouter {
  fn into_axum_router(self, options: ServeOptions) -> axum::Router;
  fn serve(
    self,
    addr: &str,
    options: ServeOptions,
  ) -> impl std::future::Future<Output = std::io::Result<()>> + Send;
}

impl IntoAxumRouter for Router {
  fn into_axum_router(self, options: ServeOptions) -> axum::Router {
    handler::build_router(self, options)
  }

  async fn serve(self, addr: &str, options: ServeOptions) -> std::io::Result<()> {
    let api_version = self.api_version().to_string();
    let routes = self.routes().len();
    let app = self.into_axum_router(options);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, %api_version, routes, "storefront listening");
    axum::serve(listener, app).await
  }
}
