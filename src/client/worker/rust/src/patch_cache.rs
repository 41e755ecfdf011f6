/* src/client/worker/rust/src/patch_cache.rs */

use std::sync::Arc;

use serde_json::Value;
use storefront_router::{BoxFuture, Handler, PatchCache, Request};
use tracing::debug;

use crate::storage::{CacheStorage, RUNTIME_CACHE};

/// Serves cached `fromServer` results to the dispatcher from the worker's
/// runtime cache, reading the `.json` variant of the request at one api version.
#[derive(Debug, Clone)]
pub struct StoragePatchCache {
  storage: Arc<CacheStorage>,
  api_version: String,
}

impl StoragePatchCache {
  pub fn new(storage: Arc<CacheStorage>, api_version: impl Into<String>) -> Self {
    Self { storage, api_version: api_version.into() }
  }
}

impl PatchCache for StoragePatchCache {
  fn cached_patch(&self, _handler: &Handler, request: &Request) -> BoxFuture<Option<Value>> {
    let path = request.json_url();
    let hit = self.storage.get(RUNTIME_CACHE, &self.api_version, &path);
    Box::pin(async move {
      let body = hit?;
      match serde_json::from_str(&body) {
        Ok(patch) => Some(patch),
        Err(err) => {
          debug!(%path, error = %err, "cached body is not JSON, treating as miss");
          None
        }
      }
    })
  }
}
