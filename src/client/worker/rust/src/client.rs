/* src/client/worker/rust/src/client.rs */

use std::future::Future;

use serde_json::Value;
use storefront_router::{Request, StorefrontConfig};
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::{RuntimeCachingOptions, WorkerMessage};
use crate::worker::ServiceWorker;

/// Page-side handle for posting messages to the service worker.
/// Every call is fire-and-forget; without a worker they are dropped.
#[derive(Debug, Clone)]
pub struct ServiceWorkerClient {
  tx: mpsc::UnboundedSender<WorkerMessage>,
  api_version: String,
}

impl ServiceWorkerClient {
  pub fn new(tx: mpsc::UnboundedSender<WorkerMessage>, api_version: impl Into<String>) -> Self {
    Self { tx, api_version: api_version.into() }
  }

  /// Spawn `worker`'s message loop and return a client posting to it.
  pub fn connect(worker: ServiceWorker, api_version: impl Into<String>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(worker.run(rx));
    Self::new(tx, api_version)
  }

  pub fn api_version(&self) -> &str {
    &self.api_version
  }

  fn post(&self, message: WorkerMessage) {
    let action = message.action();
    if self.tx.send(message).is_err() {
      debug!(action, "no service worker, message dropped");
    }
  }

  pub fn cache_path(&self, path: impl Into<String>) {
    self.post(WorkerMessage::CachePath { path: path.into(), api_version: self.api_version.clone() });
  }

  /// Prefetch the page data behind a URL the user is likely to visit.
  pub fn prefetch_json_for(&self, url: &str) {
    self.cache_path(Request::get(url).json_url());
  }

  pub fn cache_state(&self, path: impl Into<String>, data: Value) {
    self.post(WorkerMessage::CacheState {
      path: path.into(),
      cache_data: data,
      api_version: self.api_version.clone(),
    });
  }

  pub fn abort_prefetches(&self) {
    self.post(WorkerMessage::AbortPrefetches);
  }

  pub fn resume_prefetches(&self) {
    self.post(WorkerMessage::ResumePrefetches);
  }

  pub fn configure_runtime_caching(&self, options: RuntimeCachingOptions) {
    self.post(WorkerMessage::ConfigureRuntimeCaching { options });
  }

  /// Send the `[runtime_caching]` section, if any limit is set.
  pub fn configure_from(&self, config: &StorefrontConfig) {
    let section = &config.runtime_caching;
    if section.max_entries.is_none() && section.max_age_seconds.is_none() {
      return;
    }
    self.configure_runtime_caching(RuntimeCachingOptions {
      max_entries: section.max_entries,
      max_age_seconds: section.max_age_seconds,
    });
  }

  /// Purge every cache entry not written under this client's api version.
  pub fn remove_old_caches(&self) {
    self.post(WorkerMessage::RemoveOldCaches { api_version: self.api_version.clone() });
  }

  /// Run a user-initiated fetch ahead of background prefetches: prefetches
  /// are aborted first and resumed once `fut` completes, whatever its outcome.
  pub async fn priority<F: Future>(&self, fut: F) -> F::Output {
    self.abort_prefetches();
    let output = fut.await;
    self.resume_prefetches();
    output
  }
}
