/* src/client/worker/rust/src/worker.rs */

use std::sync::Arc;

use storefront_router::{APP_SHELL_PATH, BoxFuture, ClientCache, Format, Request, RouterError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::WorkerMessage;
use crate::prefetch::{PrefetchQueue, PrefetchTarget};
use crate::storage::{CacheStorage, RUNTIME_CACHE};

/// Network access for the worker. Resolves to the response body.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, path: &str) -> BoxFuture<Result<String, RouterError>>;
}

struct WorkerInner {
  storage: Arc<CacheStorage>,
  fetcher: Arc<dyn Fetcher>,
  prefetches: PrefetchQueue,
}

/// The service-worker side of the messaging protocol.
#[derive(Clone)]
pub struct ServiceWorker {
  inner: Arc<WorkerInner>,
}

impl ServiceWorker {
  pub fn new(storage: Arc<CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
    Self { inner: Arc::new(WorkerInner { storage, fetcher, prefetches: PrefetchQueue::new() }) }
  }

  pub fn storage(&self) -> &Arc<CacheStorage> {
    &self.inner.storage
  }

  pub fn prefetches(&self) -> &PrefetchQueue {
    &self.inner.prefetches
  }

  /// Apply one message. Never waits on the network; fetches run in the background.
  pub fn handle(&self, message: WorkerMessage) {
    debug!(action = message.action(), "worker message");
    match message {
      WorkerMessage::CachePath { path, api_version } => self.prefetch(PrefetchTarget { path, api_version }),
      WorkerMessage::CacheState { path, cache_data, api_version } => {
        self.inner.storage.put(RUNTIME_CACHE, &api_version, &path, cache_data.to_string());
      }
      WorkerMessage::AbortPrefetches => {
        let aborted = self.inner.prefetches.abort_all();
        debug!(aborted, "aborted prefetches");
      }
      WorkerMessage::ResumePrefetches => {
        for target in self.inner.prefetches.take_aborted() {
          self.prefetch(target);
        }
      }
      WorkerMessage::ConfigureRuntimeCaching { options } => self.inner.storage.configure(options),
      WorkerMessage::RemoveOldCaches { api_version } => {
        self.inner.storage.remove_old_caches(&api_version);
      }
    }
  }

  /// Parse and apply a message as posted by the page.
  pub fn handle_json(&self, raw: &str) -> Result<(), RouterError> {
    let message: WorkerMessage = serde_json::from_str(raw)?;
    self.handle(message);
    Ok(())
  }

  /// Fetch `target` in the background into the runtime cache. Must be
  /// called inside a tokio runtime.
  pub fn prefetch(&self, target: PrefetchTarget) {
    let worker = self.clone();
    let task_target = target.clone();
    self.inner.prefetches.start(target, move |id| {
      tokio::spawn(async move {
        let PrefetchTarget { path, api_version } = task_target;
        match worker.inner.fetcher.fetch(&path).await {
          Ok(body) => {
            debug!(%path, %api_version, "prefetched");
            worker.inner.storage.put(RUNTIME_CACHE, &api_version, &path, body);
          }
          Err(err) => warn!(%path, error = %err, "prefetch failed"),
        }
        worker.inner.prefetches.finish(id);
      })
      .abort_handle()
    });
  }

  /// Serve a request. `ForceCache` responses come from the runtime cache when
  /// present and are stored after a network fetch; everything else goes to
  /// the network and is never stored. Offline navigations fall back to the
  /// cached app shell; `.json` data requests never do.
  pub async fn respond(
    &self,
    path: &str,
    api_version: &str,
    mode: ClientCache,
  ) -> Result<String, RouterError> {
    let storage = &self.inner.storage;
    let force_cache = mode == ClientCache::ForceCache;
    if force_cache {
      if let Some(body) = storage.get(RUNTIME_CACHE, api_version, path) {
        debug!(%path, "served from runtime cache");
        return Ok(body);
      }
    }
    match self.inner.fetcher.fetch(path).await {
      Ok(body) => {
        if force_cache {
          storage.put(RUNTIME_CACHE, api_version, path, body.clone());
        }
        Ok(body)
      }
      Err(err) if Request::get(path).format == Format::Json => Err(err),
      Err(err) => {
        debug!(%path, error = %err, "network failed, trying app shell");
        storage.get(RUNTIME_CACHE, api_version, APP_SHELL_PATH).ok_or(err)
      }
    }
  }

  /// Process messages until every sender is gone.
  pub async fn run(self, mut rx: mpsc::UnboundedReceiver<WorkerMessage>) {
    info!("service worker listening");
    while let Some(message) = rx.recv().await {
      self.handle(message);
    }
    debug!("service worker channel closed");
  }
}
