/* src/client/worker/rust/src/storage.rs */

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::message::RuntimeCachingOptions;

/// Cache holding page data fetched at runtime (prefetches and `cache-state`).
pub const RUNTIME_CACHE: &str = "runtime";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
  cache_name: String,
  api_version: String,
  path: String,
}

#[derive(Debug)]
struct Entry {
  body: String,
  stored_at: Instant,
  seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
  entries: HashMap<CacheKey, Entry>,
  options: RuntimeCachingOptions,
  seq: u64,
}

impl Inner {
  fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
    self
      .options
      .max_age_seconds
      .is_some_and(|max| now.duration_since(entry.stored_at) >= Duration::from_secs(max))
  }

  fn evict(&mut self, cache_name: &str) {
    let Some(max) = self.options.max_entries else { return };
    loop {
      let in_cache: Vec<(&CacheKey, u64)> = self
        .entries
        .iter()
        .filter(|(key, _)| key.cache_name == cache_name)
        .map(|(key, entry)| (key, entry.seq))
        .collect();
      if in_cache.len() <= max {
        return;
      }
      let Some(oldest) = in_cache.into_iter().min_by_key(|(_, seq)| *seq).map(|(key, _)| key.clone())
      else {
        return;
      };
      debug!(path = %oldest.path, "evicting oldest runtime cache entry");
      self.entries.remove(&oldest);
    }
  }
}

/// Versioned response store. Every read and write names an api version, and
/// a read under a different version than the write is a miss.
#[derive(Debug, Default)]
pub struct CacheStorage {
  inner: Mutex<Inner>,
}

impl CacheStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn put(&self, cache_name: &str, api_version: &str, path: &str, body: impl Into<String>) {
    let mut inner = self.lock();
    inner.seq += 1;
    let entry = Entry { body: body.into(), stored_at: Instant::now(), seq: inner.seq };
    let key = CacheKey {
      cache_name: cache_name.to_string(),
      api_version: api_version.to_string(),
      path: path.to_string(),
    };
    inner.entries.insert(key, entry);
    inner.evict(cache_name);
  }

  pub fn get(&self, cache_name: &str, api_version: &str, path: &str) -> Option<String> {
    let mut inner = self.lock();
    let key = CacheKey {
      cache_name: cache_name.to_string(),
      api_version: api_version.to_string(),
      path: path.to_string(),
    };
    let entry = inner.entries.get(&key)?;
    if inner.is_expired(entry, Instant::now()) {
      debug!(%path, "runtime cache entry expired");
      inner.entries.remove(&key);
      return None;
    }
    Some(entry.body.clone())
  }

  pub fn configure(&self, options: RuntimeCachingOptions) {
    info!(max_entries = ?options.max_entries, max_age_seconds = ?options.max_age_seconds, "runtime caching configured");
    let mut inner = self.lock();
    inner.options = options;
    inner.evict(RUNTIME_CACHE);
  }

  pub fn options(&self) -> RuntimeCachingOptions {
    self.lock().options.clone()
  }

  /// Drop every entry not written under `api_version`. Returns how many went.
  pub fn remove_old_caches(&self, api_version: &str) -> usize {
    let mut inner = self.lock();
    let before = inner.entries.len();
    inner.entries.retain(|key, _| key.api_version == api_version);
    let removed = before - inner.entries.len();
    info!(api_version, removed, "purged caches of old versions");
    removed
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
