/* src/server/adapter/axum/src/edge_cache.rs */

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// A rendered response as stored by the edge cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: String,
}

/// Entry cap used by `EdgeCache::new`.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug)]
struct Slot {
  response: CachedResponse,
  expires_at: Instant,
  seq: u64,
}

#[derive(Debug, Default)]
struct Slots {
  map: HashMap<String, Slot>,
  next_seq: u64,
}

/// In-process stand-in for a CDN: keeps rendered responses under their
/// surrogate key for the TTL the route's cache policy asked for.
///
/// Expired entries are swept on every `put`; past `max_entries` the oldest
/// write is evicted.
#[derive(Debug)]
pub struct EdgeCache {
  slots: Mutex<Slots>,
  max_entries: usize,
}

impl Default for EdgeCache {
  fn default() -> Self {
    Self::with_max_entries(DEFAULT_MAX_ENTRIES)
  }
}

impl EdgeCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_max_entries(max_entries: usize) -> Self {
    Self { slots: Mutex::new(Slots::default()), max_entries: max_entries.max(1) }
  }

  fn lock(&self) -> MutexGuard<'_, Slots> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn get(&self, key: &str) -> Option<CachedResponse> {
    let mut slots = self.lock();
    let slot = slots.map.get(key)?;
    if Instant::now() >= slot.expires_at {
      debug!(%key, "edge cache entry expired");
      slots.map.remove(key);
      return None;
    }
    Some(slot.response.clone())
  }

  pub fn put(&self, key: impl Into<String>, ttl: Duration, response: CachedResponse) {
    let now = Instant::now();
    let mut slots = self.lock();
    let before = slots.map.len();
    slots.map.retain(|_, slot| slot.expires_at > now);
    let swept = before - slots.map.len();
    if swept > 0 {
      debug!(swept, "swept expired edge cache entries");
    }

    let key = key.into();
    while !slots.map.contains_key(&key) && slots.map.len() >= self.max_entries {
      let Some(oldest) = slots.map.iter().min_by_key(|(_, slot)| slot.seq).map(|(k, _)| k.clone())
      else {
        break;
      };
      debug!(key = %oldest, "evicting oldest edge cache entry");
      slots.map.remove(&oldest);
    }

    let seq = slots.next_seq;
    slots.next_seq += 1;
    slots.map.insert(key, Slot { response, expires_at: now + ttl, seq });
  }

  pub fn purge(&self) -> usize {
    let mut slots = self.lock();
    let count = slots.map.len();
    slots.map.clear();
    info!(count, "edge cache purged");
    count
  }

  pub fn len(&self) -> usize {
    self.lock().map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
