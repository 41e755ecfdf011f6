/* src/client/worker/rust/src/prefetch.rs */

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchTarget {
  pub path: String,
  pub api_version: String,
}

#[derive(Debug)]
struct InFlight {
  target: PrefetchTarget,
  handle: AbortHandle,
}

#[derive(Debug, Default)]
struct Inner {
  next_id: u64,
  in_flight: BTreeMap<u64, InFlight>,
  aborted: Vec<PrefetchTarget>,
}

/// Bookkeeping for background prefetches: what is running, and what was
/// aborted and waits to be resumed.
#[derive(Debug, Default)]
pub struct PrefetchQueue {
  inner: Mutex<Inner>,
}

impl PrefetchQueue {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register a prefetch. `spawn` receives the id the task must pass to
  /// `finish`; the queue stays locked until it is tracked, so a task that
  /// completes immediately cannot finish before it was recorded.
  pub fn start<F>(&self, target: PrefetchTarget, spawn: F) -> u64
  where
    F: FnOnce(u64) -> AbortHandle,
  {
    let mut inner = self.lock();
    inner.next_id += 1;
    let id = inner.next_id;
    let handle = spawn(id);
    inner.in_flight.insert(id, InFlight { target, handle });
    id
  }

  pub fn finish(&self, id: u64) {
    self.lock().in_flight.remove(&id);
  }

  /// Abort every running prefetch and queue it for resumption, in start order.
  pub fn abort_all(&self) -> usize {
    let mut inner = self.lock();
    let running = std::mem::take(&mut inner.in_flight);
    let count = running.len();
    for (_, prefetch) in running {
      prefetch.handle.abort();
      inner.aborted.push(prefetch.target);
    }
    count
  }

  pub fn take_aborted(&self) -> Vec<PrefetchTarget> {
    std::mem::take(&mut self.lock().aborted)
  }

  pub fn in_flight(&self) -> usize {
    self.lock().in_flight.len()
  }

  pub fn aborted(&self) -> usize {
    self.lock().aborted.len()
  }
}
