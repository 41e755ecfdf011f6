/* src/client/history/rust/src/history.rs */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use storefront_router::RouterError;

use crate::location::Location;

/// Default per-entry state budget; browsers reject larger `history.state` values.
pub const DEFAULT_MAX_STATE_BYTES: usize = 640 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Push,
  Replace,
  /// Back/forward traversal.
  Pop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
  pub location: Location,
  pub state: Option<Value>,
}

/// In-memory model of the browser session history.
#[derive(Debug, Clone)]
pub struct History {
  entries: Vec<HistoryEntry>,
  index: usize,
  max_state_bytes: usize,
}

impl History {
  pub fn new(initial: Location) -> Self {
    Self {
      entries: vec![HistoryEntry { location: initial, state: None }],
      index: 0,
      max_state_bytes: DEFAULT_MAX_STATE_BYTES,
    }
  }

  pub fn with_max_state_bytes(mut self, max: usize) -> Self {
    self.max_state_bytes = max;
    self
  }

  pub fn current(&self) -> &HistoryEntry {
    &self.entries[self.index]
  }

  pub fn location(&self) -> &Location {
    &self.current().location
  }

  pub fn state(&self) -> Option<&Value> {
    self.current().state.as_ref()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn index(&self) -> usize {
    self.index
  }

  fn check(&self, state: Option<&Value>) -> Result<(), RouterError> {
    let Some(state) = state else { return Ok(()) };
    let size = serde_json::to_vec(state).map_err(|e| RouterError::HistoryWrite(e.to_string()))?.len();
    if size > self.max_state_bytes {
      return Err(RouterError::HistoryWrite(format!(
        "state of {size} bytes exceeds the {} byte limit",
        self.max_state_bytes
      )));
    }
    Ok(())
  }

  /// Append an entry, discarding any forward entries. Nothing changes on error.
  pub fn push(&mut self, location: Location, state: Option<Value>) -> Result<(), RouterError> {
    self.check(state.as_ref())?;
    self.entries.truncate(self.index + 1);
    self.entries.push(HistoryEntry { location, state });
    self.index += 1;
    Ok(())
  }

  pub fn replace(&mut self, location: Location, state: Option<Value>) -> Result<(), RouterError> {
    self.check(state.as_ref())?;
    self.entries[self.index] = HistoryEntry { location, state };
    Ok(())
  }

  pub fn replace_state(&mut self, state: Option<Value>) -> Result<(), RouterError> {
    self.check(state.as_ref())?;
    self.entries[self.index].state = state;
    Ok(())
  }

  /// Move by `delta`; out-of-range moves are ignored like in browsers.
  pub fn go(&mut self, delta: isize) -> Option<&HistoryEntry> {
    if delta == 0 {
      return None;
    }
    let target = self.index.checked_add_signed(delta).filter(|i| *i < self.entries.len())?;
    self.index = target;
    Some(&self.entries[target])
  }

  pub fn back(&mut self) -> Option<&HistoryEntry> {
    self.go(-1)
  }

  pub fn forward(&mut self) -> Option<&HistoryEntry> {
    self.go(1)
  }
}

/// History shared between the bridge and the persister.
#[derive(Debug, Clone)]
pub struct SharedHistory(Arc<Mutex<History>>);

impl SharedHistory {
  pub fn new(history: History) -> Self {
    Self(Arc::new(Mutex::new(history)))
  }

  pub fn lock(&self) -> MutexGuard<'_, History> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn loc(url: &str) -> Location {
    Location::parse(url).unwrap()
  }

  #[test]
  fn push_truncates_forward_entries() {
    let mut history = History::new(loc("/"));
    history.push(loc("/a"), None).unwrap();
    history.push(loc("/b"), None).unwrap();
    assert_eq!(history.back().unwrap().location, loc("/a"));
    history.push(loc("/c"), None).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.forward().is_none());
    assert_eq!(history.location(), &loc("/c"));
  }

  #[test]
  fn go_out_of_range_is_ignored() {
    let mut history = History::new(loc("/"));
    history.push(loc("/a"), None).unwrap();
    assert!(history.go(-5).is_none());
    assert!(history.go(1).is_none());
    assert!(history.go(0).is_none());
    assert_eq!(history.index(), 1);
    assert_eq!(history.go(-1).unwrap().location, loc("/"));
  }

  #[test]
  fn oversized_state_is_rejected_without_change() {
    let mut history = History::new(loc("/")).with_max_state_bytes(16);
    history.replace_state(Some(json!({ "a": 1 }))).unwrap();
    let err = history.replace_state(Some(json!({ "big": "x".repeat(64) }))).unwrap_err();
    assert_eq!(err.code(), "HISTORY_WRITE_FAILED");
    assert_eq!(history.state(), Some(&json!({ "a": 1 })));

    assert!(history.push(loc("/b"), Some(json!({ "big": "x".repeat(64) }))).is_err());
    assert_eq!(history.len(), 1);
  }

  #[test]
  fn replace_keeps_position() {
    let mut history = History::new(loc("/"));
    history.push(loc("/a"), None).unwrap();
    history.replace(loc("/a2"), Some(json!({}))).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.location(), &loc("/a2"));
  }
}
