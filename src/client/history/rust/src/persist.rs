/* src/client/history/rust/src/persist.rs */

use std::time::Duration;

use serde_json::Value;
use storefront_router::RouterError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::history::SharedHistory;
use crate::state::StateTree;

/// Write the current state snapshot, tagged with `as: <url>`, into the
/// current history entry. On failure the entry's state is cleared so the
/// next back-navigation refetches instead of restoring something partial.
pub fn persist_now(history: &SharedHistory, state: &StateTree) -> Result<(), RouterError> {
  let mut history = history.lock();
  let snapshot = match state.snapshot() {
    Value::Object(mut map) => {
      map.insert("as".to_string(), Value::String(history.location().href()));
      Some(Value::Object(map))
    }
    _ => None,
  };
  match history.replace_state(snapshot) {
    Ok(()) => {
      debug!(location = %history.location(), "persisted history state");
      Ok(())
    }
    Err(err) => {
      warn!(location = %history.location(), error = %err, "history write failed, clearing state");
      let _ = history.replace_state(None);
      Err(err)
    }
  }
}

/// Debounced background writer of the state tree into history.
#[derive(Debug)]
pub struct HistoryPersister {
  history: SharedHistory,
  state: StateTree,
  task: JoinHandle<()>,
}

impl HistoryPersister {
  /// Must be called inside a tokio runtime.
  pub fn spawn(history: SharedHistory, state: StateTree, debounce: Duration) -> Self {
    let rx = state.subscribe();
    let task = tokio::spawn(run(history.clone(), state.clone(), rx, debounce));
    Self { history, state, task }
  }

  /// Persist immediately, ahead of any pending debounced write.
  pub fn flush(&self) -> Result<(), RouterError> {
    persist_now(&self.history, &self.state)
  }
}

impl Drop for HistoryPersister {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn run(history: SharedHistory, state: StateTree, mut rx: watch::Receiver<Value>, debounce: Duration) {
  while rx.changed().await.is_ok() {
    // Wait for a quiet period before writing.
    loop {
      match tokio::time::timeout(debounce, rx.changed()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => return,
        Err(_) => break,
      }
    }
    let _ = persist_now(&history, &state);
  }
}
