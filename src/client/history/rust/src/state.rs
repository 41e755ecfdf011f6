/* src/client/history/rust/src/state.rs */

use std::sync::Arc;

use serde_json::Value;
use storefront_router::patch;
use tokio::sync::watch;

/// Observable application state. Every applied patch notifies subscribers.
#[derive(Debug, Clone)]
pub struct StateTree {
  tx: Arc<watch::Sender<Value>>,
}

impl StateTree {
  pub fn new(initial: Value) -> Self {
    let (tx, _) = watch::channel(initial);
    Self { tx: Arc::new(tx) }
  }

  pub fn snapshot(&self) -> Value {
    self.tx.borrow().clone()
  }

  pub fn apply(&self, patch: Value) {
    self.tx.send_modify(|state| patch::merge(state, patch));
  }

  pub fn replace(&self, state: Value) {
    self.tx.send_replace(state);
  }

  pub fn subscribe(&self) -> watch::Receiver<Value> {
    self.tx.subscribe()
  }
}

impl Default for StateTree {
  fn default() -> Self {
    Self::new(Value::Object(serde_json::Map::new()))
  }
}
