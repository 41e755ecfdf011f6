/* src/client/history/rust/src/bridge.rs */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use storefront_router::{
  DispatchOptions, Request, Response, Router, RouterError, RouterEvent, StorefrontConfig,
};
use tracing::debug;

use crate::history::{Action, SharedHistory};
use crate::location::Location;
use crate::persist::{HistoryPersister, persist_now};
use crate::state::StateTree;

const MAX_REDIRECTS: usize = 10;

/// Receives every patch applied to the state tree, with the navigation kind.
pub type NavigationCallback = Arc<dyn Fn(&Value, Action) + Send + Sync>;

/// How a history change was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
  /// Ran the route's handler chain.
  Dispatched,
  /// Restored the snapshot stored in the history entry.
  Restored,
  /// Fragment-only change.
  Ignored,
  /// A newer navigation started before this one settled.
  Superseded,
  /// The route is served by an upstream proxy; the page must be reloaded.
  FullReload(String),
}

pub struct BridgeBuilder {
  router: Router,
  history: SharedHistory,
  state: StateTree,
  callback: Option<NavigationCallback>,
  debounce: Option<Duration>,
  protocol: String,
  host: String,
}

impl BridgeBuilder {
  pub fn on_patch<F>(mut self, f: F) -> Self
  where
    F: Fn(&Value, Action) + Send + Sync + 'static,
  {
    self.callback = Some(Arc::new(f));
    self
  }

  pub fn origin(mut self, protocol: impl Into<String>, host: impl Into<String>) -> Self {
    self.protocol = protocol.into();
    self.host = host.into();
    self
  }

  /// Persist state-tree changes into history after `debounce` of quiet.
  pub fn persist(mut self, debounce: Duration) -> Self {
    self.debounce = Some(debounce);
    self
  }

  pub fn with_config(self, config: &StorefrontConfig) -> Self {
    self.persist(Duration::from_millis(config.history.debounce_ms))
  }

  /// Spawns the persister when one was requested, so call inside a runtime.
  pub fn build(self) -> NavigationBridge {
    let last = self.history.lock().location().clone();
    let persister =
      self.debounce.map(|d| HistoryPersister::spawn(self.history.clone(), self.state.clone(), d));
    NavigationBridge {
      inner: Arc::new(BridgeInner {
        router: self.router,
        history: self.history,
        state: self.state,
        callback: self.callback,
        persister,
        protocol: self.protocol,
        host: self.host,
        last: Mutex::new(last),
        navigation: AtomicU64::new(0),
      }),
    }
  }
}

struct BridgeInner {
  router: Router,
  history: SharedHistory,
  state: StateTree,
  callback: Option<NavigationCallback>,
  persister: Option<HistoryPersister>,
  protocol: String,
  host: String,
  last: Mutex<Location>,
  navigation: AtomicU64,
}

/// Keeps the URL, the state tree and history snapshots consistent, using the
/// router as the only source of new state.
#[derive(Clone)]
pub struct NavigationBridge {
  inner: Arc<BridgeInner>,
}

impl NavigationBridge {
  pub fn builder(router: Router, history: SharedHistory, state: StateTree) -> BridgeBuilder {
    BridgeBuilder {
      router,
      history,
      state,
      callback: None,
      debounce: None,
      protocol: "http:".to_string(),
      host: "localhost".to_string(),
    }
  }

  pub fn state(&self) -> &StateTree {
    &self.inner.state
  }

  pub fn history(&self) -> &SharedHistory {
    &self.inner.history
  }

  pub fn router(&self) -> &Router {
    &self.inner.router
  }

  pub fn location(&self) -> Location {
    self.last().clone()
  }

  fn last(&self) -> std::sync::MutexGuard<'_, Location> {
    self.inner.last.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_current(&self, id: u64) -> bool {
    self.inner.navigation.load(Ordering::SeqCst) == id
  }

  fn notify(&self, patch: &Value, action: Action) {
    if let Some(callback) = &self.inner.callback {
      callback(patch, action);
    }
  }

  /// Snapshot the current entry so leaving it keeps back-navigation instant.
  fn save_current(&self) {
    // Failures were logged and the entry cleared; navigation goes on.
    let _ = match &self.inner.persister {
      Some(persister) => persister.flush(),
      None => persist_now(&self.inner.history, &self.inner.state),
    };
  }

  fn request_for(&self, location: &Location) -> Request {
    Request::get(&location.url()).with_origin(&self.inner.protocol, &self.inner.host)
  }

  pub async fn navigate(&self, url: &str) -> Result<Navigation, RouterError> {
    let location = Location::parse(url)?;
    if self.inner.router.will_fetch_from_upstream(&self.request_for(&location)) {
      return Ok(Navigation::FullReload(location.href()));
    }
    self.save_current();
    self.inner.history.lock().push(location.clone(), None)?;
    self.on_history_change(location, Action::Push, None).await
  }

  pub async fn replace(&self, url: &str) -> Result<Navigation, RouterError> {
    let location = Location::parse(url)?;
    self.inner.history.lock().replace(location.clone(), None)?;
    self.on_history_change(location, Action::Replace, None).await
  }

  pub async fn go(&self, delta: isize) -> Result<Option<Navigation>, RouterError> {
    self.save_current();
    let entry = self.inner.history.lock().go(delta).cloned();
    match entry {
      Some(entry) => Ok(Some(self.on_history_change(entry.location, Action::Pop, entry.state).await?)),
      None => Ok(None),
    }
  }

  pub async fn back(&self) -> Result<Option<Navigation>, RouterError> {
    self.go(-1).await
  }

  pub async fn forward(&self) -> Result<Option<Navigation>, RouterError> {
    self.go(1).await
  }

  /// Entry point for every history change, including ones the platform
  /// reports directly.
  pub async fn on_history_change(
    &self,
    location: Location,
    action: Action,
    state: Option<Value>,
  ) -> Result<Navigation, RouterError> {
    let previous = std::mem::replace(&mut *self.last(), location.clone());
    if location.is_hash_change_of(&previous) {
      debug!(location = %location, "hash-only change, not dispatching");
      return Ok(Navigation::Ignored);
    }

    if action == Action::Pop {
      if let Some(Value::Object(mut snapshot)) = state {
        snapshot.remove("as");
        let snapshot = Value::Object(snapshot);
        // Anything still in flight belongs to the page we just left.
        self.inner.navigation.fetch_add(1, Ordering::SeqCst);
        debug!(location = %location, "restoring state from history");
        self.inner.state.replace(snapshot.clone());
        self.notify(&snapshot, action);
        return Ok(Navigation::Restored);
      }
    }

    self.dispatch(location, action).await
  }

  async fn dispatch(&self, location: Location, action: Action) -> Result<Navigation, RouterError> {
    let id = self.inner.navigation.fetch_add(1, Ordering::SeqCst) + 1;
    let mut location = location;
    let mut action = action;

    for _ in 0..=MAX_REDIRECTS {
      let path = location.pathname.clone();
      let router = &self.inner.router;
      router.emit(RouterEvent::Before { path: path.clone() });

      let response = Response::client();
      let mut patches = router.run(self.request_for(&location), response.clone(), DispatchOptions::client());
      while let Some(patch) = patches.next().await {
        if !self.is_current(id) {
          debug!(path = %path, "navigation superseded, dropping patches");
          return Ok(Navigation::Superseded);
        }
        self.inner.state.apply(patch.clone());
        self.notify(&patch, action);
      }
      if !self.is_current(id) {
        return Ok(Navigation::Superseded);
      }
      router.emit(RouterEvent::After { path });

      let Some(redirect) = response.snapshot().redirect else {
        return Ok(Navigation::Dispatched);
      };
      debug!(to = %redirect.location, "following client redirect");
      location = Location::parse(&redirect.location)?;
      if router.will_fetch_from_upstream(&self.request_for(&location)) {
        return Ok(Navigation::FullReload(location.href()));
      }
      self.inner.history.lock().replace(location.clone(), None)?;
      *self.last() = location.clone();
      action = Action::Replace;
    }

    Err(RouterError::InvalidRequest(format!("more than {MAX_REDIRECTS} redirects")))
  }
}
