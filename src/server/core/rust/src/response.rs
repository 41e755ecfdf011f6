/* src/server/core/rust/src/response.rs */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::context::RuntimeContext;

/// Client-side caching mode honored by the service worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClientCache {
  #[default]
  Default,
  ForceCache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCacheDirective {
  pub max_age_seconds: u64,
  pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
  pub name: String,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
  pub location: String,
  pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseState {
  pub status: u16,
  pub headers: BTreeMap<String, String>,
  pub cookies: Vec<Cookie>,
  pub cookies_suppressed: bool,
  pub client_cache: ClientCache,
  pub server_cache: Option<ServerCacheDirective>,
  pub redirect: Option<Redirect>,
  pub body: Option<String>,
  pub sent: bool,
}

impl Default for ResponseState {
  fn default() -> Self {
    Self {
      status: 200,
      headers: BTreeMap::new(),
      cookies: Vec::new(),
      cookies_suppressed: false,
      client_cache: ClientCache::Default,
      server_cache: None,
      redirect: None,
      body: None,
      sent: false,
    }
  }
}

/// Mutable per-dispatch response context shared by every handler in a chain.
///
/// The client variant keeps the same surface so isomorphic handlers never
/// branch on the environment: header, status and cookie writes are no-ops,
/// while cache mode and redirects are still recorded.
#[derive(Debug, Clone)]
pub struct Response {
  context: RuntimeContext,
  state: Arc<Mutex<ResponseState>>,
}

impl Response {
  pub fn new(context: RuntimeContext) -> Self {
    Self { context, state: Arc::new(Mutex::new(ResponseState::default())) }
  }

  pub fn server() -> Self {
    Self::new(RuntimeContext::Server)
  }

  pub fn client() -> Self {
    Self::new(RuntimeContext::Client)
  }

  pub fn context(&self) -> RuntimeContext {
    self.context
  }

  fn with<R>(&self, f: impl FnOnce(&mut ResponseState) -> R) -> R {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
  }

  fn on_server(&self, f: impl FnOnce(&mut ResponseState)) {
    if self.context == RuntimeContext::Server {
      self.with(f);
    }
  }

  pub fn set_status(&self, status: u16) {
    self.on_server(|s| s.status = status);
  }

  pub fn status(&self) -> u16 {
    self.with(|s| s.status)
  }

  pub fn set_header(&self, name: &str, value: impl Into<String>) {
    let value = value.into();
    self.on_server(|s| {
      s.headers.insert(name.to_ascii_lowercase(), value);
    });
  }

  pub fn header(&self, name: &str) -> Option<String> {
    self.with(|s| s.headers.get(&name.to_ascii_lowercase()).cloned())
  }

  pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
    let cookie = Cookie { name: name.into(), value: value.into() };
    self.on_server(|s| s.cookies.push(cookie));
  }

  /// Drop every `set-cookie` so a shared cached response is never personalized.
  pub fn suppress_cookies(&self) {
    self.on_server(|s| s.cookies_suppressed = true);
  }

  pub fn cache_on_server(&self, directive: ServerCacheDirective) {
    self.on_server(|s| s.server_cache = Some(directive));
  }

  pub fn server_cache(&self) -> Option<ServerCacheDirective> {
    self.with(|s| s.server_cache.clone())
  }

  pub fn set_client_cache(&self, mode: ClientCache) {
    self.with(|s| s.client_cache = mode);
  }

  pub fn client_cache(&self) -> ClientCache {
    self.with(|s| s.client_cache)
  }

  pub fn redirect(&self, location: impl Into<String>, status: u16) {
    let redirect = Redirect { location: location.into(), status };
    self.with(|s| {
      s.redirect = Some(redirect);
      s.sent = true;
    });
  }

  /// Send a raw body, bypassing state rendering.
  pub fn send(&self, body: impl Into<String>) {
    let body = body.into();
    self.with(|s| {
      s.body = Some(body);
      s.sent = true;
    });
  }

  pub fn is_sent(&self) -> bool {
    self.with(|s| s.sent)
  }

  pub fn snapshot(&self) -> ResponseState {
    self.with(|s| s.clone())
  }
}
