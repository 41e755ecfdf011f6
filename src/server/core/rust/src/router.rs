/* src/server/core/rust/src/router.rs */

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::cache::PatchCache;
use crate::config::StorefrontConfig;
use crate::errors::RouterError;
use crate::events::{EVENT_CAPACITY, ErrorReporter, RouterEvent};
use crate::fetch::{FetchSequencer, ServerTransport};
use crate::handler::{self, Handler, HandlerKind};
use crate::params::{ParamPrecedence, Params};
use crate::pattern;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::route::{HandlerChain, Route, RouteMatch, RouteTable};

/// Path of the route the service worker renders as the offline app shell.
pub const APP_SHELL_PATH: &str = "/.app-shell";

pub type ErrorHandlerFn =
  Arc<dyn Fn(&RouterError, &Params, &Request, &Response) -> Value + Send + Sync>;

struct RouteSpec {
  method: Method,
  pattern: String,
  handlers: HandlerChain,
}

/// Collects routes during setup; `build` compiles them into an immutable `Router`.
pub struct RouterBuilder {
  routes: Vec<RouteSpec>,
  fallback: Option<Vec<Handler>>,
  app_shell: Option<Vec<Handler>>,
  error_handler: Option<ErrorHandlerFn>,
  error_reporter: Option<ErrorReporter>,
  api_version: String,
  param_precedence: ParamPrecedence,
  transport: Option<Arc<dyn ServerTransport>>,
  patch_cache: Option<Arc<dyn PatchCache>>,
}

impl RouterBuilder {
  pub fn new() -> Self {
    Self {
      routes: Vec::new(),
      fallback: None,
      app_shell: None,
      error_handler: None,
      error_reporter: None,
      api_version: "dev".to_string(),
      param_precedence: ParamPrecedence::default(),
      transport: None,
      patch_cache: None,
    }
  }

  /// Apply the `[app]` and `[router]` sections of a loaded config.
  pub fn with_config(mut self, config: &StorefrontConfig) -> Self {
    self.api_version.clone_from(&config.app.api_version);
    self.param_precedence = config.router.param_precedence;
    self
  }

  pub fn route(
    mut self,
    method: Method,
    pattern: &str,
    handlers: impl IntoIterator<Item = Handler>,
  ) -> Self {
    let handlers: HandlerChain = handlers.into_iter().collect();
    self.routes.push(RouteSpec { method, pattern: pattern.to_string(), handlers });
    self
  }

  pub fn get(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Get, pattern, handlers)
  }

  pub fn post(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Post, pattern, handlers)
  }

  pub fn put(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Put, pattern, handlers)
  }

  pub fn patch(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Patch, pattern, handlers)
  }

  pub fn delete(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Delete, pattern, handlers)
  }

  pub fn options(self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.route(Method::Options, pattern, handlers)
  }

  /// Mount every route of `sub` under `prefix`. Nests to any depth; the
  /// sub-router's fallback and error handler are not carried over.
  pub fn nest(mut self, prefix: &str, sub: RouterBuilder) -> Self {
    for spec in sub.routes {
      self.routes.push(RouteSpec {
        method: spec.method,
        pattern: pattern::join(prefix, &spec.pattern),
        handlers: spec.handlers,
      });
    }
    self
  }

  /// Chain used when no route matches.
  pub fn fallback(mut self, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.fallback = Some(handlers.into_iter().collect());
    self
  }

  pub fn app_shell(mut self, handlers: impl IntoIterator<Item = Handler>) -> Self {
    self.app_shell = Some(handlers.into_iter().collect());
    self
  }

  pub fn error<F>(mut self, f: F) -> Self
  where
    F: Fn(&RouterError, &Params, &Request, &Response) -> Value + Send + Sync + 'static,
  {
    self.error_handler = Some(Arc::new(f));
    self
  }

  pub fn error_reporter<F>(mut self, f: F) -> Self
  where
    F: Fn(&RouterError) + Send + Sync + 'static,
  {
    self.error_reporter = Some(Arc::new(f));
    self
  }

  pub fn api_version(mut self, version: impl Into<String>) -> Self {
    self.api_version = version.into();
    self
  }

  pub fn param_precedence(mut self, precedence: ParamPrecedence) -> Self {
    self.param_precedence = precedence;
    self
  }

  pub fn transport(mut self, transport: Arc<dyn ServerTransport>) -> Self {
    self.transport = Some(transport);
    self
  }

  pub fn patch_cache(mut self, cache: Arc<dyn PatchCache>) -> Self {
    self.patch_cache = Some(cache);
    self
  }

  pub fn build(self) -> Result<Router, RouterError> {
    let mut table = RouteTable::default();
    for spec in &self.routes {
      table.push_logical(spec.method, &spec.pattern, &spec.handlers)?;
    }

    let app_shell = match self.app_shell {
      Some(handlers) => {
        let chain: HandlerChain = handlers.into();
        table.push_logical(Method::Get, APP_SHELL_PATH, &chain)?;
        true
      }
      None => false,
    };

    let fallback: HandlerChain = match self.fallback {
      Some(handlers) => handlers.into(),
      None => vec![default_fallback()].into(),
    };

    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    Ok(Router {
      inner: Arc::new(RouterInner {
        table,
        fallback,
        app_shell,
        error_handler: self
          .error_handler
          .unwrap_or_else(|| Arc::new(default_error_handler) as ErrorHandlerFn),
        error_reporter: self.error_reporter,
        api_version: self.api_version,
        param_precedence: self.param_precedence,
        transport: self.transport,
        patch_cache: self.patch_cache,
        sequencer: FetchSequencer::new(),
        events,
      }),
    })
  }
}

impl Default for RouterBuilder {
  fn default() -> Self {
    Self::new()
  }
}

fn default_fallback() -> Handler {
  handler::plain(|args| async move {
    args.response.set_status(404);
    Ok(json!({ "page": "404" }))
  })
}

fn default_error_handler(
  err: &RouterError,
  _params: &Params,
  _request: &Request,
  response: &Response,
) -> Value {
  response.set_status(500);
  json!({ "page": "Error", "error": err.to_string(), "stack": err.stack() })
}

pub(crate) struct RouterInner {
  pub(crate) table: RouteTable,
  pub(crate) fallback: HandlerChain,
  pub(crate) app_shell: bool,
  pub(crate) error_handler: ErrorHandlerFn,
  pub(crate) error_reporter: Option<ErrorReporter>,
  pub(crate) api_version: String,
  pub(crate) param_precedence: ParamPrecedence,
  pub(crate) transport: Option<Arc<dyn ServerTransport>>,
  pub(crate) patch_cache: Option<Arc<dyn PatchCache>>,
  pub(crate) sequencer: FetchSequencer,
  pub(crate) events: broadcast::Sender<RouterEvent>,
}

/// Immutable route table plus dispatch configuration. Cheap to clone.
#[derive(Clone)]
pub struct Router {
  pub(crate) inner: Arc<RouterInner>,
}

impl fmt::Debug for Router {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Router")
      .field("routes", &self.inner.table.len())
      .field("api_version", &self.inner.api_version)
      .field("app_shell", &self.inner.app_shell)
      .finish_non_exhaustive()
  }
}

impl Router {
  pub fn builder() -> RouterBuilder {
    RouterBuilder::new()
  }

  pub fn routes(&self) -> &[Route] {
    self.inner.table.routes()
  }

  pub fn api_version(&self) -> &str {
    &self.inner.api_version
  }

  pub fn param_precedence(&self) -> ParamPrecedence {
    self.inner.param_precedence
  }

  pub fn find(&self, request: &Request) -> Option<RouteMatch<'_>> {
    self.inner.table.find(request, self.inner.param_precedence)
  }

  pub fn fallback_handlers(&self) -> &HandlerChain {
    &self.inner.fallback
  }

  pub fn is_app_shell_configured(&self) -> bool {
    self.inner.app_shell
  }

  pub fn sequencer(&self) -> &FetchSequencer {
    &self.inner.sequencer
  }

  pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
    self.inner.events.subscribe()
  }

  /// Publish an event; dropped silently when nobody listens.
  pub fn emit(&self, event: RouterEvent) {
    let _ = self.inner.events.send(event);
  }

  /// True when the route is served by an upstream proxy, which a client
  /// can only reach with a full page load.
  pub fn will_fetch_from_upstream(&self, request: &Request) -> bool {
    self.find(request).is_some_and(|m| {
      m.route.handlers.iter().any(|h| matches!(h.kind(), HandlerKind::ProxyUpstream(_)))
    })
  }

  /// Edge cache key for a request without dispatching it.
  pub fn cache_key_for(&self, request: &Request) -> Option<String> {
    let matched = self.find(request)?;
    matched
      .route
      .handlers
      .iter()
      .find_map(|h| h.cache_policy())
      .and_then(|policy| policy.key_for(request, &self.inner.api_version))
  }
}
