/* src/server/core/rust/src/handler.rs */

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use serde_json::Value;

use crate::cache::CachePolicy;
use crate::context::RuntimeContext;
use crate::errors::RouterError;
use crate::params::Params;
use crate::request::Request;
use crate::response::Response;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Everything a handler sees for one dispatch.
#[derive(Debug, Clone)]
pub struct HandlerArgs {
  pub params: Params,
  pub request: Arc<Request>,
  pub response: Response,
  pub context: RuntimeContext,
}

/// A handler resolves to a patch; `Value::Null` means "nothing to merge".
pub type HandlerFn = Arc<dyn Fn(HandlerArgs) -> BoxFuture<Result<Value, RouterError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRun {
  Never,
  Always,
  /// Server only while producing HTML, never for `.json` requests.
  SsrOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOn {
  pub server: ServerRun,
  pub client: bool,
}

#[derive(Clone)]
pub enum HandlerKind {
  FromClient(HandlerFn),
  /// `client` overrides how the data is obtained on the client; when absent
  /// the router's transport fetches the `.json` variant of the request.
  FromServer { server: HandlerFn, client: Option<HandlerFn> },
  Cache(Arc<CachePolicy>),
  ProxyUpstream(HandlerFn),
  Plain(HandlerFn),
}

impl HandlerKind {
  pub fn label(&self) -> &'static str {
    match self {
      Self::FromClient(_) => "fromClient",
      Self::FromServer { .. } => "fromServer",
      Self::Cache(_) => "cache",
      Self::ProxyUpstream(_) => "proxyUpstream",
      Self::Plain(_) => "plain",
    }
  }
}

/// One immutable entry of a route's handler chain.
#[derive(Clone)]
pub struct Handler {
  kind: HandlerKind,
  run_on: RunOn,
  name: Option<String>,
}

impl fmt::Debug for Handler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Handler")
      .field("kind", &self.kind.label())
      .field("run_on", &self.run_on)
      .field("name", &self.name)
      .finish()
  }
}

fn boxed<F, Fut>(f: F) -> HandlerFn
where
  F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Arc::new(move |args| Box::pin(f(args)))
}

impl Handler {
  pub fn kind(&self) -> &HandlerKind {
    &self.kind
  }

  pub fn run_on(&self) -> RunOn {
    self.run_on
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Tag the handler for logs and the handler-identifying response header.
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn is_from_server(&self) -> bool {
    matches!(self.kind, HandlerKind::FromServer { .. })
  }

  pub fn cache_policy(&self) -> Option<&Arc<CachePolicy>> {
    match &self.kind {
      HandlerKind::Cache(policy) => Some(policy),
      _ => None,
    }
  }
}

/// Runs on the client and during server-side rendering, never for `.json` requests.
pub fn from_client<F, Fut>(f: F) -> Handler
where
  F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Handler {
    kind: HandlerKind::FromClient(boxed(f)),
    run_on: RunOn { server: ServerRun::SsrOnly, client: true },
    name: None,
  }
}

/// A `from_client` handler yielding a fixed patch, e.g. `{ "page": "Product" }`.
pub fn from_client_value(patch: Value) -> Handler {
  from_client(move |_| {
    let patch = patch.clone();
    async move { Ok(patch) }
  })
}

/// Server data. On the client it is fetched through the router's transport.
pub fn from_server<F, Fut>(f: F) -> Handler
where
  F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Handler {
    kind: HandlerKind::FromServer { server: boxed(f), client: None },
    run_on: RunOn { server: ServerRun::Always, client: true },
    name: None,
  }
}

/// Server data with an explicit client-side implementation.
pub fn from_server_with<S, SFut, C, CFut>(server: S, client: C) -> Handler
where
  S: Fn(HandlerArgs) -> SFut + Send + Sync + 'static,
  SFut: Future<Output = Result<Value, RouterError>> + Send + 'static,
  C: Fn(HandlerArgs) -> CFut + Send + Sync + 'static,
  CFut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Handler {
    kind: HandlerKind::FromServer { server: boxed(server), client: Some(boxed(client)) },
    run_on: RunOn { server: ServerRun::Always, client: true },
    name: None,
  }
}

pub fn cache(policy: CachePolicy) -> Handler {
  let client = policy.caches_on_client();
  Handler {
    kind: HandlerKind::Cache(Arc::new(policy)),
    run_on: RunOn { server: ServerRun::Always, client },
    name: None,
  }
}

/// Server only; a client navigating to such a route must reload the page.
pub fn proxy_upstream<F, Fut>(f: F) -> Handler
where
  F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Handler {
    kind: HandlerKind::ProxyUpstream(boxed(f)),
    run_on: RunOn { server: ServerRun::Always, client: false },
    name: None,
  }
}

pub fn plain<F, Fut>(f: F) -> Handler
where
  F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, RouterError>> + Send + 'static,
{
  Handler {
    kind: HandlerKind::Plain(boxed(f)),
    run_on: RunOn { server: ServerRun::Always, client: true },
    name: None,
  }
}
