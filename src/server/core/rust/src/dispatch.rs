/* src/server/core/rust/src/dispatch.rs */

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::context::{DispatchOptions, RuntimeContext};
use crate::errors::RouterError;
use crate::events::RouterEvent;
use crate::handler::{BoxStream, Handler, HandlerArgs, HandlerKind, ServerRun};
use crate::headers::{self, ResponseType};
use crate::params::Params;
use crate::patch;
use crate::request::{Format, Request};
use crate::response::{ClientCache, Response};
use crate::route::HandlerChain;
use crate::router::Router;

/// Lazily produced patches of one dispatch, in handler-chain order.
pub type PatchStream = BoxStream<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
  Preamble,
  Handlers,
  Done,
}

struct Dispatch {
  router: Router,
  request: Arc<Request>,
  response: Response,
  options: DispatchOptions,
  params: Params,
  handlers: HandlerChain,
  next: usize,
  step: Step,
  /// Every `fromServer` result was found in the client cache.
  cache_hit: bool,
  /// Merged cached result not yet handed out.
  cached: Option<Value>,
}

impl Dispatch {
  fn context(&self) -> RuntimeContext {
    self.options.context
  }

  async fn advance(&mut self) -> Option<Value> {
    loop {
      match self.step {
        Step::Preamble => {
          self.step = Step::Handlers;
          match self.preamble().await {
            Ok(Some(patch)) => return Some(patch),
            Ok(None) => {}
            Err(err) => return self.fail(err),
          }
        }
        Step::Handlers => {
          let Some(handler) = self.handlers.get(self.next).cloned() else {
            self.step = Step::Done;
            continue;
          };
          self.next += 1;
          if !self.eligible(&handler) {
            debug!(path = %self.request.path, handler = handler.kind().label(), "skipping handler");
            continue;
          }
          if let (Some(name), true) = (handler.name(), self.options.is_server()) {
            self.response.set_header(headers::HANDLER, name);
          }
          match self.invoke(&handler).await {
            Ok(Some(patch)) => return Some(patch),
            Ok(None) => {}
            Err(err) => return self.fail(err),
          }
        }
        Step::Done => return None,
      }
    }
  }

  /// Client navigation only: apply client cache rules, look for cached
  /// `fromServer` results, and announce the navigation before any fetch.
  async fn preamble(&mut self) -> Result<Option<Value>, RouterError> {
    let cache_policy = self
      .handlers
      .iter()
      .filter(|h| h.run_on().client)
      .find_map(Handler::cache_policy)
      .cloned();
    if let Some(policy) = cache_policy {
      policy.apply(&self.request, &self.response, self.router.api_version())?;
    }

    let location = json!({ "location": self.request.location() });

    let from_server: Vec<Handler> =
      self.handlers.iter().filter(|h| h.is_from_server()).cloned().collect();
    if self.response.client_cache() == ClientCache::ForceCache && !from_server.is_empty() {
      if let Some(cache) = self.router.inner.patch_cache.clone() {
        let mut merged = Value::Object(Map::new());
        let mut complete = true;
        for handler in &from_server {
          match cache.cached_patch(handler, &self.request).await {
            Some(found) => patch::merge(&mut merged, found),
            None => {
              complete = false;
              break;
            }
          }
        }
        if complete {
          debug!(path = %self.request.path, "serving fromServer results from client cache");
          patch::merge(&mut merged, location);
          self.cache_hit = true;
          self.cached = Some(merged);
          return Ok(None);
        }
      }
    }

    let mut preamble = json!({ "loading": true });
    patch::merge(&mut preamble, location);
    Ok(Some(preamble))
  }

  fn eligible(&self, handler: &Handler) -> bool {
    let run_on = handler.run_on();
    let allowed = match self.context() {
      RuntimeContext::Server => run_on.server != ServerRun::Never,
      // Cache rules were applied in the preamble.
      RuntimeContext::Client => run_on.client && handler.cache_policy().is_none(),
    };
    // JSON requests carry server-derived data only.
    allowed && (self.request.format != Format::Json || run_on.server == ServerRun::Always)
  }

  fn args(&self) -> HandlerArgs {
    HandlerArgs {
      params: self.params.clone(),
      request: Arc::clone(&self.request),
      response: self.response.clone(),
      context: self.context(),
    }
  }

  async fn invoke(&mut self, handler: &Handler) -> Result<Option<Value>, RouterError> {
    let patch = match handler.kind() {
      HandlerKind::Cache(policy) => {
        policy.apply(&self.request, &self.response, self.router.api_version())?;
        Value::Null
      }
      HandlerKind::FromServer { server, client } => {
        if self.cache_hit {
          // The first skipped fromServer slot hands out the cached result
          // unless a fromClient patch already carried it.
          return Ok(self.cached.take());
        }
        match self.context() {
          RuntimeContext::Server => server(self.args()).await?,
          RuntimeContext::Client => {
            self.router.emit(RouterEvent::Fetch { path: self.request.path.clone() });
            let fut = match (client, &self.router.inner.transport) {
              (Some(client), _) => client(self.args()),
              (None, Some(transport)) => transport.fetch_json(&self.request.json_url()),
              (None, None) => server(self.args()),
            };
            let sequencer = self.router.sequencer();
            let ticket = sequencer.issue();
            let result = fut.await;
            sequencer.settle(ticket, result)?
          }
        }
      }
      HandlerKind::FromClient(f) => {
        let mut out = f(self.args()).await?;
        if self.context() == RuntimeContext::Client {
          if let Some(cached) = self.cached.take() {
            if out.is_null() {
              out = Value::Object(Map::new());
            }
            patch::merge(&mut out, cached);
          }
        }
        out
      }
      HandlerKind::ProxyUpstream(f) => {
        self.response.set_header(headers::RESPONSE_TYPE, ResponseType::Proxy.as_str());
        f(self.args()).await?
      }
      HandlerKind::Plain(f) => f(self.args()).await?,
    };
    Ok((!patch.is_null()).then_some(patch))
  }

  /// Abort the chain and substitute the error handler's patch.
  fn fail(&mut self, err: RouterError) -> Option<Value> {
    self.step = Step::Done;
    if err.is_stale() {
      debug!(path = %self.request.path, error = %err, "dropping superseded dispatch");
      return None;
    }
    error!(path = %self.request.path, code = err.code(), error = %err, "handler failed");
    self.router.emit(RouterEvent::Error {
      path: self.request.path.clone(),
      message: err.to_string(),
    });
    if let Some(report) = &self.router.inner.error_reporter {
      report(&err);
    }
    let patch = (self.router.inner.error_handler)(&err, &self.params, &self.request, &self.response);
    Some(patch)
  }
}

impl Router {
  /// Dispatch a request and stream the resulting patches.
  ///
  /// Nothing runs until the stream is polled. Handler errors never escape:
  /// they end the stream with the error handler's patch.
  pub fn run(&self, request: Request, response: Response, options: DispatchOptions) -> PatchStream {
    let mut request = request;
    let (handlers, params) = match self.find(&request) {
      Some(matched) => {
        debug!(path = %request.path, route = matched.route.pattern.as_str(), "route matched");
        if options.is_server() {
          response.set_header(headers::HANDLER, matched.route.pattern.as_str());
        }
        (Arc::clone(&matched.route.handlers), matched.params)
      }
      None => {
        debug!(path = %request.path, "no route matched, using fallback");
        if options.is_server() {
          response.set_header(headers::HANDLER, "fallback");
        }
        (Arc::clone(self.fallback_handlers()), request.query())
      }
    };

    if options.is_server() {
      let kind = if request.format == Format::Json { ResponseType::Json } else { ResponseType::Ssr };
      response.set_header(headers::RESPONSE_TYPE, kind.as_str());
    }

    request.params = params.clone();
    let step = if options.context == RuntimeContext::Client && !options.initial_load {
      Step::Preamble
    } else {
      Step::Handlers
    };

    let dispatch = Dispatch {
      router: self.clone(),
      request: Arc::new(request),
      response,
      options,
      params,
      handlers,
      next: 0,
      step,
      cache_hit: false,
      cached: None,
    };

    Box::pin(stream::unfold(dispatch, |mut dispatch| async move {
      let patch = dispatch.advance().await?;
      Some((patch, dispatch))
    }))
  }

  /// Dispatch and fold every patch into a copy of `initial`.
  pub async fn run_all(
    &self,
    request: Request,
    response: Response,
    options: DispatchOptions,
    initial: &Value,
  ) -> Value {
    let mut state = initial.clone();
    let mut patches = self.run(request, response, options);
    while let Some(next) = patches.next().await {
      patch::merge(&mut state, next);
    }
    state
  }
}

#[cfg(test)]
mod tests;
