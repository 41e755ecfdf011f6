/* src/server/core/rust/src/route.rs */

use std::sync::Arc;

use crate::handler::Handler;
use crate::params::{ParamPrecedence, Params};
use crate::pattern::RoutePattern;
use crate::request::{Format, Method, Request};

/// Handler chains are shared by the exact, `.json` and `.amp` routes of a path.
pub type HandlerChain = Arc<[Handler]>;

#[derive(Debug, Clone)]
pub struct Route {
  pub method: Method,
  pub pattern: RoutePattern,
  pub handlers: HandlerChain,
}

#[derive(Debug)]
pub struct RouteMatch<'a> {
  pub route: &'a Route,
  pub params: Params,
}

/// Immutable, ordered route list produced by `RouterBuilder::build`.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
  routes: Vec<Route>,
}

impl RouteTable {
  /// Expand one logical path into its `.json`, `.amp` and exact routes, in
  /// that order, so suffixed requests hit the dedicated variants before a
  /// trailing param could swallow the suffix.
  pub(crate) fn push_logical(
    &mut self,
    method: Method,
    pattern: &str,
    handlers: &HandlerChain,
  ) -> Result<(), crate::RouterError> {
    for format in [Format::Json, Format::Amp, Format::Html] {
      let source = format!("{pattern}{}", format.suffix());
      self.routes.push(Route {
        method,
        pattern: RoutePattern::parse(&source)?,
        handlers: Arc::clone(handlers),
      });
    }
    Ok(())
  }

  pub fn routes(&self) -> &[Route] {
    &self.routes
  }

  pub fn len(&self) -> usize {
    self.routes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.routes.is_empty()
  }

  /// First route, in registration order, matching method and path.
  pub fn find(&self, request: &Request, precedence: ParamPrecedence) -> Option<RouteMatch<'_>> {
    self.routes.iter().filter(|route| route.method == request.method).find_map(|route| {
      let captures = route.pattern.matches(&request.path)?;
      Some(RouteMatch { route, params: Params::merge(captures, request.query(), precedence) })
    })
  }
}
