/* src/server/core/rust/src/lib.rs */

pub mod cache;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod fetch;
pub mod handler;
pub mod headers;
pub mod params;
pub mod patch;
pub mod pattern;
pub mod request;
pub mod response;
pub mod route;
pub mod router;

// Re-exports for ergonomic use
pub use cache::{CachePolicy, CustomCacheKey, PatchCache, ServerCache, default_cache_key};
pub use config::StorefrontConfig;
pub use context::{DispatchOptions, RuntimeContext};
pub use dispatch::PatchStream;
pub use errors::RouterError;
pub use events::{ErrorReporter, RouterEvent};
pub use fetch::{FetchSequencer, FetchTicket, ServerTransport};
pub use handler::{
  BoxFuture, BoxStream, Handler, HandlerArgs, HandlerFn, HandlerKind, RunOn, ServerRun, cache,
  from_client, from_client_value, from_server, from_server_with, plain, proxy_upstream,
};
pub use headers::ResponseType;
pub use params::{ParamPrecedence, Params};
pub use pattern::RoutePattern;
pub use request::{Format, Method, Request};
pub use response::{ClientCache, Cookie, Redirect, Response, ResponseState, ServerCacheDirective};
pub use route::{HandlerChain, Route, RouteMatch, RouteTable};
pub use router::{APP_SHELL_PATH, ErrorHandlerFn, Router, RouterBuilder};
