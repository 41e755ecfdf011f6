/* src/server/adapter/axum/src/handler/mod.rs */

mod page;

use std::sync::Arc;

use axum::Router;
use storefront_router::Router as StorefrontRouter;

use crate::ServeOptions;

pub(crate) struct AppState {
  pub router: StorefrontRouter,
  pub options: ServeOptions,
}

/// Every path goes through the storefront route table, so axum only sees a
/// single fallback handler.
pub(crate) fn build_router(router: StorefrontRouter, options: ServeOptions) -> Router {
  let state = Arc::new(AppState { router, options });
  Router::new().fallback(page::handle_request).with_state(state)
}
