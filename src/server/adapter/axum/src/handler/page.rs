/* src/server/adapter/axum/src/handler/page.rs */

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, header};
use serde_json::{Map, Value};
use storefront_router::headers::CACHE_HIT;
use storefront_router::{
  DispatchOptions, Format, Method, Request, Response as RouterResponse, ResponseState,
};
use tracing::{debug, warn};

use super::AppState;
use crate::ServeOptions;
use crate::edge_cache::CachedResponse;
use crate::error::AxumError;
use crate::render::inject_state;

/// Translate the incoming request into the platform-independent form.
fn build_request(
  method: &axum::http::Method,
  uri: &Uri,
  headers: &HeaderMap,
) -> Result<Request, AxumError> {
  let method: Method = method.as_str().parse()?;
  let url = uri.path_and_query().map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
  let mut request = Request::new(method, &url);
  for (name, value) in headers {
    if let Ok(value) = value.to_str() {
      request = request.with_header(name.as_str(), value);
    }
  }
  let host = headers
    .get(header::HOST)
    .and_then(|v| v.to_str().ok())
    .or_else(|| uri.authority().map(|a| a.as_str()))
    .unwrap_or("localhost")
    .to_string();
  let protocol = headers
    .get("x-forwarded-proto")
    .and_then(|v| v.to_str().ok())
    .or_else(|| uri.scheme_str())
    .unwrap_or("http")
    .to_string();
  Ok(request.with_origin(&protocol, &host))
}

/// Turn a finished dispatch into status, headers and body.
fn render(
  options: &ServeOptions,
  request: &Request,
  state: &Value,
  snapshot: ResponseState,
) -> CachedResponse {
  let mut headers: Vec<(String, String)> = snapshot.headers.into_iter().collect();

  if !snapshot.cookies_suppressed {
    for cookie in snapshot.cookies {
      headers.push((header::SET_COOKIE.as_str().to_string(), format!("{}={}", cookie.name, cookie.value)));
    }
  }

  if let Some(redirect) = snapshot.redirect {
    headers.push((header::LOCATION.as_str().to_string(), redirect.location));
    return CachedResponse { status: redirect.status, headers, body: String::new() };
  }

  let has_content_type = headers.iter().any(|(name, _)| name == header::CONTENT_TYPE.as_str());
  let (content_type, body) = match snapshot.body {
    Some(body) => ("text/html; charset=utf-8", body),
    None if request.format == Format::Json => ("application/json", state.to_string()),
    None => ("text/html; charset=utf-8", inject_state(&options.shell, &options.data_id, state)),
  };
  if !has_content_type {
    headers.push((header::CONTENT_TYPE.as_str().to_string(), content_type.to_string()));
  }

  CachedResponse { status: snapshot.status, headers, body }
}

fn into_http(rendered: CachedResponse) -> axum::response::Response {
  let mut response = axum::response::Response::new(Body::from(rendered.body));
  *response.status_mut() =
    StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
  let headers = response.headers_mut();
  for (name, value) in rendered.headers {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
      (Ok(name), Ok(value)) => {
        headers.append(name, value);
      }
      _ => warn!(%name, "dropping invalid response header"),
    }
  }
  response
}

fn with_cache_hit(mut rendered: CachedResponse, hit: bool) -> CachedResponse {
  rendered.headers.retain(|(name, _)| name != CACHE_HIT);
  rendered.headers.push((CACHE_HIT.to_string(), if hit { "1" } else { "0" }.to_string()));
  rendered
}

pub(super) async fn handle_request(
  State(state): State<Arc<AppState>>,
  method: axum::http::Method,
  uri: Uri,
  headers: HeaderMap,
) -> Result<axum::response::Response, AxumError> {
  let request = build_request(&method, &uri, &headers)?;
  let edge_cache = state.options.edge_cache.as_ref();

  if let Some(cache) = edge_cache {
    if let Some(key) = state.router.cache_key_for(&request) {
      if let Some(hit) = cache.get(&key) {
        debug!(%key, "edge cache hit");
        return Ok(into_http(with_cache_hit(hit, true)));
      }
    }
  }

  let response = RouterResponse::server();
  let data = state
    .router
    .run_all(request.clone(), response.clone(), DispatchOptions::server(), &Value::Object(Map::new()))
    .await;
  let snapshot = response.snapshot();
  let directive = snapshot.server_cache.clone();
  let mut rendered = render(&state.options, &request, &data, snapshot);

  if let (Some(cache), Some(directive)) = (edge_cache, directive) {
    rendered = with_cache_hit(rendered, false);
    if rendered.status == 200 {
      debug!(key = %directive.key, ttl = directive.max_age_seconds, "storing rendered response");
      cache.put(directive.key, Duration::from_secs(directive.max_age_seconds), rendered.clone());
    }
  }

  Ok(into_http(rendered))
}
