/* src/server/core/rust/src/cache.rs */

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::context::RuntimeContext;
use crate::errors::RouterError;
use crate::handler::{BoxFuture, Handler};
use crate::headers;
use crate::request::{Method, Request};
use crate::response::{ClientCache, Response, ServerCacheDirective};

pub type CookieTransform = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// Surrogate key composition. The default key is the api version, the path
/// and the sorted query string; headers and cookies split it further.
#[derive(Clone, Default)]
pub struct CustomCacheKey {
  headers: Vec<String>,
  cookies: Vec<(String, Option<CookieTransform>)>,
  excluded_query: Vec<String>,
  exclude_all_query: bool,
}

impl fmt::Debug for CustomCacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let cookies: Vec<&str> = self.cookies.iter().map(|(name, _)| name.as_str()).collect();
    f.debug_struct("CustomCacheKey")
      .field("headers", &self.headers)
      .field("cookies", &cookies)
      .field("excluded_query", &self.excluded_query)
      .field("exclude_all_query", &self.exclude_all_query)
      .finish()
  }
}

impl CustomCacheKey {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_header(mut self, name: &str) -> Self {
    self.headers.push(name.to_ascii_lowercase());
    self
  }

  pub fn add_cookie(mut self, name: impl Into<String>) -> Self {
    self.cookies.push((name.into(), None));
    self
  }

  /// Key on a cookie through a transform, e.g. bucketing values into a few partitions.
  pub fn add_cookie_with<F>(mut self, name: impl Into<String>, transform: F) -> Self
  where
    F: Fn(Option<&str>) -> String + Send + Sync + 'static,
  {
    self.cookies.push((name.into(), Some(Arc::new(transform))));
    self
  }

  pub fn exclude_query_parameters<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.excluded_query.extend(names.into_iter().map(Into::into));
    self
  }

  pub fn exclude_all_query_parameters(mut self) -> Self {
    self.exclude_all_query = true;
    self
  }

  pub fn compute(&self, request: &Request, api_version: &str) -> String {
    let mut key = format!("{api_version}:{}", request.path);

    if !self.exclude_all_query {
      let raw = request.search.strip_prefix('?').unwrap_or(&request.search);
      let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(k, _)| !self.excluded_query.iter().any(|e| e == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
      pairs.sort();
      if !pairs.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();
        key.push('?');
        key.push_str(&query);
      }
    }

    for name in &self.headers {
      let value = request.header(name).unwrap_or_default();
      key.push_str(&format!("|header:{name}={value}"));
    }
    for (name, transform) in &self.cookies {
      let raw = request.cookie(name);
      let value = match transform {
        Some(f) => f(raw.as_deref()),
        None => raw.unwrap_or_default(),
      };
      key.push_str(&format!("|cookie:{name}={value}"));
    }
    key
  }
}

#[derive(Debug, Clone)]
pub struct ServerCache {
  pub max_age_seconds: u64,
  pub key: Option<CustomCacheKey>,
}

/// Per-route caching rules, attached to a chain through `handler::cache`.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
  server: Option<ServerCache>,
  client: bool,
}

impl CachePolicy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cache on the edge for `max_age_seconds`.
  pub fn server(mut self, max_age_seconds: u64) -> Self {
    let key = self.server.take().and_then(|s| s.key);
    self.server = Some(ServerCache { max_age_seconds, key });
    self
  }

  pub fn server_with_key(mut self, max_age_seconds: u64, key: CustomCacheKey) -> Self {
    self.server = Some(ServerCache { max_age_seconds, key: Some(key) });
    self
  }

  /// Let the service worker answer this route from its cache.
  pub fn client(mut self, enabled: bool) -> Self {
    self.client = enabled;
    self
  }

  pub fn caches_on_client(&self) -> bool {
    self.client
  }

  pub fn server_cache(&self) -> Option<&ServerCache> {
    self.server.as_ref()
  }

  /// Edge cache key for a request, or `None` when the request is not cacheable here.
  pub fn key_for(&self, request: &Request, api_version: &str) -> Option<String> {
    let server = self.server.as_ref()?;
    if request.method != Method::Get || server.max_age_seconds == 0 {
      return None;
    }
    Some(match &server.key {
      Some(custom) => custom.compute(request, api_version),
      None => default_cache_key(request, api_version),
    })
  }

  /// Apply this policy to a response.
  ///
  /// Fails before touching the response when the request is not a GET.
  pub fn apply(
    &self,
    request: &Request,
    response: &Response,
    api_version: &str,
  ) -> Result<(), RouterError> {
    if request.method != Method::Get {
      return Err(RouterError::CachePolicyViolation {
        method: request.method.to_string(),
        path: request.path.clone(),
      });
    }

    match response.context() {
      RuntimeContext::Server => {
        let Some(server) = &self.server else { return Ok(()) };
        if server.max_age_seconds == 0 {
          return Ok(());
        }
        let key = self.key_for(request, api_version).unwrap_or_default();
        debug!(path = %request.path, ttl = server.max_age_seconds, %key, "caching on server");
        response.suppress_cookies();
        response.set_header(
          headers::CACHE_CONTROL,
          format!("public, max-age=0, s-maxage={}", server.max_age_seconds),
        );
        response.set_header(headers::CACHE_KEY, key.clone());
        response.cache_on_server(ServerCacheDirective { max_age_seconds: server.max_age_seconds, key });
      }
      RuntimeContext::Client => {
        if self.client {
          response.set_client_cache(ClientCache::ForceCache);
        }
      }
    }
    Ok(())
  }
}

pub fn default_cache_key(request: &Request, api_version: &str) -> String {
  CustomCacheKey::new().compute(request, api_version)
}

/// Client-side lookup of previously cached `fromServer` results.
pub trait PatchCache: Send + Sync {
  fn cached_patch(&self, handler: &Handler, request: &Request) -> BoxFuture<Option<Value>>;
}
