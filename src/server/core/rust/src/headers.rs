/* src/server/core/rust/src/headers.rs */

//! Response headers consumed by the edge/CDN layer.

pub const CACHE_HIT: &str = "x-sf-cache-hit";
pub const HANDLER: &str = "x-sf-handler";
pub const RESPONSE_TYPE: &str = "x-sf-response-type";
pub const CACHE_KEY: &str = "x-sf-cache-key";
pub const CACHE_CONTROL: &str = "cache-control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
  Static,
  Json,
  Ssr,
  Proxy,
}

impl ResponseType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Static => "static",
      Self::Json => "json",
      Self::Ssr => "ssr",
      Self::Proxy => "proxy",
    }
  }
}
