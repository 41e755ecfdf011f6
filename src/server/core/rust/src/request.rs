/* src/server/core/rust/src/request.rs */

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::errors::RouterError;
use crate::params::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Patch,
  Delete,
  Options,
}

impl Method {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Head => "HEAD",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
      Self::Options => "OPTIONS",
    }
  }
}

impl FromStr for Method {
  type Err = RouterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Self::Get),
      "HEAD" => Ok(Self::Head),
      "POST" => Ok(Self::Post),
      "PUT" => Ok(Self::Put),
      "PATCH" => Ok(Self::Patch),
      "DELETE" => Ok(Self::Delete),
      "OPTIONS" => Ok(Self::Options),
      other => Err(RouterError::InvalidRequest(format!("unsupported method '{other}'"))),
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Representation selected by the path suffix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  #[default]
  Html,
  Json,
  Amp,
}

impl Format {
  pub fn from_path(path: &str) -> Self {
    if path.ends_with(".json") {
      Self::Json
    } else if path.ends_with(".amp") {
      Self::Amp
    } else {
      Self::Html
    }
  }

  pub fn suffix(self) -> &'static str {
    match self {
      Self::Html => "",
      Self::Json => ".json",
      Self::Amp => ".amp",
    }
  }
}

/// One dispatch worth of request data, independent of the host platform.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub path: String,
  /// Query string including the leading `?`, or empty.
  pub search: String,
  /// Header names are stored lowercase.
  pub headers: BTreeMap<String, String>,
  pub format: Format,
  /// Populated by the dispatcher after route matching.
  pub params: Params,
  pub protocol: String,
  pub host: String,
}

impl Request {
  /// Build a request from a path with an optional query string and fragment.
  pub fn new(method: Method, url: &str) -> Self {
    let without_hash = url.split_once('#').map_or(url, |(before, _)| before);
    let (path, search) = match without_hash.split_once('?') {
      Some((path, query)) if !query.is_empty() => (path, format!("?{query}")),
      Some((path, _)) => (path, String::new()),
      None => (without_hash, String::new()),
    };
    let path = if path.is_empty() { "/" } else { path };
    Self {
      method,
      path: path.to_string(),
      search,
      headers: BTreeMap::new(),
      format: Format::from_path(path),
      params: Params::new(),
      protocol: "http:".to_string(),
      host: "localhost".to_string(),
    }
  }

  pub fn get(url: &str) -> Self {
    Self::new(Method::Get, url)
  }

  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn with_origin(mut self, protocol: &str, host: &str) -> Self {
    self.protocol = if protocol.ends_with(':') { protocol.to_string() } else { format!("{protocol}:") };
    self.host = host.to_string();
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
  }

  pub fn cookie(&self, name: &str) -> Option<String> {
    let header = self.header("cookie")?;
    header.split(';').find_map(|pair| {
      let (k, v) = pair.trim().split_once('=')?;
      (k.trim() == name).then(|| v.trim().to_string())
    })
  }

  pub fn query(&self) -> Params {
    Params::parse_query(&self.search)
  }

  pub fn url(&self) -> String {
    format!("{}{}", self.path, self.search)
  }

  /// URL of the machine-readable variant of this request.
  pub fn json_url(&self) -> String {
    match self.format {
      Format::Json => self.url(),
      Format::Amp => {
        let base = self.path.trim_end_matches(".amp");
        format!("{base}.json{}", self.search)
      }
      Format::Html => format!("{}.json{}", self.path, self.search),
    }
  }

  /// Location info carried by navigation patches.
  pub fn location(&self) -> Value {
    let (hostname, port) = match self.host.rsplit_once(':') {
      Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => (name, port),
      _ => (self.host.as_str(), ""),
    };
    json!({
      "protocol": self.protocol,
      "hostname": hostname,
      "port": port,
      "pathname": self.path,
      "search": self.search,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn method_parse_is_case_insensitive() {
    assert_eq!("get".parse::<Method>().ok(), Some(Method::Get));
    assert_eq!("Delete".parse::<Method>().ok(), Some(Method::Delete));
    assert!("BREW".parse::<Method>().is_err());
  }

  #[test]
  fn splits_path_and_search() {
    let req = Request::get("/products/1?color=red#reviews");
    assert_eq!(req.path, "/products/1");
    assert_eq!(req.search, "?color=red");
    assert_eq!(req.format, Format::Html);
  }

  #[test]
  fn empty_query_is_dropped() {
    assert_eq!(Request::get("/s?").search, "");
    assert_eq!(Request::get("").path, "/");
  }

  #[test]
  fn format_from_suffix() {
    assert_eq!(Request::get("/p/1.json").format, Format::Json);
    assert_eq!(Request::get("/p/1.amp?x=1").format, Format::Amp);
    assert_eq!(Request::get("/p/1").format, Format::Html);
  }

  #[test]
  fn json_url_variants() {
    assert_eq!(Request::get("/p/1?x=1").json_url(), "/p/1.json?x=1");
    assert_eq!(Request::get("/p/1.json").json_url(), "/p/1.json");
    assert_eq!(Request::get("/p/1.amp").json_url(), "/p/1.json");
  }

  #[test]
  fn cookie_lookup() {
    let req = Request::get("/").with_header("Cookie", "a=1; currency=EUR; b=2");
    assert_eq!(req.cookie("currency").as_deref(), Some("EUR"));
    assert_eq!(req.cookie("missing"), None);
  }

  #[test]
  fn location_splits_port() {
    let req = Request::get("/c/shoes?page=2").with_origin("https", "shop.test:8443");
    let loc = req.location();
    assert_eq!(loc["protocol"], "https:");
    assert_eq!(loc["hostname"], "shop.test");
    assert_eq!(loc["port"], "8443");
    assert_eq!(loc["pathname"], "/c/shoes");
    assert_eq!(loc["search"], "?page=2");
  }
}
