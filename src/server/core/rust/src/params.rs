/* src/server/core/rust/src/params.rs */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat request parameters: path captures merged with the query string.
/// An optional capture that did not match is kept as `null`, so consumers
/// can tell "present but empty" from "not part of the pattern".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

/// Which side wins when a path capture and a query parameter share a name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamPrecedence {
  #[default]
  Query,
  Path,
}

impl Params {
  pub fn new() -> Self {
    Self(Map::new())
  }

  /// Parse a query string (with or without the leading `?`).
  /// Repeated keys collect into an array in order of appearance.
  pub fn parse_query(search: &str) -> Self {
    let raw = search.strip_prefix('?').unwrap_or(search);
    let mut params = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
      let value = Value::String(value.into_owned());
      match params.get_mut(key.as_ref()) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
          let first = existing.take();
          *existing = Value::Array(vec![first, value]);
        }
        None => {
          params.insert(key.into_owned(), value);
        }
      }
    }
    Self(params)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.0.get(key).and_then(Value::as_str)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.0.clone())
  }

  /// Combine path captures with query parameters under the given precedence.
  pub fn merge(path: Self, query: Self, precedence: ParamPrecedence) -> Self {
    let (mut base, overlay) = match precedence {
      ParamPrecedence::Query => (path, query),
      ParamPrecedence::Path => (query, path),
    };
    base.0.extend(overlay.0);
    base
  }
}

impl FromIterator<(String, Value)> for Params {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn parse_query_decodes_values() {
    let params = Params::parse_query("?q=red%20shoes&page=2");
    assert_eq!(params.get_str("q"), Some("red shoes"));
    assert_eq!(params.get_str("page"), Some("2"));
  }

  #[test]
  fn parse_query_without_prefix() {
    assert_eq!(Params::parse_query("a=1").get_str("a"), Some("1"));
    assert!(Params::parse_query("").is_empty());
    assert!(Params::parse_query("?").is_empty());
  }

  #[test]
  fn repeated_keys_become_arrays() {
    let params = Params::parse_query("color=red&color=blue&color=green");
    assert_eq!(params.get("color"), Some(&json!(["red", "blue", "green"])));
  }

  #[test]
  fn query_wins_by_default() {
    let path: Params = [("id".to_string(), json!("1"))].into_iter().collect();
    let merged = Params::merge(path, Params::parse_query("id=2"), ParamPrecedence::default());
    assert_eq!(merged.get_str("id"), Some("2"));
  }

  #[test]
  fn path_precedence_keeps_capture() {
    let path: Params = [("id".to_string(), json!("1"))].into_iter().collect();
    let merged = Params::merge(path, Params::parse_query("id=2&sort=asc"), ParamPrecedence::Path);
    assert_eq!(merged.get_str("id"), Some("1"));
    assert_eq!(merged.get_str("sort"), Some("asc"));
  }

  #[test]
  fn null_capture_is_present() {
    let params: Params = [("tab".to_string(), Value::Null)].into_iter().collect();
    assert!(params.contains_key("tab"));
    assert_eq!(params.get_str("tab"), None);
    assert_eq!(params.to_value(), json!({ "tab": null }));
  }
}
