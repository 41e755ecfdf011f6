/* src/server/core/rust/src/pattern.rs */

use regex::Regex;
use serde_json::Value;

use crate::errors::RouterError;
use crate::params::Params;

/// A compiled path pattern.
///
/// Syntax: `:name` captures one segment, `*name` captures the rest of the
/// path (slashes included), `( ... )` marks an optional group, anything else
/// is literal. A param name ends at the first character outside
/// `[A-Za-z0-9_]`, so `/p/:id.:format` captures both halves of `1.json`.
#[derive(Debug, Clone)]
pub struct RoutePattern {
  source: String,
  regex: Regex,
  names: Vec<String>,
}

fn invalid(pattern: &str, reason: impl Into<String>) -> RouterError {
  RouterError::InvalidPattern { pattern: pattern.to_string(), reason: reason.into() }
}

impl RoutePattern {
  pub fn parse(source: &str) -> Result<Self, RouterError> {
    let mut expr = String::from("^");
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut chars = source.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
      match c {
        ':' | '*' => {
          let mut name = String::new();
          while let Some(&(_, next)) = chars.peek() {
            if !(next.is_ascii_alphanumeric() || next == '_') {
              break;
            }
            name.push(next);
            chars.next();
          }
          if name.is_empty() {
            return Err(invalid(source, format!("missing parameter name at offset {offset}")));
          }
          expr.push_str(if c == ':' { "([^/?]+)" } else { "([^?]*?)" });
          names.push(name);
        }
        '(' => {
          depth += 1;
          expr.push_str("(?:");
        }
        ')' => {
          if depth == 0 {
            return Err(invalid(source, format!("unmatched ')' at offset {offset}")));
          }
          depth -= 1;
          expr.push_str(")?");
        }
        literal => {
          let mut buf = [0u8; 4];
          expr.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
        }
      }
    }

    if depth != 0 {
      return Err(invalid(source, "unclosed optional group"));
    }
    expr.push('$');

    let regex = Regex::new(&expr).map_err(|e| invalid(source, e.to_string()))?;
    Ok(Self { source: source.to_string(), regex, names })
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// Match a path (no query string) and return the decoded captures.
  /// Duplicate names resolve to the innermost (last) capture.
  pub fn matches(&self, path: &str) -> Option<Params> {
    let caps = self.regex.captures(path)?;
    let mut params = Params::new();
    for (idx, name) in self.names.iter().enumerate() {
      let value = match caps.get(idx + 1) {
        Some(m) => Value::String(decode(m.as_str())),
        None => Value::Null,
      };
      params.insert(name.clone(), value);
    }
    Some(params)
  }
}

fn decode(raw: &str) -> String {
  urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}

/// Join a mount prefix and a child pattern without doubling slashes.
pub(crate) fn join(prefix: &str, pattern: &str) -> String {
  let prefix = prefix.trim_end_matches('/');
  if pattern.is_empty() || pattern == "/" {
    if prefix.is_empty() { "/".to_string() } else { prefix.to_string() }
  } else if pattern.starts_with('/') {
    format!("{prefix}{pattern}")
  } else {
    format!("{prefix}/{pattern}")
  }
}
