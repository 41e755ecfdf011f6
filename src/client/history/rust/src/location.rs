/* src/client/history/rust/src/location.rs */

use std::fmt;

use storefront_router::RouterError;
use url::Url;

/// The part of a browser URL that history entries carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub pathname: String,
  /// Includes the leading `?`, or empty.
  pub search: String,
  /// Includes the leading `#`, or empty.
  pub hash: String,
}

impl Location {
  /// Parse an absolute URL or a path relative to the site root.
  pub fn parse(input: &str) -> Result<Self, RouterError> {
    let base = Url::parse("http://localhost/").map_err(|e| RouterError::InvalidRequest(e.to_string()))?;
    let url = base
      .join(input)
      .map_err(|e| RouterError::InvalidRequest(format!("invalid location '{input}': {e}")))?;
    Ok(Self {
      pathname: url.path().to_string(),
      search: url.query().filter(|q| !q.is_empty()).map(|q| format!("?{q}")).unwrap_or_default(),
      hash: url.fragment().filter(|f| !f.is_empty()).map(|f| format!("#{f}")).unwrap_or_default(),
    })
  }

  /// Path and query, the part the router dispatches on.
  pub fn url(&self) -> String {
    format!("{}{}", self.pathname, self.search)
  }

  pub fn href(&self) -> String {
    format!("{}{}{}", self.pathname, self.search, self.hash)
  }

  /// Same document, different fragment.
  pub fn is_hash_change_of(&self, previous: &Location) -> bool {
    self.pathname == previous.pathname && self.search == previous.search && self.hash != previous.hash
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.href())
  }
}
