/* src/server/core/rust/src/errors.rs */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
  #[error("{message}")]
  Handler { message: String, stack: Option<String> },

  /// A response arrived after a newer request was issued. Never user-visible.
  #[error("stale response: request #{issued} was superseded by #{latest}")]
  StaleResponse { issued: u64, latest: u64 },

  #[error("cannot cache {method} {path}: only GET requests are cacheable")]
  CachePolicyViolation { method: String, path: String },

  #[error("failed to write history state: {0}")]
  HistoryWrite(String),

  #[error("invalid route pattern '{pattern}': {reason}")]
  InvalidPattern { pattern: String, reason: String },

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("upstream request failed: {0}")]
  Upstream(String),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("serialization failed: {0}")]
  Serialization(String),
}

impl RouterError {
  pub fn handler(message: impl Into<String>) -> Self {
    Self::Handler { message: message.into(), stack: None }
  }

  pub fn handler_with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
    Self::Handler { message: message.into(), stack: Some(stack.into()) }
  }

  pub fn upstream(message: impl Into<String>) -> Self {
    Self::Upstream(message.into())
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Handler { .. } => "HANDLER_ERROR",
      Self::StaleResponse { .. } => "STALE_RESPONSE",
      Self::CachePolicyViolation { .. } => "CACHE_POLICY_VIOLATION",
      Self::HistoryWrite(_) => "HISTORY_WRITE_FAILED",
      Self::InvalidPattern { .. } => "INVALID_PATTERN",
      Self::InvalidRequest(_) => "INVALID_REQUEST",
      Self::Upstream(_) => "UPSTREAM_ERROR",
      Self::Config(_) => "CONFIG_ERROR",
      Self::Serialization(_) => "SERIALIZATION_ERROR",
    }
  }

  pub fn status(&self) -> u16 {
    match self {
      Self::InvalidRequest(_) => 400,
      Self::CachePolicyViolation { .. } => 405,
      Self::Upstream(_) => 502,
      _ => 500,
    }
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, Self::StaleResponse { .. })
  }

  /// Diagnostic trace attached to the error, falling back to its debug form.
  pub fn stack(&self) -> String {
    match self {
      Self::Handler { stack: Some(stack), .. } => stack.clone(),
      other => format!("{}: {other:?}", other.code()),
    }
  }
}

impl From<serde_json::Error> for RouterError {
  fn from(err: serde_json::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}
