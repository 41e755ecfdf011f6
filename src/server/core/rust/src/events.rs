/* src/server/core/rust/src/events.rs */

use std::sync::Arc;

use crate::errors::RouterError;

/// Notifications for loading indicators, analytics and error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
  /// A navigation is about to dispatch.
  Before { path: String },
  /// A navigation's dispatch has fully settled.
  After { path: String },
  /// A `fromServer` handler is about to go to the network.
  Fetch { path: String },
  Error { path: String, message: String },
}

/// External error reporter, invoked for every handler error caught during dispatch.
pub type ErrorReporter = Arc<dyn Fn(&RouterError) + Send + Sync>;

pub(crate) const EVENT_CAPACITY: usize = 64;
