/* src/server/core/rust/src/fetch.rs */

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::errors::RouterError;
use crate::handler::BoxFuture;

/// Client transport used by `fromServer` handlers to reach the server.
pub trait ServerTransport: Send + Sync {
  fn fetch_json(&self, url: &str) -> BoxFuture<Result<Value, RouterError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

impl FetchTicket {
  pub fn id(self) -> u64 {
    self.0
  }
}

/// Last-request-wins discipline for data fetches.
///
/// Every request takes a ticket; a response whose ticket is no longer the
/// latest resolves to `RouterError::StaleResponse` instead of its data.
#[derive(Debug, Default)]
pub struct FetchSequencer {
  latest: AtomicU64,
}

impl FetchSequencer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn issue(&self) -> FetchTicket {
    FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
  }

  pub fn latest(&self) -> u64 {
    self.latest.load(Ordering::SeqCst)
  }

  pub fn is_current(&self, ticket: FetchTicket) -> bool {
    ticket.0 == self.latest()
  }

  pub fn settle<T>(
    &self,
    ticket: FetchTicket,
    result: Result<T, RouterError>,
  ) -> Result<T, RouterError> {
    let latest = self.latest();
    if ticket.0 != latest {
      debug!(issued = ticket.0, latest, "discarding stale response");
      return Err(RouterError::StaleResponse { issued: ticket.0, latest });
    }
    result
  }

  /// Tag `fut` with a ticket now (not on first poll) and settle its output.
  pub fn fetch_latest<'a, F, T>(&'a self, fut: F) -> impl Future<Output = Result<T, RouterError>> + 'a
  where
    F: Future<Output = Result<T, RouterError>> + 'a,
    T: 'a,
  {
    let ticket = self.issue();
    async move {
      let result = fut.await;
      self.settle(ticket, result)
    }
  }
}
