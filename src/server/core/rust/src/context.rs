/* src/server/core/rust/src/context.rs */

/// Where a dispatch executes. Always passed explicitly, never read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeContext {
  Server,
  Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
  pub context: RuntimeContext,
  /// Client hydration of a server-rendered page: the loading preamble is skipped.
  pub initial_load: bool,
}

impl DispatchOptions {
  pub fn server() -> Self {
    Self { context: RuntimeContext::Server, initial_load: false }
  }

  /// Client-side navigation after the first render.
  pub fn client() -> Self {
    Self { context: RuntimeContext::Client, initial_load: false }
  }

  pub fn hydration() -> Self {
    Self { context: RuntimeContext::Client, initial_load: true }
  }

  pub fn is_server(self) -> bool {
    self.context == RuntimeContext::Server
  }
}
