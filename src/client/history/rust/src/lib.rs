/* src/client/history/rust/src/lib.rs */

pub mod bridge;
pub mod history;
pub mod location;
pub mod persist;
pub mod state;

pub use bridge::{BridgeBuilder, Navigation, NavigationBridge, NavigationCallback};
pub use history::{Action, DEFAULT_MAX_STATE_BYTES, History, HistoryEntry, SharedHistory};
pub use location::Location;
pub use persist::{HistoryPersister, persist_now};
pub use state::StateTree;
