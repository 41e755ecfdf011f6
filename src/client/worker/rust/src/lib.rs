/* src/client/worker/rust/src/lib.rs */

pub mod client;
pub mod message;
pub mod patch_cache;
pub mod prefetch;
pub mod storage;
pub mod worker;

pub use client::ServiceWorkerClient;
pub use message::{RuntimeCachingOptions, WorkerMessage};
pub use patch_cache::StoragePatchCache;
pub use prefetch::{PrefetchQueue, PrefetchTarget};
pub use storage::{CacheStorage, RUNTIME_CACHE};
pub use worker::{Fetcher, ServiceWorker};
