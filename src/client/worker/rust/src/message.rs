/* src/client/worker/rust/src/message.rs */

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages posted from the page to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum WorkerMessage {
  CachePath {
    path: String,
    #[serde(rename = "apiVersion")]
    api_version: String,
  },
  CacheState {
    path: String,
    #[serde(rename = "cacheData")]
    cache_data: Value,
    #[serde(rename = "apiVersion")]
    api_version: String,
  },
  AbortPrefetches,
  ResumePrefetches,
  ConfigureRuntimeCaching {
    options: RuntimeCachingOptions,
  },
  RemoveOldCaches {
    #[serde(rename = "apiVersion")]
    api_version: String,
  },
}

impl WorkerMessage {
  pub fn action(&self) -> &'static str {
    match self {
      Self::CachePath { .. } => "cache-path",
      Self::CacheState { .. } => "cache-state",
      Self::AbortPrefetches => "abort-prefetches",
      Self::ResumePrefetches => "resume-prefetches",
      Self::ConfigureRuntimeCaching { .. } => "configure-runtime-caching",
      Self::RemoveOldCaches { .. } => "remove-old-caches",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCachingOptions {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_entries: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_age_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn wire(message: &WorkerMessage) -> Value {
    serde_json::to_value(message).unwrap()
  }

  #[test]
  fn wire_format() {
    assert_eq!(
      wire(&WorkerMessage::CachePath { path: "/p/1.json".into(), api_version: "v1".into() }),
      json!({ "action": "cache-path", "path": "/p/1.json", "apiVersion": "v1" })
    );
    assert_eq!(
      wire(&WorkerMessage::CacheState {
        path: "/p/1.json".into(),
        cache_data: json!({ "product": {} }),
        api_version: "v1".into(),
      }),
      json!({ "action": "cache-state", "path": "/p/1.json", "cacheData": { "product": {} }, "apiVersion": "v1" })
    );
    assert_eq!(wire(&WorkerMessage::AbortPrefetches), json!({ "action": "abort-prefetches" }));
    assert_eq!(wire(&WorkerMessage::ResumePrefetches), json!({ "action": "resume-prefetches" }));
    assert_eq!(
      wire(&WorkerMessage::ConfigureRuntimeCaching {
        options: RuntimeCachingOptions { max_entries: Some(200), max_age_seconds: None },
      }),
      json!({ "action": "configure-runtime-caching", "options": { "maxEntries": 200 } })
    );
    assert_eq!(
      wire(&WorkerMessage::RemoveOldCaches { api_version: "v2".into() }),
      json!({ "action": "remove-old-caches", "apiVersion": "v2" })
    );
  }

  #[test]
  fn parses_page_messages() {
    let raw = r#"{"action":"configure-runtime-caching","options":{"maxEntries":5,"maxAgeSeconds":60}}"#;
    let message: WorkerMessage = serde_json::from_str(raw).unwrap();
    assert_eq!(
      message,
      WorkerMessage::ConfigureRuntimeCaching {
        options: RuntimeCachingOptions { max_entries: Some(5), max_age_seconds: Some(60) },
      }
    );
    assert_eq!(message.action(), "configure-runtime-caching");
  }

  #[test]
  fn unknown_action_is_rejected() {
    assert!(serde_json::from_str::<WorkerMessage>(r#"{"action":"skip-waiting"}"#).is_err());
  }
}
