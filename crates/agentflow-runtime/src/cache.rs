//! Flow-scoped output cache.
//!
//! The runtime looks up outputs of cacheable executors before invoking them.
//! What is worth caching and when entries expire is up to the provider.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait CacheProvider: Send + Sync {
  async fn get(&self, flow_id: &str, key: &str) -> Option<serde_json::Value>;

  async fn set(&self, flow_id: &str, key: &str, value: serde_json::Value);
}

/// In-memory cache provider.
///
/// Suitable for a single process or testing.
#[derive(Debug, Default)]
pub struct InMemoryCache {
  entries: RwLock<HashMap<String, HashMap<String, serde_json::Value>>>,
}

impl InMemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self, flow_id: &str) -> usize {
    self
      .entries
      .read()
      .await
      .get(flow_id)
      .map_or(0, |entries| entries.len())
  }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
  async fn get(&self, flow_id: &str, key: &str) -> Option<serde_json::Value> {
    self
      .entries
      .read()
      .await
      .get(flow_id)
      .and_then(|entries| entries.get(key))
      .cloned()
  }

  async fn set(&self, flow_id: &str, key: &str, value: serde_json::Value) {
    self
      .entries
      .write()
      .await
      .entry(flow_id.to_string())
      .or_default()
      .insert(key.to_string(), value);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_in_memory_cache() {
    let cache = InMemoryCache::new();

    assert_eq!(cache.get("flow", "key").await, None);

    cache.set("flow", "key", json!("value")).await;
    assert_eq!(cache.get("flow", "key").await, Some(json!("value")));
    assert_eq!(cache.get("other", "key").await, None);

    cache.set("flow", "key", json!("updated")).await;
    assert_eq!(cache.get("flow", "key").await, Some(json!("updated")));
    assert_eq!(cache.len("flow").await, 1);
    assert_eq!(cache.len("other").await, 0);
  }
}
