// src/services/response_cache.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::common::clock::Clock;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    stored_at: DateTime<Utc>,
}

// Cache de respostas do SaaS, chaves no formato `<módulo>:<resto>`.
// Os webhooks invalidam por módulo. Última escrita vence.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

pub fn cache_key(module: &str, rest: &str) -> String {
    format!("{}:{}", module.trim().to_lowercase(), rest)
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, clock }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.value.clone())
    }

    // Cada escrita também descarta o que já venceu
    pub async fn put(&self, key: String, value: Value) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| stored_at - entry.stored_at < self.ttl);
        entries.insert(key, Entry { value, stored_at });
    }

    /// Remove todas as chaves do módulo; devolve quantas saíram.
    pub async fn invalidate_module(&self, module: &str) -> usize {
        let prefix = cache_key(module, "");
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::clock::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;

    fn cache() -> (ResponseCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        (ResponseCache::new(Duration::minutes(5), Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (cache, clock) = cache();
        cache.put(cache_key("estimates", "E1:comments"), json!([1])).await;
        assert_eq!(cache.get("estimates:E1:comments").await, Some(json!([1])));

        clock.advance(Duration::minutes(5));
        assert_eq!(cache.get("estimates:E1:comments").await, None);
    }

    #[tokio::test]
    async fn put_evicts_expired_entries() {
        let (cache, clock) = cache();
        cache.put(cache_key("estimates", "E1"), json!(1)).await;
        clock.advance(Duration::minutes(3));
        cache.put(cache_key("estimates", "E2"), json!(2)).await;
        clock.advance(Duration::minutes(3));
        cache.put(cache_key("invoices", "I1"), json!(3)).await;

        let entries = cache.entries.read().await;
        assert!(!entries.contains_key("estimates:E1"));
        assert!(entries.contains_key("estimates:E2"));
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn invalidation_is_scoped_to_module() {
        let (cache, _clock) = cache();
        cache.put(cache_key("estimates", "E1"), json!(1)).await;
        cache.put(cache_key("estimates", "E2"), json!(2)).await;
        cache.put(cache_key("invoices", "I1"), json!(3)).await;

        assert_eq!(cache.invalidate_module("Estimates").await, 2);
        assert_eq!(cache.get("invoices:I1").await, Some(json!(3)));
        assert_eq!(cache.get("estimates:E1").await, None);
    }
}
