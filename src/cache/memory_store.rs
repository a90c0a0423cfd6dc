use super::{CacheError, CacheResult, KeyValueStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local store with Redis-like expiry semantics.
///
/// Used when `REDIS_URL` is not configured and in tests. Expired entries are
/// dropped lazily on access.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => entry,
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                return Ok(1);
            }
        };

        let next = entry
            .value
            .parse::<i64>()
            .map_err(|_| CacheError::NotAnInteger(key.to_string()))?
            + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn evict(&self, key: &str) -> CacheResult<bool> {
        let removed = self.entries.lock().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(Instant::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_none_after_ttl() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(30))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_starts_at_one_and_restarts_after_expiry() {
        let store = InMemoryStore::new();
        assert_eq!(store.increment("counter").await.unwrap(), 1);
        assert_eq!(store.increment("counter").await.unwrap(), 2);

        store
            .expire("counter", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.increment("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_rejects_non_integer_value() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "not-a-number", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(matches!(
            store.increment("k").await,
            Err(CacheError::NotAnInteger(_))
        ));
    }

    #[tokio::test]
    async fn test_evict_removes_key() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(store.evict("k").await.unwrap());
        assert!(!store.contains_key("k").await);

        // Only the first eviction reports a removal
        assert!(!store.evict("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_evict_of_expired_key_reports_nothing_removed() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!store.evict("k").await.unwrap());
    }
}
