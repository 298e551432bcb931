//! Persistent collections (IP, SESSION, USER, GLOBAL, RESOURCE).
//!
//! These outlive transactions. The store serializes mutation per entry and
//! supports atomic increment so counters work without read-modify-write
//! races across concurrent transactions.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A keyed store for cross-transaction collections.
///
/// `collection` is the collection name (lowercased), `key` the instance
/// selected by initcol/setsid/setuid (e.g. the client address for IP).
pub trait PersistentStore: Send + Sync {
    /// Read one variable.
    fn get(&self, collection: &str, key: &str, var: &str) -> Option<String>;

    /// Write one variable.
    fn set(&self, collection: &str, key: &str, var: &str, value: &str);

    /// Atomically add a delta, returning the new value.
    fn inc(&self, collection: &str, key: &str, var: &str, delta: i64) -> i64;

    /// Remove one variable.
    fn remove(&self, collection: &str, key: &str, var: &str);

    /// Set a TTL after which the variable disappears.
    fn expire(&self, collection: &str, key: &str, var: &str, ttl: Duration);

    /// Snapshot all live variables of one collection instance.
    fn all(&self, collection: &str, key: &str) -> Vec<(String, String)>;
}

#[derive(Clone)]
struct StoredValue {
    value: String,
    deadline: Option<Instant>,
}

impl StoredValue {
    fn live(&self) -> bool {
        self.deadline.map_or(true, |d| Instant::now() < d)
    }
}

/// In-memory default store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn entry_key(collection: &str, key: &str) -> (String, String) {
    (collection.to_ascii_lowercase(), key.to_string())
}

impl PersistentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str, var: &str) -> Option<String> {
        let entries = self.entries.lock().expect("store lock");
        entries
            .get(&entry_key(collection, key))
            .and_then(|vars| vars.get(var))
            .filter(|v| v.live())
            .map(|v| v.value.clone())
    }

    fn set(&self, collection: &str, key: &str, var: &str, value: &str) {
        let mut entries = self.entries.lock().expect("store lock");
        entries
            .entry(entry_key(collection, key))
            .or_default()
            .insert(
                var.to_string(),
                StoredValue {
                    value: value.to_string(),
                    deadline: None,
                },
            );
    }

    fn inc(&self, collection: &str, key: &str, var: &str, delta: i64) -> i64 {
        let mut entries = self.entries.lock().expect("store lock");
        let vars = entries.entry(entry_key(collection, key)).or_default();
        let current = vars
            .get(var)
            .filter(|v| v.live())
            .and_then(|v| v.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + delta;
        vars.insert(
            var.to_string(),
            StoredValue {
                value: next.to_string(),
                deadline: None,
            },
        );
        next
    }

    fn remove(&self, collection: &str, key: &str, var: &str) {
        let mut entries = self.entries.lock().expect("store lock");
        if let Some(vars) = entries.get_mut(&entry_key(collection, key)) {
            vars.remove(var);
        }
    }

    fn expire(&self, collection: &str, key: &str, var: &str, ttl: Duration) {
        let mut entries = self.entries.lock().expect("store lock");
        if let Some(stored) = entries
            .get_mut(&entry_key(collection, key))
            .and_then(|vars| vars.get_mut(var))
        {
            stored.deadline = Some(Instant::now() + ttl);
        }
    }

    fn all(&self, collection: &str, key: &str) -> Vec<(String, String)> {
        let entries = self.entries.lock().expect("store lock");
        entries
            .get(&entry_key(collection, key))
            .map(|vars| {
                let mut pairs: Vec<(String, String)> = vars
                    .iter()
                    .filter(|(_, v)| v.live())
                    .map(|(k, v)| (k.clone(), v.value.clone()))
                    .collect();
                pairs.sort();
                pairs
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("ip", "10.0.0.1", "block"), None);
        store.set("ip", "10.0.0.1", "block", "1");
        assert_eq!(store.get("ip", "10.0.0.1", "block"), Some("1".to_string()));
        // Other instances stay independent.
        assert_eq!(store.get("ip", "10.0.0.2", "block"), None);
    }

    #[test]
    fn test_atomic_increment() {
        let store = MemoryStore::new();
        assert_eq!(store.inc("ip", "k", "hits", 1), 1);
        assert_eq!(store.inc("ip", "k", "hits", 4), 5);
        assert_eq!(store.get("ip", "k", "hits"), Some("5".to_string()));
    }

    #[test]
    fn test_expire() {
        let store = MemoryStore::new();
        store.set("session", "s1", "token", "abc");
        store.expire("session", "s1", "token", Duration::from_secs(0));
        // Zero TTL means immediately dead.
        assert_eq!(store.get("session", "s1", "token"), None);
        assert!(store.all("session", "s1").is_empty());
    }

    #[test]
    fn test_remove_and_all() {
        let store = MemoryStore::new();
        store.set("global", "global", "a", "1");
        store.set("global", "global", "b", "2");
        store.remove("global", "global", "a");
        assert_eq!(
            store.all("global", "global"),
            vec![("b".to_string(), "2".to_string())]
        );
    }
}
