//! Ordered, case-insensitive keyed multimaps backing rule variables.

use indexmap::IndexMap;
use regex::Regex;

/// A keyed string multimap with chronological iteration.
///
/// Entries live in a flat list in the exact order they were added, so
/// repeated keys interleave the way the request interleaved them; rules
/// depend on that order for which pair matches first. A case-insensitive
/// index over the list serves keyed lookup; the spelling of each insert is
/// preserved for reporting.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    entries: Vec<Entry>,
    /// Lowercased key -> positions in `entries`, keyed in first-appearance
    /// order.
    index: IndexMap<String, Vec<usize>>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// Key with original casing.
    key: String,
    value: String,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a key, keeping earlier values.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let lower = key.to_ascii_lowercase();
        self.entries.push(Entry {
            key,
            value: value.into(),
        });
        self.index
            .entry(lower)
            .or_default()
            .push(self.entries.len() - 1);
    }

    /// Replace all values under a key with a single value, appended at the
    /// end of the insertion order.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove(&key);
        self.add(key, value);
    }

    /// Remove a key and its values.
    pub fn remove(&mut self, key: &str) {
        let lower = key.to_ascii_lowercase();
        if self.index.shift_remove(&lower).is_some() {
            self.entries.retain(|e| !e.key.eq_ignore_ascii_case(key));
            self.rebuild_index();
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index
                .entry(entry.key.to_ascii_lowercase())
                .or_default()
                .push(i);
        }
    }

    /// Values stored under a key, oldest first.
    pub fn get(&self, key: &str) -> Option<Vec<&str>> {
        self.index
            .get(&key.to_ascii_lowercase())
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| self.entries[i].value.as_str())
                    .collect()
            })
    }

    /// Get the first value under a key.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.index
            .get(&key.to_ascii_lowercase())
            .and_then(|positions| positions.first())
            .map(|&i| self.entries[i].value.as_str())
    }

    /// Interpret the first value under a key as an integer, defaulting to 0.
    pub fn get_int(&self, key: &str) -> i64 {
        self.first(key).and_then(|s| s.parse().ok()).unwrap_or(0)
    }

    /// Add a signed delta to the integer value under a key.
    pub fn increment(&mut self, key: &str, delta: i64) {
        let current = self.get_int(key);
        self.set(key.to_string(), (current + delta).to_string());
    }

    /// Iterate all (key, value) pairs in true insertion order: repeated
    /// keys appear at the positions they were added, not grouped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    /// Iterate distinct keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index
            .values()
            .filter_map(|positions| positions.first())
            .map(|&i| self.entries[i].key.as_str())
    }

    /// Iterate (key, value) pairs whose key matches a compiled regex, in
    /// insertion order.
    pub fn iter_regex<'a>(&'a self, pattern: &'a Regex) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .iter()
            .filter(move |e| pattern.is_match(&e.key))
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of stored values.
    pub fn value_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Combined byte length of every stored key and value occurrence.
    pub fn combined_size(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.key.len() + e.value.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut c = Collection::new();
        c.add("Content-Type", "text/html");
        assert_eq!(c.first("content-type"), Some("text/html"));
        assert_eq!(c.first("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn test_iteration_is_chronological() {
        let mut c = Collection::new();
        c.add("b", "1");
        c.add("a", "2");
        c.add("b", "3");
        let pairs: Vec<_> = c.iter().collect();
        // Repeated keys interleave; they are not grouped at the key's
        // first appearance.
        assert_eq!(pairs, vec![("b", "1"), ("a", "2"), ("b", "3")]);
    }

    #[test]
    fn test_get_preserves_value_order_across_interleaving() {
        let mut c = Collection::new();
        c.add("x", "safe");
        c.add("y", "X");
        c.add("x", "X");
        assert_eq!(c.get("x"), Some(vec!["safe", "X"]));
        assert_eq!(c.get("y"), Some(vec!["X"]));
        assert_eq!(c.get("z"), None);
    }

    #[test]
    fn test_original_key_spelling_kept() {
        let mut c = Collection::new();
        c.add("X-Forwarded-For", "10.0.0.1");
        let keys: Vec<_> = c.keys().collect();
        assert_eq!(keys, vec!["X-Forwarded-For"]);
    }

    #[test]
    fn test_keys_first_appearance_order() {
        let mut c = Collection::new();
        c.add("b", "1");
        c.add("a", "2");
        c.add("b", "3");
        let keys: Vec<_> = c.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_set_replaces_values() {
        let mut c = Collection::new();
        c.add("score", "1");
        c.add("score", "2");
        c.set("score", "9");
        assert_eq!(c.get("score"), Some(vec!["9"]));
        assert_eq!(c.value_count(), 1);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut c = Collection::new();
        c.add("a", "1");
        c.add("b", "2");
        c.add("a", "3");
        c.remove("a");
        assert_eq!(c.get("a"), None);
        assert_eq!(c.first("b"), Some("2"));
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![("b", "2")]);
    }

    #[test]
    fn test_increment() {
        let mut c = Collection::new();
        c.increment("n", 5);
        c.increment("n", -2);
        assert_eq!(c.get_int("n"), 3);
        // Non-numeric values count as zero.
        c.set("n", "abc");
        c.increment("n", 4);
        assert_eq!(c.get_int("n"), 4);
    }

    #[test]
    fn test_regex_iteration() {
        let mut c = Collection::new();
        c.add("user_id", "7");
        c.add("token", "x");
        c.add("user_name", "ada");
        let re = Regex::new("^user").unwrap();
        let pairs: Vec<_> = c.iter_regex(&re).collect();
        assert_eq!(pairs, vec![("user_id", "7"), ("user_name", "ada")]);
    }

    #[test]
    fn test_counts() {
        let mut c = Collection::new();
        c.add("a", "1");
        c.add("a", "2");
        c.add("b", "3");
        assert_eq!(c.key_count(), 2);
        assert_eq!(c.value_count(), 3);
    }
}
