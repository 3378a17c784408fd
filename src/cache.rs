//! In-memory key/value mapping. Authoritative source for reads once a key
//! has been loaded, either by a `Set` or by hydration from disk.
//!
//! Not thread-safe on its own; the engine serializes access with its own
//! mutex before touching the cache.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<String, String>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_hits() {
        let mut c = Cache::new();
        c.set("k", "v");
        assert_eq!(c.get("k"), Some("v"));
    }

    #[test]
    fn get_miss_on_unknown_key() {
        let c = Cache::new();
        assert_eq!(c.get("missing"), None);
    }

    #[test]
    fn overwrite_keeps_latest_value() {
        let mut c = Cache::new();
        c.set("k", "1");
        c.set("k", "2");
        assert_eq!(c.get("k"), Some("2"));
    }

    #[test]
    fn delete_removes_the_key() {
        let mut c = Cache::new();
        c.set("k", "v");
        c.delete("k");
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn delete_of_unknown_key_is_a_no_op() {
        let mut c = Cache::new();
        c.delete("missing");
        assert_eq!(c.get("missing"), None);
    }
}
