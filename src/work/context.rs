//! # Call-scoped context.
//!
//! [`CallContext`] travels with a submission and is handed to its computation
//! (and, for diverted items, is readable by the fallback handler). It carries an
//! optional operation key and an ordered string key/value bag.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Call-scoped key/value bag.
///
/// Keys are iterated in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
    operation_key: Option<Arc<str>>,
    entries: BTreeMap<String, String>,
}

impl CallContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty context tagged with an operation key.
    pub fn for_operation(key: impl Into<Arc<str>>) -> Self {
        Self {
            operation_key: Some(key.into()),
            entries: BTreeMap::new(),
        }
    }

    /// Returns a new context with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn operation_key(&self) -> Option<&str> {
        self.operation_key.as_deref()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_iterate_in_key_order() {
        let ctx = CallContext::for_operation("charge")
            .with("tenant", "acme")
            .with("attempt", "1")
            .with("region", "eu");

        let keys: Vec<_> = ctx.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["attempt", "region", "tenant"]);
        assert_eq!(ctx.operation_key(), Some("charge"));
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn insert_replaces_and_reports_previous() {
        let mut ctx = CallContext::new();
        assert_eq!(ctx.insert("k", "a"), None);
        assert_eq!(ctx.insert("k", "b"), Some("a".to_string()));
        assert_eq!(ctx.get("k"), Some("b"));
        assert_eq!(ctx.remove("k"), Some("b".to_string()));
        assert!(ctx.is_empty());
    }
}
