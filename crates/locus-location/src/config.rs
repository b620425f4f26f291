//! The consume-at-most-once flag bag used by `configure` chains.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// A mutable bag of construction flags.
///
/// Constructors thread one bag through their whole `configure` chain;
/// each recognized flag is consumed (removed from further view) by
/// exactly one consumer, and whatever is left at the end lands in the
/// owning location's leftover-properties bag untouched.
///
/// # Example
///
/// ```
/// use locus_location::ConfigBag;
/// use serde_json::json;
///
/// let mut bag = ConfigBag::new();
/// bag.insert("displayName", json!("pool-a"));
/// bag.insert("customFlag", json!(7));
///
/// assert_eq!(bag.consume_str("displayName").as_deref(), Some("pool-a"));
/// // consumed at most once
/// assert_eq!(bag.consume_str("displayName"), None);
/// // unrecognized flags remain visible
/// assert_eq!(bag.unconsumed().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBag {
    values: BTreeMap<String, Value>,
    consumed: BTreeSet<String>,
}

impl ConfigBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag from a key→value map.
    #[must_use]
    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
            consumed: BTreeSet::new(),
        }
    }

    /// Creates a bag from string-valued arguments (spec args).
    #[must_use]
    pub fn from_string_map(values: &BTreeMap<String, String>) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            consumed: BTreeSet::new(),
        }
    }

    /// Inserts a flag. Re-inserting a consumed key makes it visible
    /// again.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.consumed.remove(&key);
        self.values.insert(key, value);
    }

    /// Merges every unconsumed entry of `other` into this bag.
    ///
    /// Entries already present keep this bag's value.
    pub fn merge_defaults(&mut self, other: &ConfigBag) {
        for (k, v) in other.unconsumed() {
            if !self.values.contains_key(k) {
                self.values.insert(k.clone(), v.clone());
            }
        }
    }

    /// Peeks at a flag without consuming it. Consumed flags are gone.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&Value> {
        if self.consumed.contains(key) {
            return None;
        }
        self.values.get(key)
    }

    /// True when the flag is present and not yet consumed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.peek(key).is_some()
    }

    /// Consumes a flag: returns its value and hides it from every
    /// later lookup.
    pub fn consume(&mut self, key: &str) -> Option<Value> {
        if self.consumed.contains(key) {
            return None;
        }
        let value = self.values.get(key).cloned()?;
        self.consumed.insert(key.to_string());
        Some(value)
    }

    /// Consumes a flag as a string.
    ///
    /// Non-string JSON values are rendered with their compact form.
    pub fn consume_str(&mut self, key: &str) -> Option<String> {
        self.consume(key).map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Consumes a flag as a boolean; accepts JSON booleans and the
    /// strings "true"/"false".
    pub fn consume_bool(&mut self, key: &str) -> Option<bool> {
        match self.consume(key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Consumes a flag as an unsigned integer; accepts JSON numbers and
    /// numeric strings.
    pub fn consume_u64(&mut self, key: &str) -> Option<u64> {
        match self.consume(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Consumes a flag as an f64.
    pub fn consume_f64(&mut self, key: &str) -> Option<f64> {
        match self.consume(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Iterates the flags that nothing has consumed yet.
    pub fn unconsumed(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values
            .iter()
            .filter(|(k, _)| !self.consumed.contains(*k))
    }

    /// Drains the unconsumed flags into an owned map, leaving the bag
    /// empty.
    #[must_use]
    pub fn into_unconsumed(mut self) -> BTreeMap<String, Value> {
        let consumed = std::mem::take(&mut self.consumed);
        self.values
            .into_iter()
            .filter(|(k, _)| !consumed.contains(k))
            .collect()
    }

    /// True when no unconsumed flags remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unconsumed().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consume_hides_the_flag() {
        let mut bag = ConfigBag::new();
        bag.insert("name", json!("x"));
        assert!(bag.contains("name"));
        assert_eq!(bag.consume_str("name").as_deref(), Some("x"));
        assert!(!bag.contains("name"));
        assert_eq!(bag.consume("name"), None);
    }

    #[test]
    fn leftovers_exclude_consumed() {
        let mut bag = ConfigBag::new();
        bag.insert("a", json!(1));
        bag.insert("b", json!(2));
        bag.consume("a");
        let left = bag.into_unconsumed();
        assert_eq!(left.len(), 1);
        assert_eq!(left["b"], json!(2));
    }

    #[test]
    fn reinsert_revives_a_consumed_key() {
        let mut bag = ConfigBag::new();
        bag.insert("a", json!(1));
        bag.consume("a");
        bag.insert("a", json!(2));
        assert_eq!(bag.consume_u64("a"), Some(2));
    }

    #[test]
    fn typed_consumers_coerce_strings() {
        let mut bag = ConfigBag::new();
        bag.insert("count", json!("3"));
        bag.insert("flag", json!("true"));
        assert_eq!(bag.consume_u64("count"), Some(3));
        assert_eq!(bag.consume_bool("flag"), Some(true));
    }

    #[test]
    fn merge_defaults_does_not_override() {
        let mut defaults = ConfigBag::new();
        defaults.insert("user", json!("fallback"));
        defaults.insert("port", json!(22));

        let mut bag = ConfigBag::new();
        bag.insert("user", json!("explicit"));
        bag.merge_defaults(&defaults);

        assert_eq!(bag.consume_str("user").as_deref(), Some("explicit"));
        assert_eq!(bag.consume_u64("port"), Some(22));
    }
}
