//! The schemaless event map that flows into the rule engine.
//!
//! Events are normalized security telemetry: string keys onto primitives,
//! nested objects, or arrays. We represent the payload with [`serde_json::Value`]
//! rather than inventing a parallel enum, since every sink and source in the
//! pipeline already speaks JSON on the wire.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized security event: a JSON object with arbitrarily nested
/// objects/arrays as values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Shallow lookup at the top level of the event, falling back to `default`.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.0.get(key).cloned().unwrap_or(default)
    }

    /// Breadth-first search for `key` anywhere in the nested structure,
    /// returning the first match. Uses an explicit work queue rather than
    /// recursion so deeply nested events can't blow the stack.
    pub fn first_match(&self, key: &str, default: Value) -> Value {
        let mut frontier: VecDeque<Frame<'_>> = VecDeque::new();
        frontier.push_back(Frame::Object(&self.0));

        while let Some(frame) = frontier.pop_front() {
            match frame {
                Frame::Object(obj) => {
                    if let Some(value) = obj.get(key) {
                        return value.clone();
                    }
                    for value in obj.values() {
                        if let Some(next) = Frame::from_value(value) {
                            frontier.push_back(next);
                        }
                    }
                }
                Frame::Array(arr) => {
                    for value in arr {
                        if let Some(next) = Frame::from_value(value) {
                            frontier.push_back(next);
                        }
                    }
                }
            }
        }
        default
    }

    /// Walk a dotted path of object keys; returns `default` as soon as a
    /// segment is missing or a non-object is encountered mid-path.
    pub fn deep_get(&self, path: &[&str], default: Value) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return default;
        };
        let Some(mut current) = self.0.get(*first) else {
            return default;
        };
        for segment in rest {
            match current.as_object().and_then(|o| o.get(*segment)) {
                Some(next) => current = next,
                None => return default,
            }
        }
        current.clone()
    }

    /// Recursively drop `ignored_keys` at every nesting level, returning a
    /// new event. Idempotent: `clean(k).clean(k) == clean(k)`.
    pub fn clean(&self, ignored_keys: &[String]) -> Event {
        Event(clean_map(&self.0, ignored_keys))
    }

    /// Recursive structural diff against `common`: a key survives in the
    /// result if it's absent from `common`, not structurally equal to it,
    /// or (for nested objects) has a non-empty nested diff.
    pub fn diff(&self, common: &Map<String, Value>) -> Map<String, Value> {
        diff_map(&self.0, common)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

enum Frame<'a> {
    Object(&'a Map<String, Value>),
    Array(&'a Vec<Value>),
}

impl<'a> Frame<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Frame::Object(obj)),
            Value::Array(arr) => Some(Frame::Array(arr)),
            _ => None,
        }
    }
}

fn clean_map(map: &Map<String, Value>, ignored_keys: &[String]) -> Map<String, Value> {
    let mut result = Map::new();
    for (key, value) in map {
        if ignored_keys.iter().any(|k| k == key) {
            continue;
        }
        let cleaned = match value {
            Value::Object(nested) => Value::Object(clean_map(nested, ignored_keys)),
            other => other.clone(),
        };
        result.insert(key.clone(), cleaned);
    }
    result
}

fn diff_map(map: &Map<String, Value>, common: &Map<String, Value>) -> Map<String, Value> {
    let mut diff = Map::new();
    for (key, value) in map {
        match common.get(key) {
            Some(common_value) if common_value == value => continue,
            Some(Value::Object(common_nested)) => {
                if let Value::Object(nested) = value {
                    let nested_diff = diff_map(nested, common_nested);
                    if !nested_diff.is_empty() {
                        diff.insert(key.clone(), Value::Object(nested_diff));
                    }
                } else {
                    diff.insert(key.clone(), value.clone());
                }
            }
            _ => {
                diff.insert(key.clone(), value.clone());
            }
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(json: Value) -> Event {
        Event::from_map(json.as_object().unwrap().clone())
    }

    #[test]
    fn first_match_finds_nested_key() {
        let e = event(json!({
            "a": {"b": {"user": "alice"}},
            "c": [{"user": "bob"}],
        }));
        // BFS: top-level has no "user", descends into "a" then "c" in
        // insertion order, and "a.b.user" is found before "c[0].user".
        assert_eq!(e.first_match("user", json!(null)), json!("alice"));
    }

    #[test]
    fn first_match_missing_returns_default() {
        let e = event(json!({"a": 1}));
        assert_eq!(e.first_match("missing", json!("fallback")), json!("fallback"));
    }

    #[test]
    fn deep_get_walks_path() {
        let e = event(json!({"a": {"b": {"c": 42}}}));
        assert_eq!(e.deep_get(&["a", "b", "c"], json!(null)), json!(42));
        assert_eq!(e.deep_get(&["a", "x"], json!("nope")), json!("nope"));
    }

    #[test]
    fn clean_drops_keys_recursively() {
        let e = event(json!({
            "keep": 1,
            "drop": 2,
            "nested": {"keep": 3, "drop": 4},
        }));
        let cleaned = e.clean(&["drop".to_string()]);
        assert_eq!(
            cleaned,
            event(json!({"keep": 1, "nested": {"keep": 3}}))
        );
    }

    #[test]
    fn clean_is_idempotent() {
        let e = event(json!({"keep": 1, "drop": {"drop": 2}}));
        let ignored = vec!["drop".to_string()];
        let once = e.clean(&ignored);
        let twice = once.clean(&ignored);
        assert_eq!(once, twice);
    }

    #[test]
    fn diff_reports_changed_and_new_keys() {
        let common = event(json!({"user": "u", "a": 1})).into_map();
        let e1 = event(json!({"user": "u", "a": 1}));
        let e2 = event(json!({"user": "u", "a": 2}));
        assert!(e1.diff(&common).is_empty());
        assert_eq!(e2.diff(&common), json!({"a": 2}).as_object().unwrap().clone());
    }

    #[test]
    fn diff_recurses_into_nested_objects() {
        let common = event(json!({"meta": {"x": 1, "y": 1}})).into_map();
        let e = event(json!({"meta": {"x": 1, "y": 2}}));
        let diff = e.diff(&common);
        assert_eq!(diff, json!({"meta": {"y": 2}}).as_object().unwrap().clone());
    }
}
