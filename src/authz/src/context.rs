//! Per-call evaluation context
//!
//! A [`PermissionContext`] is built by the calling layer from the current
//! request, user and environment. Values form a closed union
//! ([`ContextValue`]); field lookup by dot-path stays dynamic while every
//! comparison over the resolved values is statically typed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed context value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    /// All numbers are IEEE-754 doubles. Integers are exact only up to
    /// 2^53; larger ids (e.g. 9007199254740993) round to a neighbour and
    /// may compare equal under `equals`/`in`. Pass such ids as strings.
    Number(f64),
    String(String),
    Sequence(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Loose string rendering used by the string operators
    pub fn coerce_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Self::Null => String::new(),
                    other => other.coerce_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Numeric interpretation used by the ordering operators
    ///
    /// Returns `None` when the value has no sensible numeric reading.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ContextValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Feed a type-tagged, key-ordered encoding into `hasher`
    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        match self {
            Self::Null => {
                hasher.update(b"n");
            }
            Self::Bool(b) => {
                hasher.update(if *b { b"t" } else { b"f" });
            }
            Self::Number(n) => {
                hasher.update(b"d");
                // -0.0 and 0.0 compare equal, so they must share a key
                let n = if *n == 0.0 { 0.0 } else { *n };
                hasher.update(&n.to_bits().to_le_bytes());
            }
            Self::String(s) => {
                hasher.update(b"s");
                hash_str(hasher, s);
            }
            Self::Sequence(items) => {
                hasher.update(b"[");
                hasher.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.hash_into(hasher);
                }
            }
            Self::Map(map) => {
                hasher.update(b"{");
                hasher.update(&(map.len() as u64).to_le_bytes());
                for (key, value) in map {
                    hash_str(hasher, key);
                    value.hash_into(hasher);
                }
            }
        }
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<PermissionContext> for ContextValue {
    fn from(context: PermissionContext) -> Self {
        Self::Map(context.0)
    }
}

/// Arbitrary nested key-value structure supplied per `check()` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionContext(BTreeMap<String, ContextValue>);

impl PermissionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Resolve a dot-path such as `user.role`
    ///
    /// Stops at the first missing segment and returns `None` ("undefined").
    /// Numeric segments index into sequences.
    pub fn lookup(&self, path: &str) -> Option<&ContextValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;

        for segment in segments {
            current = match current {
                ContextValue::Map(map) => map.get(segment)?,
                ContextValue::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&(self.0.len() as u64).to_le_bytes());
        for (key, value) in &self.0 {
            hash_str(hasher, key);
            value.hash_into(hasher);
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for PermissionContext {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, ContextValue::from(v))).collect())
    }
}

impl FromIterator<(String, ContextValue)> for PermissionContext {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_precision_limit() {
        let max_exact = 9_007_199_254_740_991i64; // 2^53 - 1
        assert_ne!(ContextValue::from(max_exact), ContextValue::from(max_exact - 1));

        // Beyond 2^53 neighbouring integers collapse
        let big: ContextValue = json!(9_007_199_254_740_993u64).into();
        assert_eq!(big, ContextValue::Number(9_007_199_254_740_992.0));

        // Strings keep large ids distinct
        assert_ne!(
            ContextValue::from("9007199254740993"),
            ContextValue::from("9007199254740992")
        );
    }

    fn sample() -> PermissionContext {
        let json = json!({
            "user": { "role": "user", "plan": { "tier": 3 } },
            "tags": ["a", "b"],
        });
        match json {
            serde_json::Value::Object(map) => PermissionContext::from(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_lookup_nested_path() {
        let ctx = sample();
        assert_eq!(ctx.lookup("user.role"), Some(&ContextValue::from("user")));
        assert_eq!(ctx.lookup("user.plan.tier"), Some(&ContextValue::Number(3.0)));
        assert_eq!(ctx.lookup("tags.1"), Some(&ContextValue::from("b")));
    }

    #[test]
    fn test_lookup_short_circuits_on_missing_segment() {
        let ctx = sample();
        assert!(ctx.lookup("user.missing.deeper").is_none());
        assert!(ctx.lookup("nothing").is_none());
        assert!(ctx.lookup("user.role.length").is_none());
    }

    #[test]
    fn test_deserialize_untagged_values() {
        let ctx: PermissionContext =
            serde_json::from_str(r#"{"n": 1, "s": "x", "b": true, "z": null, "l": [1, "a"]}"#)
                .unwrap();
        assert_eq!(ctx.lookup("n"), Some(&ContextValue::Number(1.0)));
        assert_eq!(ctx.lookup("b"), Some(&ContextValue::Bool(true)));
        assert_eq!(ctx.lookup("z"), Some(&ContextValue::Null));
        assert_eq!(ctx.len(), 5);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(ContextValue::Number(42.0).coerce_string(), "42");
        assert_eq!(ContextValue::Number(1.5).coerce_string(), "1.5");
        assert_eq!(ContextValue::from(vec!["a", "b"]).coerce_string(), "a,b");
        assert_eq!(ContextValue::from(" 12 ").coerce_number(), Some(12.0));
        assert_eq!(ContextValue::Bool(true).coerce_number(), Some(1.0));
        assert_eq!(ContextValue::from("abc").coerce_number(), None);
        assert_eq!(ContextValue::Null.coerce_number(), None);
    }
}
