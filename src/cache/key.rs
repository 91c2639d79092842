//! Structured query keys.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The kind of a cached query. Determines the default time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
  List,
  Detail,
  Stats,
  Recent,
  ByStatus,
}

impl QueryKind {
  pub const ALL: [QueryKind; 5] = [
    QueryKind::List,
    QueryKind::Detail,
    QueryKind::Stats,
    QueryKind::Recent,
    QueryKind::ByStatus,
  ];

  /// The key segment naming this kind.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::List => "list",
      Self::Detail => "detail",
      Self::Stats => "stats",
      Self::Recent => "recent",
      Self::ByStatus => "byStatus",
    }
  }

  pub fn from_segment(segment: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.as_str() == segment)
  }
}

/// Identifies a cached query: `[namespace, kind, params...]`.
///
/// Keys compare by their canonical JSON form. Object segments are
/// canonicalized with sorted keys, so field order never matters, while the
/// position of each segment always does. A shorter key acts as a prefix of
/// every key that begins with the same segments.
#[derive(Clone)]
pub struct QueryKey {
  segments: Vec<Value>,
  canonical: String,
}

impl QueryKey {
  /// Start a key in the given namespace, e.g. `"trips"`.
  pub fn new(namespace: &str) -> Self {
    Self::from_segments(vec![Value::String(namespace.to_string())])
  }

  /// Build a key from raw segments.
  pub fn from_segments(segments: Vec<Value>) -> Self {
    let segments: Vec<Value> = segments.into_iter().map(canonicalize).collect();
    let canonical = Value::Array(segments.clone()).to_string();
    Self {
      segments,
      canonical,
    }
  }

  /// Append the kind segment.
  pub fn kind_segment(self, kind: QueryKind) -> Self {
    self.push(kind.as_str())
  }

  /// Append a segment.
  pub fn push(mut self, segment: impl Into<Value>) -> Self {
    self.segments.push(canonicalize(segment.into()));
    self.canonical = Value::Array(self.segments.clone()).to_string();
    self
  }

  pub fn segments(&self) -> &[Value] {
    &self.segments
  }

  pub fn len(&self) -> usize {
    self.segments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn namespace(&self) -> Option<&str> {
    self.segments.first().and_then(Value::as_str)
  }

  pub fn kind(&self) -> Option<QueryKind> {
    self
      .segments
      .get(1)
      .and_then(Value::as_str)
      .and_then(QueryKind::from_segment)
  }

  /// True if `prefix` equals this key or is a leading run of its segments.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    prefix.segments.len() <= self.segments.len()
      && self
        .segments
        .iter()
        .zip(&prefix.segments)
        .all(|(own, other)| own == other)
  }

  /// Short stable fingerprint for log correlation.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
  }
}

/// Rebuild objects with their keys in sorted order.
fn canonicalize(value: Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(String, Value)> = map.into_iter().collect();
      entries.sort_by(|a, b| a.0.cmp(&b.0));
      let sorted: Map<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k, canonicalize(v)))
        .collect();
      Value::Object(sorted)
    }
    Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
    other => other,
  }
}

impl PartialEq for QueryKey {
  fn eq(&self, other: &Self) -> bool {
    self.canonical == other.canonical
  }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.canonical.hash(state);
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.canonical)
  }
}

impl fmt::Debug for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "QueryKey({})", self.canonical)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::HashSet;

  #[test]
  fn test_object_segments_ignore_field_order() {
    let mut first = Map::new();
    first.insert("status".into(), json!("draft"));
    first.insert("purpose".into(), json!("x"));
    let mut second = Map::new();
    second.insert("purpose".into(), json!("x"));
    second.insert("status".into(), json!("draft"));

    let a = QueryKey::new("trips")
      .kind_segment(QueryKind::List)
      .push(Value::Object(first));
    let b = QueryKey::new("trips")
      .kind_segment(QueryKind::List)
      .push(Value::Object(second));

    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());
    let set: HashSet<_> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn test_positional_segments_are_ordered() {
    let a = QueryKey::new("trips").push("list").push("detail");
    let b = QueryKey::new("trips").push("detail").push("list");
    assert_ne!(a, b);
  }

  #[test]
  fn test_prefix_matching() {
    let all = QueryKey::new("trips");
    let lists = QueryKey::new("trips").kind_segment(QueryKind::List);
    let page = lists.clone().push(json!({"status": "draft"})).push(json!({"page": 1}));
    let companies = QueryKey::new("companies").kind_segment(QueryKind::List);

    assert!(page.starts_with(&all));
    assert!(page.starts_with(&lists));
    assert!(page.starts_with(&page));
    assert!(!lists.starts_with(&page));
    assert!(!companies.starts_with(&all));
  }

  #[test]
  fn test_kind_and_namespace() {
    let key = QueryKey::new("trips")
      .kind_segment(QueryKind::ByStatus)
      .push("approved");
    assert_eq!(key.namespace(), Some("trips"));
    assert_eq!(key.kind(), Some(QueryKind::ByStatus));
    assert_eq!(QueryKey::new("trips").kind(), None);
  }

  #[test]
  fn test_fingerprint_is_stable() {
    let a = QueryKey::new("trips").push("detail").push("t-1");
    let b = QueryKey::new("trips").push("detail").push("t-1");
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 12);
  }
}
