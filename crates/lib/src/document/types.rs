//! The document tree shared by every pipeline stage.
//!
//! A [`Node`] is what YAML service files, profile overlays, artifact templates
//! and the final scheduler manifest all look like once loaded. Scalars are
//! tagged explicitly so that type normalization never has to guess whether a
//! string "looks like" a number.
//!
//! Mappings are [`BTreeMap`]s: keys serialize in sorted order, which keeps
//! manifest checksums independent of how the source YAML was laid out.

use std::collections::BTreeMap;

use serde::Serialize;

/// A mapping with string keys.
pub type Mapping = BTreeMap<String, Node>;

/// A node in a document tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Sequence(Vec<Node>),
  Mapping(Mapping),
}

impl Default for Node {
  fn default() -> Self {
    Node::Mapping(Mapping::new())
  }
}

impl Node {
  /// Look up a direct child of a mapping.
  pub fn get(&self, key: &str) -> Option<&Node> {
    match self {
      Node::Mapping(map) => map.get(key),
      _ => None,
    }
  }

  /// Mutable variant of [`Node::get`].
  pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
    match self {
      Node::Mapping(map) => map.get_mut(key),
      _ => None,
    }
  }

  /// Follow a path of mapping keys from this node.
  pub fn at(&self, path: &[&str]) -> Option<&Node> {
    path.iter().try_fold(self, |node, key| node.get(key))
  }

  /// Mutable variant of [`Node::at`].
  pub fn at_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
    path.iter().try_fold(self, |node, key| node.get_mut(key))
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Node::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_mapping(&self) -> Option<&Mapping> {
    match self {
      Node::Mapping(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
    match self {
      Node::Mapping(map) => Some(map),
      _ => None,
    }
  }

  /// The canonical textual form of this node.
  ///
  /// This is what a node turns into when it is substituted into a string or
  /// placed in the scheduler's string-only environment map:
  ///
  /// | Node                 | Text                         |
  /// |----------------------|------------------------------|
  /// | `String("abc")`      | `abc`                        |
  /// | `Int(123)`           | `123`                        |
  /// | `Float(123.456)`     | `123.456`                    |
  /// | `Float(0.0)`         | `0.0`                        |
  /// | `Bool(true)`         | `true`                       |
  /// | `Null`               | empty string                 |
  /// | mapping / sequence   | compact JSON                 |
  pub fn canonical_string(&self) -> String {
    match self {
      Node::Null => String::new(),
      Node::Bool(b) => b.to_string(),
      Node::Int(i) => i.to_string(),
      Node::Float(f) => format_float(*f),
      Node::String(s) => s.clone(),
      Node::Sequence(_) | Node::Mapping(_) => serde_json::Value::from(self).to_string(),
    }
  }
}

/// Shortest round-trip representation, always with a fractional part.
fn format_float(value: f64) -> String {
  serde_json::Number::from_f64(value)
    .map(|n| n.to_string())
    .unwrap_or_else(|| format!("{value:?}"))
}

impl From<&str> for Node {
  fn from(value: &str) -> Self {
    Node::String(value.to_string())
  }
}

impl From<String> for Node {
  fn from(value: String) -> Self {
    Node::String(value)
  }
}

impl From<Mapping> for Node {
  fn from(value: Mapping) -> Self {
    Node::Mapping(value)
  }
}

impl From<&Node> for serde_json::Value {
  fn from(node: &Node) -> Self {
    match node {
      Node::Null => serde_json::Value::Null,
      Node::Bool(b) => serde_json::Value::Bool(*b),
      Node::Int(i) => serde_json::Value::from(*i),
      Node::Float(f) => serde_json::Number::from_f64(*f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null),
      Node::String(s) => serde_json::Value::String(s.clone()),
      Node::Sequence(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
      Node::Mapping(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.into())).collect()),
    }
  }
}

impl From<serde_json::Value> for Node {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Node::Null,
      serde_json::Value::Bool(b) => Node::Bool(b),
      serde_json::Value::Number(n) => match n.as_i64() {
        Some(i) => Node::Int(i),
        None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
      },
      serde_json::Value::String(s) => Node::String(s),
      serde_json::Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
      serde_json::Value::Object(map) => Node::Mapping(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
    }
  }
}
