//! Layered variable scope.

use std::collections::BTreeMap;

use crate::consts::{SERVICE_BUILD, SERVICE_VERSION};
use crate::document::Node;

/// Where a variable comes from.
///
/// The declaration order is the lookup order: when several layers define the
/// same name, the first one listed wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
  /// `SERVICE_VERSION` and `SERVICE_BUILD` from artifact resolution.
  Artifact,
  /// Entries of the document's top-level `variables` mapping.
  Variables,
  /// Every node of the merged document, addressed by dotted path.
  Document,
  /// The process environment.
  Environment,
}

/// A variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
  /// Final text, never scanned for references.
  Literal(String),
  /// A document node; strings inside it may reference other variables.
  Node(Node),
}

/// Name to value lookup over a fixed stack of [`Layer`]s.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
  layers: BTreeMap<Layer, BTreeMap<String, ScopeValue>>,
}

impl VariableScope {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed the environment layer.
  pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    for (name, value) in vars {
      self.insert(Layer::Environment, name, ScopeValue::Literal(value.into()));
    }
    self
  }

  /// Seed the variables and document layers from a merged document.
  pub fn with_document(mut self, document: &Node) -> Self {
    if let Some(variables) = document.get("variables").and_then(Node::as_mapping) {
      for (name, value) in variables {
        self.insert(Layer::Variables, name.clone(), ScopeValue::Node(value.clone()));
      }
    }

    let mut flat = BTreeMap::new();
    flatten(document, "", &mut flat);
    self
      .layers
      .entry(Layer::Document)
      .or_default()
      .extend(flat.into_iter().map(|(name, node)| (name, ScopeValue::Node(node))));
    self
  }

  /// Seed the artifact layer with the resolved version and build.
  pub fn with_artifact(mut self, version: &str, build: &str) -> Self {
    self.insert(Layer::Artifact, SERVICE_VERSION, ScopeValue::Literal(version.to_string()));
    self.insert(Layer::Artifact, SERVICE_BUILD, ScopeValue::Literal(build.to_string()));
    self
  }

  pub fn insert(&mut self, layer: Layer, name: impl Into<String>, value: ScopeValue) {
    self.layers.entry(layer).or_default().insert(name.into(), value);
  }

  /// Find `name` in the highest-priority layer that defines it.
  pub fn lookup(&self, name: &str) -> Option<(Layer, &ScopeValue)> {
    self
      .layers
      .iter()
      .find_map(|(layer, values)| values.get(name).map(|value| (*layer, value)))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.lookup(name).is_some()
  }
}

/// Address every node below `node` by its dotted path.
///
/// Sequence elements use their index as the path segment (`ports.0`).
fn flatten(node: &Node, prefix: &str, out: &mut BTreeMap<String, Node>) {
  let join = |key: &str| {
    if prefix.is_empty() {
      key.to_string()
    } else {
      format!("{prefix}.{key}")
    }
  };

  match node {
    Node::Mapping(map) => {
      for (key, child) in map {
        let path = join(key);
        flatten(child, &path, out);
        out.insert(path, child.clone());
      }
    }
    Node::Sequence(items) => {
      for (index, child) in items.iter().enumerate() {
        let path = join(&index.to_string());
        flatten(child, &path, out);
        out.insert(path, child.clone());
      }
    }
    _ => {}
  }
}
