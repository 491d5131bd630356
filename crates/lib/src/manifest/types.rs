//! The scheduler manifest of one service.

use serde::Serialize;

use crate::document::Node;
use crate::util::hash::{Checksum, Hashable};

impl Hashable for Node {}

/// A scheduler-ready application definition.
///
/// `config` is the JSON body sent to the scheduler. It always has a string
/// `id` starting with `/` and carries its own [`Checksum`] in
/// `labels["io.skiff.checksum"]`.
///
/// # Example
///
/// ```json
/// {
///   "id": "/myproduct/myservice",
///   "cpus": 1.0,
///   "env": { "SERVICE_VERSION": "1.0.0", "SERVICE_BUILD": "1.0.0" },
///   "labels": { "io.skiff.checksum": "4d5e8c0b8a1e3f7d2c6b9a0e1f2d3c4b" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
  #[serde(skip)]
  pub id: String,
  #[serde(skip)]
  pub checksum: Checksum,
  pub config: Node,
}

impl Manifest {
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::Value::from(&self.config)
  }

  pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&self.config)
  }

  /// The `env` mapping of the manifest, if any.
  pub fn env(&self) -> impl Iterator<Item = (&str, &Node)> {
    self
      .config
      .get("env")
      .and_then(Node::as_mapping)
      .into_iter()
      .flatten()
      .map(|(key, value)| (key.as_str(), value))
  }
}
