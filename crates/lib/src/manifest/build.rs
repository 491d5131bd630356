//! Normalization of a resolved configuration into a scheduler manifest.

use tracing::debug;

use super::{Manifest, ManifestError};
use crate::artifact::ResolvedVersion;
use crate::consts::{APP_ID_LABEL, CHECKSUM_LABEL, FLOAT_FIELDS, SERVICE_BUILD, SERVICE_VERSION};
use crate::document::{Mapping, Node};
use crate::util::hash::{Checksum, Hashable};

/// Build the manifest from a fully variable-resolved configuration.
///
/// `artifact` supplies the `SERVICE_VERSION` and `SERVICE_BUILD` entries
/// added to the `env` map.
pub fn build_manifest(config: Node, artifact: Option<&ResolvedVersion>) -> Result<Manifest, ManifestError> {
  let Node::Mapping(mut config) = config else {
    return Err(ManifestError::NotAMapping);
  };

  let id = normalize_id(&mut config)?;
  normalize_floats(&mut config);
  normalize_env(&mut config, artifact)?;
  normalize_container(&mut config, &id)?;

  let mut config = Node::Mapping(config);
  let checksum = stamp_checksum(&mut config)?;
  debug!(id = %id, checksum = %checksum, "built manifest");

  Ok(Manifest { id, checksum, config })
}

fn normalize_id(config: &mut Mapping) -> Result<String, ManifestError> {
  let id = match config.get("id") {
    None | Some(Node::Null) => return Err(ManifestError::MissingId),
    Some(Node::String(id)) if id.trim().is_empty() => return Err(ManifestError::MissingId),
    Some(Node::String(id)) => id.trim().to_string(),
    Some(other) => return Err(ManifestError::InvalidId(other.canonical_string())),
  };

  let id = if id.starts_with('/') { id } else { format!("/{id}") };
  config.insert("id".to_string(), Node::from(id.as_str()));
  Ok(id)
}

fn normalize_floats(config: &mut Mapping) {
  for path in FLOAT_FIELDS {
    let Some((first, rest)) = path.split_first() else {
      continue;
    };
    if let Some(node) = config.get_mut(*first).and_then(|node| node.at_mut(rest))
      && let Node::Int(value) = *node
    {
      *node = Node::Float(value as f64);
    }
  }
}

fn mapping_field<'a>(config: &'a mut Mapping, field: &'static str) -> Result<&'a mut Mapping, ManifestError> {
  let node = config.entry(field.to_string()).or_insert_with(Node::default);
  if matches!(node, Node::Null) {
    *node = Node::default();
  }
  node.as_mapping_mut().ok_or(ManifestError::InvalidField {
    field,
    expected: "a mapping",
  })
}

fn normalize_env(config: &mut Mapping, artifact: Option<&ResolvedVersion>) -> Result<(), ManifestError> {
  if artifact.is_none() && !config.contains_key("env") {
    return Ok(());
  }

  let env = mapping_field(config, "env")?;
  if let Some(artifact) = artifact {
    env.insert(SERVICE_VERSION.to_string(), Node::from(artifact.version.as_str()));
    env.insert(SERVICE_BUILD.to_string(), Node::from(artifact.build.as_str()));
  }
  for value in env.values_mut() {
    if !matches!(value, Node::String(_)) {
      *value = Node::String(value.canonical_string());
    }
  }
  Ok(())
}

fn normalize_container(config: &mut Mapping, id: &str) -> Result<(), ManifestError> {
  let has_image = config
    .get("container")
    .and_then(|container| container.at(&["docker", "image"]))
    .and_then(Node::as_str)
    .is_some_and(|image| !image.trim().is_empty());

  if !has_image {
    if config.remove("container").is_some() {
      debug!(id, "no docker image configured, dropping container section");
    }
    return Ok(());
  }

  let invalid = ManifestError::InvalidField {
    field: "container.docker",
    expected: "a mapping",
  };
  let docker = config
    .get_mut("container")
    .and_then(|container| container.get_mut("docker"))
    .and_then(Node::as_mapping_mut)
    .ok_or(invalid)?;

  let mut parameters = expand_parameters(docker.remove("parameters"))?;
  let app_label = format!("{APP_ID_LABEL}={id}");
  parameters.retain(|(key, value)| !(key == "label" && value.starts_with(&format!("{APP_ID_LABEL}="))));
  parameters.insert(0, ("label".to_string(), app_label));

  let parameters = parameters
    .into_iter()
    .map(|(key, value)| {
      Node::Mapping(Mapping::from([
        ("key".to_string(), Node::String(key)),
        ("value".to_string(), Node::String(value)),
      ]))
    })
    .collect();
  docker.insert("parameters".to_string(), Node::Sequence(parameters));
  Ok(())
}

/// Docker parameters as `(key, value)` pairs.
///
/// Accepts the scheduler's own list form (`[{key: k, value: v}]`) and a
/// shorthand mapping form (`{k: v}`) where a list value expands into one
/// parameter per element.
fn expand_parameters(parameters: Option<Node>) -> Result<Vec<(String, String)>, ManifestError> {
  let invalid = || ManifestError::InvalidField {
    field: "container.docker.parameters",
    expected: "a list of {key, value} mappings or a mapping",
  };

  match parameters {
    None | Some(Node::Null) => Ok(Vec::new()),
    Some(Node::Sequence(items)) => items
      .into_iter()
      .map(|item| -> Result<_, ManifestError> {
        let key = item.get("key").map(Node::canonical_string).ok_or_else(invalid)?;
        let value = item.get("value").map(Node::canonical_string).unwrap_or_default();
        Ok((key, value))
      })
      .collect(),
    Some(Node::Mapping(map)) => Ok(
      map
        .into_iter()
        .flat_map(|(key, value)| match value {
          Node::Sequence(values) => values.iter().map(|v| (key.clone(), v.canonical_string())).collect::<Vec<_>>(),
          value => vec![(key, value.canonical_string())],
        })
        .collect(),
    ),
    Some(_) => Err(invalid()),
  }
}

/// Compute the checksum with any previous checksum label removed and store it
/// under [`CHECKSUM_LABEL`].
fn stamp_checksum(config: &mut Node) -> Result<Checksum, ManifestError> {
  let Node::Mapping(map) = &mut *config else {
    return Err(ManifestError::NotAMapping);
  };

  let keep_labels = match map.get_mut("labels") {
    Some(Node::Mapping(labels)) => {
      labels.remove(CHECKSUM_LABEL);
      !labels.is_empty()
    }
    Some(Node::Null) | None => false,
    Some(_) => {
      return Err(ManifestError::InvalidField {
        field: "labels",
        expected: "a mapping",
      });
    }
  };
  if !keep_labels {
    map.remove("labels");
  }

  let checksum = config.checksum()?;

  if let Node::Mapping(map) = config {
    mapping_field(map, "labels")?.insert(CHECKSUM_LABEL.to_string(), Node::from(checksum.0.as_str()));
  }
  Ok(checksum)
}
