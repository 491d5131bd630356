//! Reading YAML files into document trees.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::merge::merge_all;
use super::{DocumentError, Mapping, Node};
use crate::consts::GLOBALS_FILENAME;

/// Read and parse a single YAML file.
///
/// An empty file is an empty mapping. Any other top-level value that is not a
/// mapping is rejected, as is any non-string mapping key anywhere in the tree.
pub fn load_document(path: &Path) -> Result<Node, DocumentError> {
  let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_document(&text, path)
}

/// Parse YAML text; `path` is only used for error messages.
pub fn parse_document(text: &str, path: &Path) -> Result<Node, DocumentError> {
  let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|source| DocumentError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  match from_yaml(value, path)? {
    Node::Null => Ok(Node::default()),
    node @ Node::Mapping(_) => Ok(node),
    _ => Err(DocumentError::NotAMapping(path.to_path_buf())),
  }
}

fn from_yaml(value: serde_yaml::Value, path: &Path) -> Result<Node, DocumentError> {
  use serde_yaml::Value;

  Ok(match value {
    Value::Null => Node::Null,
    Value::Bool(b) => Node::Bool(b),
    Value::Number(n) => match (n.as_i64(), n.as_f64()) {
      (Some(i), _) => Node::Int(i),
      (None, Some(f)) => Node::Float(f),
      (None, None) => Node::String(n.to_string()),
    },
    Value::String(s) => Node::String(s),
    Value::Sequence(items) => Node::Sequence(
      items
        .into_iter()
        .map(|item| from_yaml(item, path))
        .collect::<Result<_, _>>()?,
    ),
    Value::Mapping(entries) => {
      let mut map = Mapping::new();
      for (key, value) in entries {
        let key = match key {
          Value::String(key) => key,
          other => {
            return Err(DocumentError::NonStringKey {
              key: key_literal(&other),
              path: path.to_path_buf(),
            });
          }
        };
        map.insert(key, from_yaml(value, path)?);
      }
      Node::Mapping(map)
    }
    Value::Tagged(tagged) => {
      let tagged = *tagged;
      from_yaml(tagged.value, path)?
    }
  })
}

/// Render a rejected key the way it was most likely written.
fn key_literal(key: &serde_yaml::Value) -> String {
  match key {
    serde_yaml::Value::Null => "null".to_string(),
    serde_yaml::Value::Bool(b) => b.to_string(),
    serde_yaml::Value::Number(n) => n.to_string(),
    other => serde_yaml::to_string(other)
      .map(|s| s.trim().to_string())
      .unwrap_or_else(|_| format!("{other:?}")),
  }
}

/// The deployment environment of a service file: the name of its directory.
///
/// `deploy/staging/myservice.yml` belongs to `staging`.
pub fn environment_of(path: &Path) -> Result<String, DocumentError> {
  path
    .parent()
    .and_then(Path::file_name)
    .and_then(|name| name.to_str())
    .map(str::to_string)
    .ok_or_else(|| DocumentError::NoEnvironment(path.to_path_buf()))
}

/// `globals.yml` files in the directories enclosing `service`, outermost first.
///
/// The walk starts from the absolute path, so the result does not depend on
/// the working directory a relative path was given against.
pub fn globals_for(service: &Path) -> Result<Vec<PathBuf>, DocumentError> {
  let absolute = std::path::absolute(service).map_err(|source| DocumentError::Read {
    path: service.to_path_buf(),
    source,
  })?;
  let Some(dir) = absolute.parent() else {
    return Ok(Vec::new());
  };

  let mut found: Vec<PathBuf> = dir
    .ancestors()
    .map(|ancestor| ancestor.join(GLOBALS_FILENAME))
    .filter(|candidate| candidate.is_file())
    .collect();
  found.reverse();
  Ok(found)
}

/// Load and merge every layer that applies to `service`.
///
/// Layer order, lowest priority first: ancestor globals, `profiles` in the
/// given order, then the service file itself.
pub fn load_layers(service: &Path, profiles: &[PathBuf]) -> Result<Node, DocumentError> {
  let mut layers = Vec::new();

  for path in globals_for(service)?.iter().chain(profiles) {
    debug!(path = %path.display(), "loading overlay");
    layers.push(load_document(path)?);
  }
  layers.push(load_document(service)?);

  Ok(merge_all(layers))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
  }

  #[test]
  fn non_string_key_is_rejected_with_key_and_path() {
    let path = Path::new("integration/myservice-nonstring-envkey.yml");
    let err = parse_document("override:\n  env:\n    true: yes\n", path).unwrap_err();

    assert!(matches!(&err, DocumentError::NonStringKey { key, .. } if key == "true"));
    assert_eq!(
      err.to_string(),
      "Only string mapping keys are supported, please quote the key 'true' in integration/myservice-nonstring-envkey.yml"
    );
  }

  #[test]
  fn integer_key_is_rejected() {
    let err = parse_document("ports:\n  8080: http\n", Path::new("svc.yml")).unwrap_err();
    assert!(matches!(err, DocumentError::NonStringKey { key, .. } if key == "8080"));
  }

  #[test]
  fn scalars_keep_their_yaml_types() {
    let doc = parse_document("a: 123\nb: 123.456\nc: true\nd: '123'\ne: ~\n", Path::new("svc.yml")).unwrap();
    assert_eq!(doc.get("a"), Some(&Node::Int(123)));
    assert_eq!(doc.get("b"), Some(&Node::Float(123.456)));
    assert_eq!(doc.get("c"), Some(&Node::Bool(true)));
    assert_eq!(doc.get("d"), Some(&Node::from("123")));
    assert_eq!(doc.get("e"), Some(&Node::Null));
  }

  #[test]
  fn empty_file_is_empty_mapping() {
    assert_eq!(parse_document("", Path::new("svc.yml")).unwrap(), Node::default());
  }

  #[test]
  fn top_level_sequence_is_rejected() {
    let err = parse_document("- a\n- b\n", Path::new("svc.yml")).unwrap_err();
    assert!(matches!(err, DocumentError::NotAMapping(_)));
  }

  #[test]
  fn malformed_yaml_names_the_file() {
    let err = parse_document("a: [unclosed", Path::new("broken.yml")).unwrap_err();
    assert!(matches!(err, DocumentError::Parse { .. }));
    assert!(err.to_string().contains("broken.yml"));
  }

  #[test]
  fn environment_comes_from_the_directory_name() {
    assert_eq!(environment_of(Path::new("yaml/staging/myservice.yml")).unwrap(), "staging");
    assert_eq!(environment_of(Path::new("integration/svc.yml")).unwrap(), "integration");
    assert!(matches!(
      environment_of(Path::new("svc.yml")),
      Err(DocumentError::NoEnvironment(_))
    ));
  }

  #[test]
  fn layers_merge_globals_then_profiles_then_service() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "globals.yml", "owner: platform\nregion: eu\ninstances: 1\n");
    write(root, "staging/globals.yml", "region: eu-west\n");
    let profile = write(root, "profiles/secrets.yml", "instances: 2\ntoken: abc123\n");
    let service = write(root, "staging/myservice.yml", "instances: 3\n");

    let doc = load_layers(&service, &[profile]).unwrap();

    assert_eq!(doc.get("owner"), Some(&Node::from("platform")));
    assert_eq!(doc.get("region"), Some(&Node::from("eu-west")));
    assert_eq!(doc.get("token"), Some(&Node::from("abc123")));
    assert_eq!(doc.get("instances"), Some(&Node::Int(3)));
  }

  #[test]
  #[serial]
  fn relative_and_absolute_paths_see_the_same_globals() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "globals.yml", "owner: outer\n");
    let service = write(root, "repo/staging/svc.yml", "a: 1\n");

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(root.join("repo")).unwrap();
    let relative = load_layers(Path::new("staging/svc.yml"), &[]);
    std::env::set_current_dir(previous).unwrap();

    let relative = relative.unwrap();
    assert_eq!(relative.get("owner"), Some(&Node::from("outer")));
    assert_eq!(relative, load_layers(&service, &[]).unwrap());
  }

  #[test]
  fn missing_profile_is_a_read_error() {
    let temp = TempDir::new().unwrap();
    let service = write(temp.path(), "staging/svc.yml", "a: 1\n");
    let err = load_layers(&service, &[temp.path().join("nope.yml")]).unwrap_err();
    assert!(matches!(err, DocumentError::Read { .. }));
  }
}
