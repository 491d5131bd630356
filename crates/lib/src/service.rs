//! Services: one descriptor file turned into a deployable manifest.
//!
//! [`ServiceParser::parse`] runs the whole document pipeline for one file:
//!
//! 1. merge ancestor globals, profiles and the service file
//! 2. resolve the `maven` section and, through it, the artifact version and
//!    manifest template
//! 3. merge the document's `override` section over the template
//! 4. substitute variables and build the manifest

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::{ArtifactCoordinate, ArtifactError, ArtifactRepository, ArtifactResolver, ResolvedVersion};
use crate::document::{DocumentError, Node, environment_of, load_layers, merge};
use crate::manifest::{Manifest, ManifestError, build_manifest, write_manifest};
use crate::util::hash::Checksum;
use crate::variables::{Substitution, VariableError, VariableScope};

/// Any failure while turning one descriptor into a service.
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error(transparent)]
  Document(#[from] DocumentError),

  #[error(transparent)]
  Variable(#[from] VariableError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

/// A [`ServiceError`] tagged with the descriptor it came from.
#[derive(Debug, Error)]
#[error("Failed to parse {} with the following message: {source}", .path.display())]
pub struct ParseError {
  pub path: PathBuf,
  #[source]
  pub source: ServiceError,
}

/// A fully resolved service.
#[derive(Debug, Clone)]
pub struct Service {
  /// The descriptor file, as given.
  pub path: PathBuf,
  /// Name of the directory containing the descriptor.
  pub environment: String,
  /// The merged document before variable substitution.
  pub document: Node,
  /// Version and build the manifest was built for, if known.
  pub artifact: Option<ResolvedVersion>,
  pub manifest: Manifest,
  /// `scheduler.urls.<environment>` from the document.
  pub scheduler_url: Option<String>,
}

impl Service {
  pub fn id(&self) -> &str {
    &self.manifest.id
  }

  pub fn config(&self) -> &Node {
    &self.manifest.config
  }

  pub fn checksum(&self) -> &Checksum {
    &self.manifest.checksum
  }
}

/// Inputs shared by every service of a run.
#[derive(Debug, Clone)]
pub struct ParseOptions {
  /// Profile overlays, lowest priority first.
  pub profiles: Vec<PathBuf>,
  /// Values of the environment scope layer.
  pub environment: BTreeMap<String, String>,
}

impl Default for ParseOptions {
  /// No profiles and a snapshot of the process environment.
  ///
  /// Variables whose name or value is not valid UTF-8 cannot be referenced
  /// and are left out.
  fn default() -> Self {
    let environment = std::env::vars_os()
      .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
      .collect();
    Self {
      profiles: Vec::new(),
      environment,
    }
  }
}

impl ParseOptions {
  pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = PathBuf>) -> Self {
    self.profiles = profiles.into_iter().collect();
    self
  }

  pub fn with_environment<K: Into<String>, V: Into<String>>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self {
    self.environment = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    self
  }
}

/// Builds [`Service`]s from descriptor files.
pub struct ServiceParser<R> {
  repository: R,
  options: ParseOptions,
}

impl<R: ArtifactRepository> ServiceParser<R> {
  pub fn new(repository: R, options: ParseOptions) -> Self {
    Self { repository, options }
  }

  pub async fn parse(&self, path: &Path) -> Result<Service, ParseError> {
    self.parse_inner(path).await.map_err(|source| ParseError {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Parse every file, stopping at the first failure.
  pub async fn parse_all(&self, paths: &[PathBuf]) -> Result<Vec<Service>, ParseError> {
    let mut services = Vec::with_capacity(paths.len());
    for path in paths {
      services.push(self.parse(path).await?);
    }
    Ok(services)
  }

  async fn parse_inner(&self, path: &Path) -> Result<Service, ServiceError> {
    debug!(path = %path.display(), "parsing service");

    let document = load_layers(path, &self.options.profiles)?;
    let environment = environment_of(path)?;
    let scope = VariableScope::new()
      .with_environment(self.options.environment.clone())
      .with_document(&document);

    let (artifact, template) = self.resolve_artifact(&document, &scope).await?;
    let scope = match &artifact {
      Some(artifact) => scope.with_artifact(&artifact.version, &artifact.build),
      None => scope,
    };

    let overrides = document.get("override").cloned().unwrap_or_default();
    let config = merge(template.unwrap_or_default(), overrides);

    let mut substitution = Substitution::new(&scope);
    let config = substitution.resolve_node(&config)?;
    let manifest = build_manifest(config, artifact.as_ref())?;

    let scheduler_url = match document.at(&["scheduler", "urls", environment.as_str()]) {
      Some(url) => Some(substitution.resolve_node(url)?.canonical_string()).filter(|url| !url.trim().is_empty()),
      None => None,
    };

    info!(path = %path.display(), id = %manifest.id, environment = %environment, "parsed service");

    Ok(Service {
      path: path.to_path_buf(),
      environment,
      document,
      artifact,
      manifest,
      scheduler_url,
    })
  }

  /// Resolve the artifact named by the `maven` section, or fall back to a
  /// plain top-level `version`.
  async fn resolve_artifact(
    &self,
    document: &Node,
    scope: &VariableScope,
  ) -> Result<(Option<ResolvedVersion>, Option<Node>), ServiceError> {
    let mut substitution = Substitution::new(scope);

    if let Some(section) = document.get("maven") {
      let section = substitution.resolve_node(section)?;
      let coordinate = ArtifactCoordinate::from_node(&section)?;
      let resolver = ArtifactResolver::new(&self.repository);
      let resolved = resolver.resolve_version(&coordinate).await?;
      let template = resolver.fetch_template(&coordinate, &resolved).await?;
      return Ok((Some(resolved), template));
    }

    if let Some(version) = document.get("version") {
      let version = substitution.resolve_node(version)?.canonical_string();
      if !version.is_empty() {
        return Ok((
          Some(ResolvedVersion {
            version: version.clone(),
            build: version.clone(),
            file_version: version,
          }),
          None,
        ));
      }
    }

    Ok((None, None))
  }
}

/// Write every service's manifest under `target_dir`.
pub fn write_services(target_dir: &Path, services: &[Service]) -> Result<Vec<PathBuf>, ManifestError> {
  services
    .iter()
    .map(|service| write_manifest(target_dir, &service.path, &service.manifest))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::{CHECKSUM_LABEL, CHECKSUM_LEN};
  use crate::util::testutil::{MemoryRepository, write_file};
  use serial_test::serial;
  use tempfile::TempDir;

  const REPO: &str = "http://repo.example.com/releases";

  const TEMPLATE: &str = r#"{
  "id": "/myproduct/myservice",
  "instances": 1,
  "cpus": 1,
  "mem": 256,
  "container": {
    "type": "DOCKER",
    "docker": {
      "image": "registry.example.com/myservice:%{SERVICE_VERSION}",
      "portMappings": [{"containerPort": 8080, "servicePort": 1234}]
    }
  },
  "upgradeStrategy": {"minimumHealthCapacity": 0, "maximumOverCapacity": 0}
}"#;

  const SNAPSHOT_METADATA: &str = "<metadata><versioning>\
    <snapshot><timestamp>20151102.035053</timestamp><buildNumber>8</buildNumber></snapshot>\
    <lastUpdated>20151105011659</lastUpdated>\
    <snapshotVersions><snapshotVersion><classifier>marathon</classifier><extension>json</extension>\
    <value>1.1.1-20151102.035053-8</value></snapshotVersion></snapshotVersions>\
    </versioning></metadata>";

  fn repository() -> MemoryRepository {
    MemoryRepository::default()
      .with(
        format!("{REPO}/com/example/myservice/1.0.0/myservice-1.0.0.json"),
        TEMPLATE,
      )
      .with(
        format!("{REPO}/com/example/myservice/1.0.0/myservice-1.0.0-marathon.json"),
        TEMPLATE,
      )
      .with(
        format!("{REPO}/com/example/myservice/1.1.1-SNAPSHOT/maven-metadata.xml"),
        SNAPSHOT_METADATA,
      )
  }

  fn maven(version: &str, extra: &str) -> String {
    format!("maven:\n  repository: {REPO}\n  groupid: com.example\n  artifactid: myservice\n  version: '{version}'\n{extra}")
  }

  fn parser(repository: MemoryRepository) -> ServiceParser<MemoryRepository> {
    ServiceParser::new(
      repository,
      ParseOptions {
        profiles: Vec::new(),
        environment: BTreeMap::from([("RABBIT_HOST".to_string(), "myserver".to_string())]),
      },
    )
  }

  #[tokio::test]
  async fn parses_service_with_template_and_overrides() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
      temp.path(),
      "staging/myservice.yml",
      &format!(
        "{}variables:\n  bvar: '%{{cvar}}'\n  cvar: 123\noverride:\n  instances: 3\n  env:\n    DATABASE: 'database:3306'\n    rabbitmq: 'amqp://%{{RABBIT_HOST}}:15672'\n    BVAR: '%{{bvar}}'\n    MY_ESCAPED_VAR: '%%{{id}}'\n",
        maven("1.0.0", "")
      ),
    );

    let service = parser(repository()).parse(&path).await.unwrap();
    let config = service.config();

    assert_eq!(service.environment, "staging");
    assert_eq!(service.id(), "/myproduct/myservice");
    assert_eq!(config.get("instances"), Some(&Node::Int(3)));
    assert_eq!(config.get("cpus"), Some(&Node::Float(1.0)));
    assert_eq!(config.at(&["env", "DATABASE"]), Some(&Node::from("database:3306")));
    assert_eq!(config.at(&["env", "rabbitmq"]), Some(&Node::from("amqp://myserver:15672")));
    assert_eq!(config.at(&["env", "BVAR"]), Some(&Node::from("123")));
    assert_eq!(config.at(&["env", "MY_ESCAPED_VAR"]), Some(&Node::from("%{id}")));
    assert_eq!(config.at(&["env", "SERVICE_VERSION"]), Some(&Node::from("1.0.0")));
    assert_eq!(config.at(&["env", "SERVICE_BUILD"]), Some(&Node::from("1.0.0")));
    assert_eq!(
      config.at(&["container", "docker", "image"]),
      Some(&Node::from("registry.example.com/myservice:1.0.0"))
    );
    assert_eq!(
      config.at(&["upgradeStrategy", "minimumHealthCapacity"]),
      Some(&Node::Float(0.0))
    );

    let Some(Node::Sequence(parameters)) = config.at(&["container", "docker", "parameters"]) else {
      panic!("missing docker parameters");
    };
    assert_eq!(parameters[0].get("key"), Some(&Node::from("label")));
    assert_eq!(
      parameters[0].get("value"),
      Some(&Node::from("io.skiff.appid=/myproduct/myservice"))
    );
  }

  #[tokio::test]
  async fn override_replaces_one_list_element_field() {
    let temp = TempDir::new().unwrap();
    let untouched = write_file(temp.path(), "staging/nooverride.yml", &maven("1.0.0", ""));
    let overridden = write_file(
      temp.path(),
      "staging/override.yml",
      &format!(
        "{}override:\n  container:\n    docker:\n      portMappings:\n        - servicePort: 4000\n",
        maven("1.0.0", "")
      ),
    );
    let parser = parser(repository());

    let port = |service: &Service| {
      let Some(Node::Sequence(mappings)) = service.config().at(&["container", "docker", "portMappings"]) else {
        panic!("missing port mappings");
      };
      (mappings[0].get("servicePort").cloned(), mappings[0].get("containerPort").cloned())
    };

    assert_eq!(
      port(&parser.parse(&untouched).await.unwrap()),
      (Some(Node::Int(1234)), Some(Node::Int(8080)))
    );
    assert_eq!(
      port(&parser.parse(&overridden).await.unwrap()),
      (Some(Node::Int(4000)), Some(Node::Int(8080)))
    );
  }

  #[tokio::test]
  async fn classifier_changes_build_and_checksum() {
    let temp = TempDir::new().unwrap();
    let plain = write_file(temp.path(), "staging/plain.yml", &maven("1.0.0", ""));
    let classified = write_file(
      temp.path(),
      "staging/classifier.yml",
      &format!(
        "{}override:\n  env:\n    isclassifier: '%{{maven.classifier}}'\n",
        maven("1.0.0", "  classifier: marathon\n")
      ),
    );
    let parser = parser(repository());

    let first = parser.parse(&plain).await.unwrap();
    let again = parser.parse(&plain).await.unwrap();
    let other = parser.parse(&classified).await.unwrap();

    assert_eq!(other.config().at(&["env", "isclassifier"]), Some(&Node::from("marathon")));
    assert_eq!(other.config().at(&["env", "SERVICE_BUILD"]), Some(&Node::from("1.0.0-marathon")));

    let label = |service: &Service| {
      service
        .config()
        .at(&["labels", CHECKSUM_LABEL])
        .and_then(Node::as_str)
        .map(str::to_string)
        .unwrap()
    };
    assert_eq!(label(&first).len(), CHECKSUM_LEN);
    assert_eq!(label(&first), label(&again));
    assert_ne!(label(&first), label(&other));
  }

  #[tokio::test]
  async fn snapshot_versions_resolve_to_builds() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_file(
      temp.path(),
      "staging/snapshot.yml",
      &format!("{}override:\n  id: /myproduct/snapshot\n", maven("1.1.1-SNAPSHOT", "")),
    );
    let unique = write_file(
      temp.path(),
      "staging/unique.yml",
      &format!(
        "{}override:\n  id: /myproduct/unique\n",
        maven("1.1.1-SNAPSHOT", "  classifier: marathon\n  unique: true\n")
      ),
    );
    let parser = parser(repository());

    let service = parser.parse(&snapshot).await.unwrap();
    assert_eq!(service.config().at(&["env", "SERVICE_VERSION"]), Some(&Node::from("1.1.1-SNAPSHOT")));
    assert_eq!(service.config().at(&["env", "SERVICE_BUILD"]), Some(&Node::from("1.1.1-20151105011659")));

    let service = parser.parse(&unique).await.unwrap();
    assert_eq!(
      service.config().at(&["env", "SERVICE_BUILD"]),
      Some(&Node::from("1.1.1-20151102.035053-8-marathon"))
    );
  }

  #[tokio::test]
  async fn service_without_maven_or_docker() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
      temp.path(),
      "staging/non-docker.yml",
      "version: 2.0.0\noverride:\n  id: myservice/hello-play\n  cpus: 1\n  instances: 1\n  container:\n    type: DOCKER\n",
    );

    let repository = MemoryRepository::default();
    let parser = parser(repository);
    let service = parser.parse(&path).await.unwrap();

    assert_eq!(service.id(), "/myservice/hello-play");
    assert_eq!(service.config().get("container"), None);
    assert_eq!(service.config().at(&["env", "SERVICE_VERSION"]), Some(&Node::from("2.0.0")));
    assert_eq!(service.config().at(&["env", "SERVICE_BUILD"]), Some(&Node::from("2.0.0")));
    assert!(parser.repository.requests().is_empty());
  }

  #[tokio::test]
  async fn profiles_and_globals_are_merged() {
    let temp = TempDir::new().unwrap();
    write_file(
      temp.path(),
      "globals.yml",
      "scheduler:\n  urls:\n    staging: 'http://%{RABBIT_HOST}:8080'\n",
    );
    let profile = write_file(temp.path(), "profiles/secrets.yml", "hipchat:\n  token: abc123\n  rooms: ['123']\n");
    let path = write_file(
      temp.path(),
      "staging/nomaven.yml",
      "hipchat:\n  rooms: ['456']\noverride:\n  id: /myproduct/nomaven\n  env:\n    TOKEN: '%{hipchat.token}'\n",
    );

    let parser = ServiceParser::new(
      MemoryRepository::default(),
      ParseOptions::default()
        .with_profiles([profile])
        .with_environment([("RABBIT_HOST", "myserver")]),
    );
    let service = parser.parse(&path).await.unwrap();

    assert_eq!(service.document.at(&["hipchat", "token"]), Some(&Node::from("abc123")));
    assert_eq!(
      service.document.at(&["hipchat", "rooms"]),
      Some(&Node::Sequence(vec![Node::from("123"), Node::from("456")]))
    );
    assert_eq!(service.config().at(&["env", "TOKEN"]), Some(&Node::from("abc123")));
    assert_eq!(service.scheduler_url.as_deref(), Some("http://myserver:8080"));
  }

  #[tokio::test]
  async fn unresolved_variable_names_file_and_variable() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
      temp.path(),
      "integration/unresolved.yml",
      "override:\n  id: /a\n  env:\n    X: '%{bvar}'\n",
    );

    let err = parser(MemoryRepository::default()).parse(&path).await.unwrap_err();
    assert_eq!(
      err.to_string(),
      format!("Failed to parse {} with the following message: Variable %{{bvar}} not found", path.display())
    );
  }

  #[tokio::test]
  async fn missing_artifact_fails_the_service() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "staging/missing.yml", &maven("9.9.9-SNAPSHOT", ""));

    let err = parser(repository()).parse(&path).await.unwrap_err();
    assert!(matches!(err.source, ServiceError::Artifact(ArtifactError::MetadataNotFound { .. })));
  }

  #[test]
  #[serial]
  fn default_options_snapshot_process_environment() {
    temp_env::with_var("SKIFF_TEST_SNAPSHOT", Some("present"), || {
      let options = ParseOptions::default();
      assert_eq!(
        options.environment.get("SKIFF_TEST_SNAPSHOT").map(String::as_str),
        Some("present")
      );
    });
  }

  #[cfg(unix)]
  #[test]
  #[serial]
  fn default_options_skip_non_utf8_environment() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    temp_env::with_vars(
      [
        ("SKIFF_TEST_NON_UTF8", Some(OsStr::from_bytes(b"\xff\xfe"))),
        ("SKIFF_TEST_UTF8", Some(OsStr::new("fine"))),
      ],
      || {
        let options = ParseOptions::default();
        assert!(!options.environment.contains_key("SKIFF_TEST_NON_UTF8"));
        assert_eq!(options.environment.get("SKIFF_TEST_UTF8").map(String::as_str), Some("fine"));
      },
    );
  }

  #[tokio::test]
  async fn write_services_mirrors_paths() {
    let temp = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let path = write_file(temp.path(), "staging/myservice.yml", &maven("1.0.0", ""));
    let service = parser(repository()).parse(&path).await.unwrap();

    let written = write_services(out.path(), &[service]).unwrap();
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("staging/myservice.yml.json"));
    assert!(written[0].starts_with(out.path()));
    assert!(written[0].is_file());
  }
}
