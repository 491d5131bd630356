//! Artifact coordinates read from a document's `maven` section.

use std::fmt;

use super::ArtifactError;
use super::range::VersionRange;
use crate::document::Node;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// How the `version` of a coordinate is to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionExpr {
  /// A fixed release version.
  Exact(String),
  /// A Maven range; the highest published version inside it is used.
  Range { expr: String, range: VersionRange },
  /// `x.y.z-SNAPSHOT`, identified by the metadata's last update time.
  Snapshot(String),
  /// `x.y.z-SNAPSHOT`, identified by its unique timestamped revision.
  UniqueSnapshot(String),
}

impl VersionExpr {
  pub fn parse(expr: &str, unique: bool) -> Result<Self, ArtifactError> {
    let expr = expr.trim();
    if expr.is_empty() {
      return Err(ArtifactError::InvalidCoordinate("empty version".to_string()));
    }

    if expr.starts_with('[') || expr.starts_with('(') {
      let range = expr.parse().map_err(|e| ArtifactError::InvalidRange {
        expr: expr.to_string(),
        reason: format!("{e}"),
      })?;
      return Ok(Self::Range {
        expr: expr.to_string(),
        range,
      });
    }

    if expr.ends_with(SNAPSHOT_SUFFIX) {
      return Ok(if unique {
        Self::UniqueSnapshot(expr.to_string())
      } else {
        Self::Snapshot(expr.to_string())
      });
    }

    Ok(Self::Exact(expr.to_string()))
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Exact(v) | Self::Snapshot(v) | Self::UniqueSnapshot(v) => v,
      Self::Range { expr, .. } => expr,
    }
  }
}

/// `1.1.1-SNAPSHOT` -> `1.1.1`.
pub fn snapshot_base(label: &str) -> &str {
  label.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(label)
}

/// Where an artifact lives and which version of it is wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCoordinate {
  pub repository: String,
  pub group_id: String,
  pub artifact_id: String,
  pub version: VersionExpr,
  pub classifier: Option<String>,
}

impl ArtifactCoordinate {
  /// Read a coordinate from an already variable-resolved `maven` section.
  ///
  /// `resolve` is accepted in place of `version` for older descriptors.
  pub fn from_node(section: &Node) -> Result<Self, ArtifactError> {
    if section.as_mapping().is_none() {
      return Err(ArtifactError::InvalidCoordinate(
        "the maven section must be a mapping".to_string(),
      ));
    }

    let field = |name: &str| {
      section
        .get(name)
        .map(Node::canonical_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    };
    let required = |name: &str| field(name).ok_or_else(|| ArtifactError::InvalidCoordinate(format!("missing '{name}'")));

    let repository = required("repository")?;
    let group_id = required("groupid")?;
    let artifact_id = required("artifactid")?;
    let expr = field("version")
      .or_else(|| field("resolve"))
      .ok_or_else(|| ArtifactError::InvalidCoordinate("missing 'version'".to_string()))?;
    let unique = matches!(section.get("unique"), Some(Node::Bool(true)));

    Ok(Self {
      repository: repository.trim_end_matches('/').to_string(),
      group_id,
      artifact_id,
      version: VersionExpr::parse(&expr, unique)?,
      classifier: field("classifier"),
    })
  }

  /// `{repository}/{group/as/path}/{artifact}`
  pub fn artifact_url(&self) -> String {
    format!(
      "{}/{}/{}",
      self.repository,
      self.group_id.replace('.', "/"),
      self.artifact_id
    )
  }

  /// Listing of every published version.
  pub fn metadata_url(&self) -> String {
    format!("{}/maven-metadata.xml", self.artifact_url())
  }

  /// Metadata of a single (snapshot) version directory.
  pub fn version_metadata_url(&self, version: &str) -> String {
    format!("{}/{version}/maven-metadata.xml", self.artifact_url())
  }

  /// The JSON manifest template published alongside the artifact.
  pub fn template_url(&self, version: &str, file_version: &str) -> String {
    let mut url = format!("{}/{version}/{}-{file_version}", self.artifact_url(), self.artifact_id);
    if let Some(classifier) = &self.classifier {
      url.push('-');
      url.push_str(classifier);
    }
    url.push_str(".json");
    url
  }
}

impl fmt::Display for ArtifactCoordinate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version.as_str())?;
    if let Some(classifier) = &self.classifier {
      write!(f, ":{classifier}")?;
    }
    Ok(())
  }
}
