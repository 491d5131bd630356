//! Resolution of version expressions against repository metadata.

use tracing::{debug, info};

use super::coordinate::{ArtifactCoordinate, VersionExpr, snapshot_base};
use super::metadata::Metadata;
use super::repository::{ArtifactRepository, RepositoryError, redact};
use super::ArtifactError;
use crate::document::Node;

/// The outcome of resolving a coordinate's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
  /// Human-facing version, published as `SERVICE_VERSION`.
  pub version: String,
  /// Concrete build identifier, published as `SERVICE_BUILD`.
  pub build: String,
  /// Version string used in file names inside the version directory.
  pub file_version: String,
}

impl ResolvedVersion {
  fn release(version: &str, classifier: Option<&str>) -> Self {
    Self {
      version: version.to_string(),
      build: with_classifier(version, classifier),
      file_version: version.to_string(),
    }
  }
}

fn with_classifier(build: &str, classifier: Option<&str>) -> String {
  match classifier {
    Some(classifier) => format!("{build}-{classifier}"),
    None => build.to_string(),
  }
}

/// Resolves coordinates using an [`ArtifactRepository`].
pub struct ArtifactResolver<'r, R> {
  repository: &'r R,
}

impl<'r, R: ArtifactRepository> ArtifactResolver<'r, R> {
  pub fn new(repository: &'r R) -> Self {
    Self { repository }
  }

  /// Turn the coordinate's version expression into a concrete version and
  /// build identifier.
  pub async fn resolve_version(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedVersion, ArtifactError> {
    let classifier = coordinate.classifier.as_deref();

    let resolved = match &coordinate.version {
      VersionExpr::Exact(version) => ResolvedVersion::release(version, classifier),

      VersionExpr::Range { expr, range } => {
        let metadata = self.metadata(coordinate, &coordinate.metadata_url()).await?;
        let versions = &metadata.versioning.versions.items;
        let best = range
          .best_match(versions.iter().map(String::as_str))
          .ok_or_else(|| ArtifactError::NoMatchingVersion {
            coordinate: coordinate.to_string(),
            candidates: versions.len(),
          })?;
        info!(artifact = %coordinate, range = %expr, version = best, "resolved version range");
        ResolvedVersion::release(best, classifier)
      }

      VersionExpr::Snapshot(label) => {
        let metadata = self.metadata(coordinate, &coordinate.version_metadata_url(label)).await?;
        let updated = metadata
          .versioning
          .last_updated
          .clone()
          .ok_or_else(|| ArtifactError::IncompleteSnapshot {
            coordinate: coordinate.to_string(),
            field: "lastUpdated",
          })?;
        let base = snapshot_base(label);
        ResolvedVersion {
          version: label.clone(),
          build: format!("{base}-{updated}"),
          file_version: metadata
            .unique_revision(base, classifier)
            .unwrap_or_else(|| label.clone()),
        }
      }

      VersionExpr::UniqueSnapshot(label) => {
        let metadata = self.metadata(coordinate, &coordinate.version_metadata_url(label)).await?;
        let revision = metadata
          .unique_revision(snapshot_base(label), classifier)
          .ok_or_else(|| ArtifactError::IncompleteSnapshot {
            coordinate: coordinate.to_string(),
            field: "snapshot",
          })?;
        ResolvedVersion {
          version: label.clone(),
          build: with_classifier(&revision, classifier),
          file_version: revision,
        }
      }
    };

    debug!(
      artifact = %coordinate,
      version = %resolved.version,
      build = %resolved.build,
      "resolved artifact version"
    );
    Ok(resolved)
  }

  /// Fetch the JSON manifest template published next to the artifact.
  ///
  /// Returns `Ok(None)` when the repository has no template for this build.
  pub async fn fetch_template(
    &self,
    coordinate: &ArtifactCoordinate,
    resolved: &ResolvedVersion,
  ) -> Result<Option<Node>, ArtifactError> {
    let url = coordinate.template_url(&resolved.version, &resolved.file_version);
    let Some(body) = self.fetch(coordinate, &url).await? else {
      debug!(artifact = %coordinate, url = %redact(&url), "no manifest template published");
      return Ok(None);
    };

    let template_error = |message: String| ArtifactError::Template {
      coordinate: coordinate.to_string(),
      url: redact(&url),
      message,
    };
    let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| template_error(e.to_string()))?;
    if !value.is_object() {
      return Err(template_error("expected a JSON object".to_string()));
    }
    Ok(Some(Node::from(value)))
  }

  async fn metadata(&self, coordinate: &ArtifactCoordinate, url: &str) -> Result<Metadata, ArtifactError> {
    let body = self
      .fetch(coordinate, url)
      .await?
      .ok_or_else(|| ArtifactError::MetadataNotFound {
        coordinate: coordinate.to_string(),
        url: redact(url),
      })?;
    Metadata::parse(&body).map_err(|e| ArtifactError::Metadata {
      coordinate: coordinate.to_string(),
      url: redact(url),
      message: e.to_string(),
    })
  }

  async fn fetch(&self, coordinate: &ArtifactCoordinate, url: &str) -> Result<Option<String>, ArtifactError> {
    self
      .repository
      .fetch(url)
      .await
      .map_err(|RepositoryError { url, message }| ArtifactError::Fetch {
        coordinate: coordinate.to_string(),
        url,
        message,
      })
  }
}
