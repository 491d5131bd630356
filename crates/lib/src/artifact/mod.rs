//! Artifact version resolution against Maven-layout repositories.
//!
//! A service document's `maven` section names an artifact and a version
//! expression. Resolution turns that expression into two strings:
//!
//! - the *version* shown to humans (`1.1.1-SNAPSHOT`, `1.10.0`)
//! - the *build* identifying exactly what is deployed
//!   (`1.1.1-20151105011659`, `1.0.0-marathon`)
//!
//! Both are exposed to the document as `SERVICE_VERSION` and `SERVICE_BUILD`.
//! The resolver can also fetch the JSON manifest template published next to
//! the artifact, which becomes the base of the service's manifest.

mod coordinate;
mod metadata;
mod range;
mod repository;
mod resolve;

use thiserror::Error;

pub use coordinate::{ArtifactCoordinate, VersionExpr, snapshot_base};
pub use metadata::Metadata;
pub use range::{RangeError, VersionRange, parse_version};
pub use repository::{ArtifactRepository, HttpArtifactRepository, RepositoryError};
pub use resolve::{ArtifactResolver, ResolvedVersion};

/// Errors that can occur while resolving an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
  #[error("invalid maven section: {0}")]
  InvalidCoordinate(String),

  #[error("invalid version range '{expr}': {reason}")]
  InvalidRange { expr: String, reason: String },

  #[error("failed to fetch {url} for {coordinate}: {message}")]
  Fetch {
    coordinate: String,
    url: String,
    message: String,
  },

  #[error("no metadata found at {url} for {coordinate}")]
  MetadataNotFound { coordinate: String, url: String },

  #[error("invalid metadata at {url} for {coordinate}: {message}")]
  Metadata {
    coordinate: String,
    url: String,
    message: String,
  },

  #[error("none of the {candidates} published versions of {coordinate} match")]
  NoMatchingVersion { coordinate: String, candidates: usize },

  #[error("snapshot metadata for {coordinate} has no {field}")]
  IncompleteSnapshot { coordinate: String, field: &'static str },

  #[error("invalid manifest template at {url} for {coordinate}: {message}")]
  Template {
    coordinate: String,
    url: String,
    message: String,
  },
}
