//! Scheduler manifests.
//!
//! A manifest is the JSON application definition the scheduler accepts. It is
//! built from a service's resolved configuration by [`build_manifest`], which
//! fixes up the details the scheduler is strict about (float fields, string
//! environment values, docker parameters) and stamps a checksum label so a
//! deployed application can be compared with a freshly built one.

mod build;
mod types;
mod write;

use std::path::PathBuf;

use thiserror::Error;

pub use build::build_manifest;
pub use types::Manifest;
pub use write::{manifest_path, write_manifest};

/// Errors that can occur while building or writing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("the service configuration must be a mapping")]
  NotAMapping,

  #[error("the service configuration has no 'id'")]
  MissingId,

  #[error("'id' must be a string, found '{0}'")]
  InvalidId(String),

  #[error("'{field}' must be {expected}")]
  InvalidField {
    field: &'static str,
    expected: &'static str,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
