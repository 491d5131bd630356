//! Service documents: loading, validation and layered merging.
//!
//! A service is described by one YAML file plus any number of overlays
//! (ancestor `globals.yml` files and explicitly listed profiles). This module
//! turns those files into a single merged [`Node`] tree and derives the
//! deployment environment from the service file's location.

mod load;
mod merge;
mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use load::{environment_of, globals_for, load_document, load_layers, parse_document};
pub use merge::{merge, merge_all};
pub use types::{Mapping, Node};

/// Errors raised while reading or validating a document.
#[derive(Debug, Error)]
pub enum DocumentError {
  /// The file could not be read.
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The file is not valid YAML.
  #[error("failed to parse YAML in {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  /// A mapping key is a boolean, number or other non-string value.
  #[error("Only string mapping keys are supported, please quote the key '{key}' in {}", .path.display())]
  NonStringKey { key: String, path: PathBuf },

  /// The top-level value is not a mapping.
  #[error("top-level value in {} must be a mapping", .0.display())]
  NotAMapping(PathBuf),

  /// The service file has no enclosing directory to name its environment.
  #[error("cannot derive an environment from {}: the file must live in an environment directory", .0.display())]
  NoEnvironment(PathBuf),
}
