//! Constants shared across the crate.

/// Overlay file picked up from every directory enclosing a service file.
pub const GLOBALS_FILENAME: &str = "globals.yml";

/// Suffix appended to a service's source path when its manifest is written out.
pub const MANIFEST_SUFFIX: &str = ".json";

/// Manifest label holding the configuration checksum.
pub const CHECKSUM_LABEL: &str = "io.skiff.checksum";

/// Docker label prefix identifying the application a container belongs to.
pub const APP_ID_LABEL: &str = "io.skiff.appid";

/// Number of hex characters kept from the SHA-256 checksum.
pub const CHECKSUM_LEN: usize = 32;

/// Scope name of the human-facing artifact version.
pub const SERVICE_VERSION: &str = "SERVICE_VERSION";

/// Scope name of the concrete, reproducible build identifier.
pub const SERVICE_BUILD: &str = "SERVICE_BUILD";

/// Manifest fields the scheduler expects as floating point numbers.
pub const FLOAT_FIELDS: &[&[&str]] = &[
  &["cpus"],
  &["mem"],
  &["disk"],
  &["gpus"],
  &["backoffFactor"],
  &["upgradeStrategy", "minimumHealthCapacity"],
  &["upgradeStrategy", "maximumOverCapacity"],
];
