//! Writing manifests to disk for inspection.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{Manifest, ManifestError};
use crate::consts::MANIFEST_SUFFIX;

/// Where the manifest for `source` goes under `target_dir`.
///
/// The source path is made relative first: root, prefix and `..` components
/// are dropped, so `/srv/deploy/staging/app.yml` lands at
/// `<target>/srv/deploy/staging/app.yml.json`.
pub fn manifest_path(target_dir: &Path, source: &Path) -> PathBuf {
  let relative: PathBuf = source
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part),
      _ => None,
    })
    .collect();

  let mut file = relative.into_os_string();
  file.push(MANIFEST_SUFFIX);
  target_dir.join(file)
}

/// Write `manifest` as pretty JSON next to its mirrored source path.
pub fn write_manifest(target_dir: &Path, source: &Path, manifest: &Manifest) -> Result<PathBuf, ManifestError> {
  let path = manifest_path(target_dir, source);
  let io_error = |source| ManifestError::Write {
    path: path.clone(),
    source,
  };

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(io_error)?;
  }
  let json = manifest.to_pretty_json()?;
  fs::write(&path, json).map_err(io_error)?;

  debug!(path = %path.display(), id = %manifest.id, "wrote manifest");
  Ok(path)
}
