//! Test helpers for skiff-lib.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::artifact::{ArtifactRepository, RepositoryError};

/// Write `content` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// An in-memory artifact repository that records every URL it is asked for.
///
/// URLs registered with [`MemoryRepository::with_broken`] fail like an
/// unreachable server instead of answering.
#[derive(Default)]
pub struct MemoryRepository {
  files: HashMap<String, String>,
  broken: Vec<String>,
  requests: Mutex<Vec<String>>,
}

impl MemoryRepository {
  pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
    self.files.insert(url.into(), body.into());
    self
  }

  pub fn with_broken(mut self, url: impl Into<String>) -> Self {
    self.broken.push(url.into());
    self
  }

  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }
}

impl ArtifactRepository for MemoryRepository {
  async fn fetch(&self, url: &str) -> Result<Option<String>, RepositoryError> {
    self.requests.lock().unwrap().push(url.to_string());
    if self.broken.iter().any(|b| b == url) {
      return Err(RepositoryError::new(url, "connection refused"));
    }
    Ok(self.files.get(url).cloned())
  }
}
