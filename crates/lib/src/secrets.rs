//! Detection of plaintext secrets in service environments.
//!
//! A variable is suspicious when its name looks sensitive (`DATABASE_PASSWORD`,
//! `API_TOKEN`) and its value does not carry a ciphertext marker. The default
//! marker is an `ENC[<ALGORITHM>,<payload>]` block anywhere in the value, so a
//! connection string with an encrypted fragment spliced in counts as
//! encrypted.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::service::Service;

static SENSITIVE_KEY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)PASSWORD|PASSWD|SECRET|TOKEN|PRIVATE_KEY|CREDENTIAL").expect("invalid sensitive key pattern")
});

static ENCRYPTED_BLOCK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"ENC\[[A-Za-z0-9_-]+,[A-Za-z0-9+/=_-]+\]").expect("invalid ciphertext pattern"));

/// Decides whether a value is already encrypted.
pub trait CiphertextMarker {
  fn is_encrypted(&self, value: &str) -> bool;
}

impl<F: Fn(&str) -> bool> CiphertextMarker for F {
  fn is_encrypted(&self, value: &str) -> bool {
    self(value)
  }
}

/// Recognizes `ENC[ALG,payload]` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncBlockMarker;

impl CiphertextMarker for EncBlockMarker {
  fn is_encrypted(&self, value: &str) -> bool {
    ENCRYPTED_BLOCK.is_match(value)
  }
}

/// A plaintext-looking secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFinding {
  pub path: PathBuf,
  pub key: String,
}

#[derive(Debug, Error)]
#[error("Found unencrypted secret in {}: {key}", .path.display())]
pub struct SecretPolicyError {
  pub path: PathBuf,
  pub key: String,
}

impl From<SecretFinding> for SecretPolicyError {
  fn from(finding: SecretFinding) -> Self {
    Self {
      path: finding.path,
      key: finding.key,
    }
  }
}

/// Which environment variables must be encrypted, and how to tell.
pub struct SecretPolicy {
  key_pattern: Regex,
  marker: Box<dyn CiphertextMarker + Send + Sync>,
}

impl Default for SecretPolicy {
  fn default() -> Self {
    Self {
      key_pattern: SENSITIVE_KEY.clone(),
      marker: Box::new(EncBlockMarker),
    }
  }
}

impl std::fmt::Debug for SecretPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SecretPolicy")
      .field("key_pattern", &self.key_pattern.as_str())
      .finish_non_exhaustive()
  }
}

impl SecretPolicy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the sensitive key pattern.
  pub fn with_key_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
    self.key_pattern = Regex::new(pattern)?;
    Ok(self)
  }

  pub fn with_marker(mut self, marker: impl CiphertextMarker + Send + Sync + 'static) -> Self {
    self.marker = Box::new(marker);
    self
  }

  pub fn is_sensitive_key(&self, key: &str) -> bool {
    self.key_pattern.is_match(key)
  }

  /// Every flagged variable of `service`, in key order.
  pub fn findings(&self, service: &Service) -> Vec<SecretFinding> {
    service
      .manifest
      .env()
      .filter(|(key, value)| self.is_sensitive_key(key) && !self.marker.is_encrypted(&value.canonical_string()))
      .map(|(key, _)| SecretFinding {
        path: service.path.clone(),
        key: key.to_string(),
      })
      .collect()
  }

  /// Check every service.
  ///
  /// With `enforce`, the first finding is an error. Otherwise each finding is
  /// logged as a warning and all of them are returned.
  pub fn verify(&self, services: &[Service], enforce: bool) -> Result<Vec<SecretFinding>, SecretPolicyError> {
    let mut all = Vec::new();
    for service in services {
      for finding in self.findings(service) {
        if enforce {
          return Err(finding.into());
        }
        warn!("Found unencrypted secret in {}: {}", finding.path.display(), finding.key);
        all.push(finding);
      }
    }
    Ok(all)
  }
}
