//! Configuration checksums.
//!
//! A checksum is the SHA-256 of a value's compact JSON serialization,
//! truncated to [`CHECKSUM_LEN`] lowercase hex characters. Mappings serialize
//! with sorted keys, so equal configurations always hash the same.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::consts::CHECKSUM_LEN;

pub type HashError = serde_json::Error;

/// A truncated content hash, e.g. `"1d4f0b...e9"` (32 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Checksum(pub String);

impl std::fmt::Display for Checksum {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn checksum(&self) -> Result<Checksum, HashError> {
    let serialized = serde_json::to_vec(self)?;
    Ok(hash_bytes(&serialized))
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> Checksum {
  let digest = Sha256::digest(data);
  let mut hex = hex::encode(digest);
  hex.truncate(CHECKSUM_LEN);
  Checksum(hex)
}
