//! skiff-lib: service descriptors to scheduler deployments
//!
//! This crate turns layered YAML service descriptors into scheduler manifests
//! and reconciles them against a Marathon-style scheduler:
//! - `document`: loading and deep-merging descriptor layers
//! - `variables`: `%{name}` substitution over a layered scope
//! - `artifact`: Maven version resolution and manifest templates
//! - `manifest`: scheduler manifest normalization and checksums
//! - `service`: the per-file pipeline tying the above together
//! - `secrets`: plaintext secret detection
//! - `deploy`: validate-then-reconcile deployment runs

pub mod artifact;
pub mod consts;
pub mod deploy;
pub mod document;
pub mod http;
pub mod manifest;
pub mod placeholder;
pub mod secrets;
pub mod service;
pub mod util;
pub mod variables;
