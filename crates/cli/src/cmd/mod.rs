mod deploy;
mod verify;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use skiff_lib::artifact::HttpArtifactRepository;
use skiff_lib::http::{ClientConfig, DEFAULT_TIMEOUT};
use skiff_lib::secrets::SecretPolicy;
use skiff_lib::service::{ParseOptions, Service, ServiceParser, write_services};

use crate::output::print_warning;

pub use deploy::{DeployArgs, cmd_deploy};
pub use verify::cmd_verify;

/// Options shared by every command that resolves service descriptors.
#[derive(Debug, Args)]
pub struct ResolveArgs {
  /// Profile overlay merged beneath each service file (repeatable, in order)
  #[arg(short = 'p', long = "profile", value_name = "FILE")]
  pub profiles: Vec<PathBuf>,

  /// Write each resolved manifest as JSON under this directory
  #[arg(short = 't', long = "target-dir", value_name = "DIR")]
  pub target_dir: Option<PathBuf>,

  /// Fail on plaintext secrets instead of warning
  #[arg(short = 'f', long = "verify-secrets")]
  pub verify_secrets: bool,

  /// Timeout for each HTTP request (e.g. "30s", "2m")
  #[arg(long, value_name = "DURATION", default_value = "30s", value_parser = humantime::parse_duration)]
  pub timeout: Duration,

  /// Service descriptor files
  #[arg(required = true, value_name = "FILES")]
  pub files: Vec<PathBuf>,
}

impl ResolveArgs {
  pub fn client_config(&self) -> ClientConfig {
    if self.timeout.is_zero() {
      ClientConfig::with_timeout(DEFAULT_TIMEOUT)
    } else {
      ClientConfig::with_timeout(self.timeout)
    }
  }

  pub fn parser(&self) -> Result<ServiceParser<HttpArtifactRepository>> {
    let repository = HttpArtifactRepository::new(&self.client_config()).context("Failed to create HTTP client")?;
    let options = ParseOptions::default().with_profiles(self.profiles.iter().cloned());
    Ok(ServiceParser::new(repository, options))
  }

  /// Parse every file, check secrets and write manifests when asked to.
  pub async fn resolve(&self) -> Result<Vec<Service>> {
    let services = self.parser()?.parse_all(&self.files).await?;

    let findings = SecretPolicy::default()
      .verify(&services, self.verify_secrets)
      .context("Secret verification failed")?;
    if !findings.is_empty() {
      print_warning(&format!(
        "{} unencrypted secret(s) found; use --verify-secrets to fail instead",
        findings.len()
      ));
    }

    if let Some(target_dir) = &self.target_dir {
      let written = write_services(target_dir, &services).context("Failed to write manifests")?;
      info!(count = written.len(), dir = %target_dir.display(), "wrote manifests");
    }

    Ok(services)
  }
}
