//! Implementation of the `skiff verify` command.

use anyhow::{Context, Result};

use super::ResolveArgs;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

/// Resolve every descriptor and check it for plaintext secrets.
pub fn cmd_verify(args: ResolveArgs, format: OutputFormat) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let services = rt.block_on(args.resolve())?;

  if format.is_json() {
    let items: Vec<_> = services
      .iter()
      .map(|s| {
        serde_json::json!({
          "path": s.path,
          "id": s.id(),
          "environment": s.environment,
          "checksum": s.checksum(),
          "scheduler_url": s.scheduler_url,
        })
      })
      .collect();
    return print_json(&items);
  }

  for service in &services {
    print_success(&format!("{} ({})", service.id(), service.path.display()));
    print_stat("Environment", &service.environment);
    if let Some(artifact) = &service.artifact {
      print_stat("Build", &artifact.build);
    }
  }
  Ok(())
}
