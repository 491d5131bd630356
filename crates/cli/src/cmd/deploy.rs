//! Implementation of the `skiff deploy` command.
//!
//! Resolves every descriptor, then reconciles the resulting manifests with the
//! scheduler. Nothing is sent to the scheduler unless every file resolves.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use skiff_lib::deploy::{Deployer, RedeployPolicy, SchedulerClient};
use skiff_lib::service::Service;

use super::ResolveArgs;
use crate::output::{OutputFormat, format_duration, print_info, print_json, print_outcome, print_success, truncate_hash};

#[derive(Debug, Args)]
pub struct DeployArgs {
  /// Scheduler base URL; overrides scheduler.urls.<environment> in the files
  #[arg(short = 'm', long = "scheduler-url", env = "SKIFF_SCHEDULER_URL", value_name = "URL")]
  pub scheduler_url: Option<String>,

  /// Resolve and verify only; do not contact the scheduler
  #[arg(short = 'n', long)]
  pub dry_run: bool,

  /// Do not redeploy apps whose checksum label already matches
  #[arg(long)]
  pub skip_unchanged: bool,

  #[command(flatten)]
  pub resolve: ResolveArgs,
}

/// Execute the deploy command.
pub fn cmd_deploy(args: DeployArgs, format: OutputFormat) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(run(args, format))
}

async fn run(args: DeployArgs, format: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let services = args.resolve.resolve().await?;

  if args.dry_run {
    print_dry_run(&services, format)?;
    return Ok(());
  }

  let policy = if args.skip_unchanged {
    RedeployPolicy::SkipUnchanged
  } else {
    RedeployPolicy::Always
  };
  debug!(?policy, services = services.len(), "deploying");

  let scheduler = SchedulerClient::new(&args.resolve.client_config()).context("Failed to create HTTP client")?;
  let deployer = Deployer::new(scheduler).with_policy(policy);
  let deployments = deployer.deploy(services, args.scheduler_url.as_deref()).await?;

  if format.is_json() {
    let items: Vec<_> = deployments
      .iter()
      .map(|d| {
        serde_json::json!({
          "path": d.service.path,
          "id": d.service.id(),
          "target": d.target,
          "checksum": d.service.checksum(),
          "outcome": d.outcome.to_string(),
        })
      })
      .collect();
    return print_json(&items);
  }

  for deployment in &deployments {
    print_outcome(deployment.outcome, deployment.service.id(), &deployment.target);
  }
  print_success(&format!(
    "Deployed {} service(s) in {}",
    deployments.len(),
    format_duration(start.elapsed())
  ));
  Ok(())
}

fn print_dry_run(services: &[Service], format: OutputFormat) -> Result<()> {
  if format.is_json() {
    let manifests: Vec<_> = services.iter().map(|s| s.manifest.to_json()).collect();
    return print_json(&manifests);
  }

  for service in services {
    print_info(&format!(
      "{} ({}) checksum {}",
      service.id(),
      service.path.display(),
      truncate_hash(&service.checksum().0)
    ));
  }
  print_success(&format!("Dry run: {} service(s) resolved, nothing deployed", services.len()));
  Ok(())
}
