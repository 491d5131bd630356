//! Deployment orchestration.
//!
//! A deployment run is all-or-nothing up to the first scheduler call:
//!
//! 1. every descriptor is parsed; any failure aborts the run
//! 2. every service gets a target scheduler URL; a service without one aborts
//!    the run
//! 3. only then is each service reconciled in turn: the current app is read
//!    and the new manifest written according to the [`RedeployPolicy`]
//!
//! Scheduler failures in step 3 stop the run at the failing service.

mod client;

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::artifact::ArtifactRepository;
use crate::service::{ParseError, Service, ServiceParser};

pub use client::{App, Scheduler, SchedulerClient, SchedulerError, app_url};

/// When to write a manifest the scheduler may already be running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedeployPolicy {
  /// Always `PUT`, even if the running app has the same checksum.
  #[default]
  Always,
  /// Skip the `PUT` when the running app's checksum label matches.
  SkipUnchanged,
}

/// What happened to one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
  Created,
  Updated,
  Unchanged,
}

impl std::fmt::Display for DeployOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Created => "created",
      Self::Updated => "updated",
      Self::Unchanged => "unchanged",
    })
  }
}

/// A service and what was done with it.
#[derive(Debug, Clone)]
pub struct Deployment {
  pub service: Service,
  pub target: String,
  pub outcome: DeployOutcome,
}

#[derive(Debug, Error)]
pub enum DeployError {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error("No scheduler URL defined for service {}", .path.display())]
  NoDeploymentTarget { path: PathBuf },

  #[error("failed to deploy {}: {source}", .path.display())]
  Scheduler {
    path: PathBuf,
    #[source]
    source: SchedulerError,
  },
}

/// Reconciles services against a [`Scheduler`].
pub struct Deployer<S> {
  scheduler: S,
  policy: RedeployPolicy,
}

impl<S: Scheduler> Deployer<S> {
  pub fn new(scheduler: S) -> Self {
    Self {
      scheduler,
      policy: RedeployPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: RedeployPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// The scheduler URL of every service.
  ///
  /// `base_url` wins over each document's `scheduler.urls.<environment>`.
  pub fn targets(services: &[Service], base_url: Option<&str>) -> Result<Vec<String>, DeployError> {
    services
      .iter()
      .map(|service| {
        base_url
          .map(str::to_string)
          .or_else(|| service.scheduler_url.clone())
          .ok_or_else(|| DeployError::NoDeploymentTarget {
            path: service.path.clone(),
          })
      })
      .collect()
  }

  /// Bring one service's app in line with its manifest.
  pub async fn reconcile(&self, service: &Service, target: &str) -> Result<DeployOutcome, SchedulerError> {
    let current = self.scheduler.get_app(target, service.id()).await?;

    let outcome = match &current {
      None => DeployOutcome::Created,
      Some(app) if self.policy == RedeployPolicy::SkipUnchanged && app.checksum() == Some(service.checksum().0.as_str()) => {
        info!(id = %service.id(), checksum = %service.checksum(), "app unchanged, skipping");
        return Ok(DeployOutcome::Unchanged);
      }
      Some(_) => DeployOutcome::Updated,
    };

    self
      .scheduler
      .put_app(target, service.id(), &service.manifest.to_json())
      .await?;
    info!(id = %service.id(), target, %outcome, "deployed app");
    Ok(outcome)
  }

  /// Resolve targets for all services, then reconcile them in order.
  pub async fn deploy(&self, services: Vec<Service>, base_url: Option<&str>) -> Result<Vec<Deployment>, DeployError> {
    let targets = Self::targets(&services, base_url)?;

    let mut deployments = Vec::with_capacity(services.len());
    for (service, target) in services.into_iter().zip(targets) {
      let outcome = self
        .reconcile(&service, &target)
        .await
        .map_err(|source| DeployError::Scheduler {
          path: service.path.clone(),
          source,
        })?;
      deployments.push(Deployment {
        service,
        target,
        outcome,
      });
    }
    Ok(deployments)
  }
}

/// Parse `paths` and deploy the resulting services.
///
/// Nothing is sent to the scheduler unless every file parses and every
/// service has a target.
pub async fn deploy<R, S>(
  parser: &ServiceParser<R>,
  deployer: &Deployer<S>,
  base_url: Option<&str>,
  paths: &[PathBuf],
) -> Result<Vec<Deployment>, DeployError>
where
  R: ArtifactRepository,
  S: Scheduler,
{
  let services = parser.parse_all(paths).await?;
  deployer.deploy(services, base_url).await
}
