//! Multi-package orchestration.
//!
//! Packages are built one at a time, in the order given. Each package moves
//! through [`Stage`]s independently; what happens after a failure is decided
//! by the [`FailurePolicy`].

use thiserror::Error;
use tracing::{error, info, info_span};

use crate::build::{BuildError, BuildOptions, PackageBuilder, Stage};
use crate::config::{ConfigError, ConfigFile};
use crate::exec::ToolRunner;

/// What to do when a package fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
  /// Stop at the first failing package and return its error.
  #[default]
  Abort,

  /// Record the failure and continue with the remaining packages.
  KeepGoing,
}

/// Why a single package failed.
#[derive(Debug, Error)]
pub enum PackageError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Build(#[from] BuildError),
}

/// Error returned under [`FailurePolicy::Abort`].
#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to build package '{name}' while {stage}: {source}")]
  Package {
    name: String,
    stage: Stage,
    #[source]
    source: PackageError,
  },
}

/// Final state of one requested package.
#[derive(Debug)]
pub enum PackageOutcome {
  Built,
  Failed { stage: Stage, error: PackageError },
}

impl PackageOutcome {
  pub fn is_built(&self) -> bool {
    matches!(self, PackageOutcome::Built)
  }
}

/// Outcomes of every attempted package, in build order.
#[derive(Debug, Default)]
pub struct RunReport {
  pub outcomes: Vec<(String, PackageOutcome)>,
}

impl RunReport {
  pub fn built(&self) -> impl Iterator<Item = &str> {
    self
      .outcomes
      .iter()
      .filter(|(_, outcome)| outcome.is_built())
      .map(|(name, _)| name.as_str())
  }

  pub fn failed(&self) -> impl Iterator<Item = (&str, Stage, &PackageError)> {
    self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
      PackageOutcome::Failed { stage, error } => Some((name.as_str(), *stage, error)),
      PackageOutcome::Built => None,
    })
  }

  pub fn is_success(&self) -> bool {
    self.outcomes.iter().all(|(_, outcome)| outcome.is_built())
  }
}

/// Build `packages`, or every non-default package in `config` when empty.
///
/// # Errors
///
/// Under [`FailurePolicy::Abort`], returns the first package failure after
/// logging it. Under [`FailurePolicy::KeepGoing`] failures are only reported
/// in the returned [`RunReport`].
pub fn run(
  config: &ConfigFile,
  packages: &[String],
  options: &BuildOptions,
  runner: &impl ToolRunner,
  policy: FailurePolicy,
) -> Result<RunReport, RunError> {
  let selected = if packages.is_empty() {
    config.package_names()
  } else {
    packages.to_vec()
  };

  let mut report = RunReport::default();

  for name in selected {
    let _span = info_span!("package", package = %name).entered();
    info!("Starting build of package '{name}'");

    match build_one(config, &name, options, runner) {
      Ok(()) => {
        info!("Finished build of package '{name}'");
        report.outcomes.push((name, PackageOutcome::Built));
      }
      Err((stage, error)) => {
        error!(stage = %stage, error = %error, "Failed to build package '{name}'.");
        match policy {
          FailurePolicy::Abort => {
            return Err(RunError::Package {
              name,
              stage,
              source: error,
            });
          }
          FailurePolicy::KeepGoing => report.outcomes.push((name, PackageOutcome::Failed { stage, error })),
        }
      }
    }
  }

  Ok(report)
}

fn build_one(
  config: &ConfigFile,
  name: &str,
  options: &BuildOptions,
  runner: &impl ToolRunner,
) -> Result<(), (Stage, PackageError)> {
  let spec = config.package(name).map_err(|e| (Stage::Pending, e.into()))?;
  let mut builder = PackageBuilder::new(spec, options, runner);
  builder.build().map_err(|e| (builder.stage(), e.into()))
}
