//! Per-package build pipeline.
//!
//! A [`PackageBuilder`] owns one build workspace from creation to removal:
//!
//! 1. `unpack` - extract the source archive into `<builddir>/<name>`
//! 2. `populate_metadata` - generate `<builddir>/<name>/debian`
//! 3. `build_package` - run the package builder, then delete the workspace
//!
//! The workspace is deleted only after a successful build. When a step fails
//! it is left in place for inspection.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::PackageSpec;
use crate::debian::{self, MetadataError};
use crate::exec::{Invocation, ToolError, ToolRunner, Tools};
use crate::unpack::{self, UnpackError};

/// Default target distribution.
pub const DEFAULT_DISTRIBUTION: &str = "lernstick-8";

/// Flags for an unsigned, fakeroot-based binary and source build.
pub const BUILDPACKAGE_ARGS: [&str; 3] = ["-rfakeroot", "-uc", "-us"];

/// Errors that can occur during a package build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Unpack(#[from] UnpackError),

  #[error(transparent)]
  Metadata(#[from] MetadataError),

  #[error("package build failed: {0}")]
  Tool(#[from] ToolError),

  #[error("failed to remove workspace {}: {source}", path.display())]
  Cleanup { path: PathBuf, source: std::io::Error },
}

impl BuildError {
  /// Whether the source archive lacked a single top-level directory.
  pub fn is_invalid_source(&self) -> bool {
    matches!(self, BuildError::Unpack(UnpackError::InvalidSource { .. }))
  }
}

/// Where and for which distribution packages are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
  pub distribution: String,

  /// Holds workspaces, orig symlinks and the built packages
  pub builddir: PathBuf,

  /// Base for relative `source` and `icon` paths
  pub basedir: PathBuf,

  pub tools: Tools,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      distribution: DEFAULT_DISTRIBUTION.to_string(),
      builddir: PathBuf::from("build"),
      basedir: PathBuf::from("sources"),
      tools: Tools::default(),
    }
  }
}

/// Progress of a single package build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Pending,
  Unpacking,
  Populating,
  Building,
  Done,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Pending => "pending",
      Stage::Unpacking => "unpacking",
      Stage::Populating => "populating",
      Stage::Building => "building",
      Stage::Done => "done",
    };
    f.write_str(name)
  }
}

/// Builds one package.
pub struct PackageBuilder<'a, R: ToolRunner> {
  spec: PackageSpec,
  options: &'a BuildOptions,
  runner: &'a R,
  stage: Stage,
}

impl<'a, R: ToolRunner> PackageBuilder<'a, R> {
  pub fn new(spec: PackageSpec, options: &'a BuildOptions, runner: &'a R) -> Self {
    Self {
      spec,
      options,
      runner,
      stage: Stage::Pending,
    }
  }

  pub fn spec(&self) -> &PackageSpec {
    &self.spec
  }

  /// The current stage; after a failure, the stage that failed.
  pub fn stage(&self) -> Stage {
    self.stage
  }

  /// `<builddir>/<name>`
  pub fn workspace(&self) -> PathBuf {
    self.options.builddir.join(&self.spec.name)
  }

  /// Run all steps in order, stopping at the first failure.
  pub fn build(&mut self) -> Result<(), BuildError> {
    self.unpack()?;
    self.populate_metadata()?;
    self.build_package()?;
    Ok(())
  }

  pub fn unpack(&mut self) -> Result<(), BuildError> {
    self.enter(Stage::Unpacking);
    let archive = self.options.basedir.join(&self.spec.source);
    unpack::unpack_source(
      &archive,
      &self.options.builddir,
      &self.spec.name,
      &self.spec.upstream_version,
    )?;
    Ok(())
  }

  pub fn populate_metadata(&mut self) -> Result<(), BuildError> {
    self.enter(Stage::Populating);
    debian::populate(&self.spec, &self.workspace(), self.options, self.runner)?;
    Ok(())
  }

  /// Run the package builder in the workspace and delete the workspace.
  pub fn build_package(&mut self) -> Result<(), BuildError> {
    self.enter(Stage::Building);
    let workspace = self.workspace();

    let invocation = BUILDPACKAGE_ARGS
      .iter()
      .fold(Invocation::new(&self.options.tools.buildpackage, &workspace), |inv, arg| {
        inv.arg(*arg)
      });
    self.runner.run(&invocation)?;

    remove_workspace(&workspace)?;
    self.enter(Stage::Done);
    Ok(())
  }

  fn enter(&mut self, stage: Stage) {
    debug!(package = %self.spec.name, from = %self.stage, to = %stage, "stage transition");
    self.stage = stage;
  }
}

fn remove_workspace(workspace: &Path) -> Result<(), BuildError> {
  info!(path = %workspace.display(), "removing workspace");
  fs::remove_dir_all(workspace).map_err(|source| BuildError::Cleanup {
    path: workspace.to_path_buf(),
    source,
  })
}
