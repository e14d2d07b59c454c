//! External tool invocation.
//!
//! Every tool runs with an explicit working directory handed to the child
//! process. The current directory of this process is never changed, so a
//! failing tool cannot leave it pointing somewhere else.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

/// Environment variable overriding the changelog tool.
pub const CHANGELOG_TOOL_ENV: &str = "PASSEPARTOUT_DCH";

/// Environment variable overriding the package build tool.
pub const BUILDPACKAGE_TOOL_ENV: &str = "PASSEPARTOUT_DPKG_BUILDPACKAGE";

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to start {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  #[error("{program} failed with exit code {code:?}")]
  Failed { program: String, code: Option<i32> },
}

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }
}

/// Runs external commands to completion.
pub trait ToolRunner {
  /// Run the command and block until it exits.
  ///
  /// Returns an error if the program cannot be started or exits unsuccessfully.
  fn run(&self, invocation: &Invocation) -> Result<(), ToolError>;
}

/// Runs commands as child processes.
///
/// Stdin and stdout are attached to the null device. Stderr is inherited so
/// tool diagnostics still reach the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
    info!(program = %invocation.program, args = ?invocation.args, "running tool");
    debug!(cwd = %invocation.cwd.display(), "spawning process");

    let status = Command::new(&invocation.program)
      .args(&invocation.args)
      .current_dir(&invocation.cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .status()
      .map_err(|source| ToolError::Spawn {
        program: invocation.program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(ToolError::Failed {
        program: invocation.program.clone(),
        code: status.code(),
      });
    }

    Ok(())
  }
}

/// Program names of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
  /// Changelog generator, `dch` from devscripts
  pub changelog: String,

  /// Native package builder
  pub buildpackage: String,
}

impl Default for Tools {
  fn default() -> Self {
    Self {
      changelog: "dch".to_string(),
      buildpackage: "dpkg-buildpackage".to_string(),
    }
  }
}

impl Tools {
  /// Defaults, overridden by [`CHANGELOG_TOOL_ENV`] and [`BUILDPACKAGE_TOOL_ENV`].
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      changelog: std::env::var(CHANGELOG_TOOL_ENV).unwrap_or(defaults.changelog),
      buildpackage: std::env::var(BUILDPACKAGE_TOOL_ENV).unwrap_or(defaults.buildpackage),
    }
  }
}
