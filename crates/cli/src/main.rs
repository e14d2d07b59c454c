mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use passepartout_lib::build::{BuildOptions, DEFAULT_DISTRIBUTION};
use passepartout_lib::config::ConfigFile;
use passepartout_lib::exec::{SystemRunner, Tools};
use passepartout_lib::run::{FailurePolicy, RunReport, run};

use crate::output::{print_error, print_success, print_warning};

/// Build Debian packages for static content described in a YAML file
#[derive(Parser)]
#[command(name = "passepartout-package")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the package configuration file
  config: PathBuf,

  /// Packages to build (default: every package in the config)
  packages: Vec<String>,

  /// Target distribution written to the changelog
  #[arg(short, long, default_value = DEFAULT_DISTRIBUTION)]
  distribution: String,

  /// Directory holding workspaces and built packages
  #[arg(short, long, default_value = "build")]
  builddir: PathBuf,

  /// Base directory for relative source and icon paths (default: config file directory)
  #[arg(long)]
  basedir: Option<PathBuf>,

  /// Log progress
  #[arg(short, long)]
  verbose: bool,

  /// Log every step
  #[arg(long)]
  debug: bool,

  /// Continue with the remaining packages after a failure
  #[arg(short, long)]
  keep_going: bool,
}

impl Cli {
  fn log_level(&self) -> &'static str {
    if self.debug {
      "debug"
    } else if self.verbose {
      "info"
    } else {
      "warn"
    }
  }

  fn policy(&self) -> FailurePolicy {
    if self.keep_going {
      FailurePolicy::KeepGoing
    } else {
      FailurePolicy::Abort
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if !cli.config.is_file() {
    bail!("Config file not found: {}", cli.config.display());
  }

  let options = BuildOptions {
    distribution: cli.distribution.clone(),
    builddir: cli.builddir.clone(),
    basedir: resolve_basedir(&cli.config, cli.basedir.as_deref())?,
    tools: Tools::from_env(),
  };
  debug!(?options, "build options");

  let config = ConfigFile::load(&cli.config).context("Failed to load config")?;

  let report = run(&config, &cli.packages, &options, &SystemRunner, cli.policy()).context("Build aborted")?;
  summarize(&report)
}

/// `--basedir` if given, otherwise the directory of the canonical config path.
fn resolve_basedir(config: &Path, basedir: Option<&Path>) -> Result<PathBuf> {
  if let Some(basedir) = basedir {
    return Ok(basedir.to_path_buf());
  }

  let canonical =
    dunce::canonicalize(config).with_context(|| format!("Failed to resolve config path {}", config.display()))?;
  canonical
    .parent()
    .map(Path::to_path_buf)
    .with_context(|| format!("Config path {} has no parent directory", canonical.display()))
}

fn summarize(report: &RunReport) -> Result<()> {
  for name in report.built() {
    print_success(&format!("Built package '{name}'"));
  }

  if report.is_success() {
    return Ok(());
  }

  for (name, stage, error) in report.failed() {
    print_warning(&format!("Package '{name}' failed while {stage}: {error}"));
  }
  let failed = report.failed().count();
  print_error(&format!("{failed} of {} package(s) failed", report.outcomes.len()));
  bail!("{failed} package(s) failed to build")
}
