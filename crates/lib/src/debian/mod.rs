//! Generation of the `debian/` metadata directory.
//!
//! The directory is always recreated from scratch. Files are written in a
//! fixed order and nothing is rolled back on failure; a partially populated
//! directory is removed by the next run.

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::build::BuildOptions;
use crate::config::{MenuItem, PackageSpec};
use crate::exec::{Invocation, ToolError, ToolRunner};
use crate::template::{self, Context, TemplateError};

pub use templates::*;

/// Entry passed to the changelog tool.
pub const CHANGELOG_MESSAGE: &str = "This package was created with passepartout-package";

/// Errors that can occur while populating the metadata directory.
#[derive(Debug, Error)]
pub enum MetadataError {
  #[error("failed to render {}: {source}", path.display())]
  Render { path: PathBuf, source: TemplateError },

  #[error("io error on {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("changelog creation failed: {0}")]
  Changelog(#[from] ToolError),
}

/// Populate `<workspace>/debian` for `spec`.
///
/// Returns the path of the metadata directory.
pub fn populate(
  spec: &PackageSpec,
  workspace: &Path,
  options: &BuildOptions,
  runner: &impl ToolRunner,
) -> Result<PathBuf, MetadataError> {
  let debian = workspace.join("debian");
  info!(path = %debian.display(), "populating metadata directory");

  if debian.exists() {
    debug!("removing existing metadata directory");
    fs::remove_dir_all(&debian).map_err(|source| io_err(&debian, source))?;
  }
  fs::create_dir(&debian).map_err(|source| io_err(&debian, source))?;
  fs::create_dir(debian.join("source")).map_err(|source| io_err(&debian, source))?;

  let context = Context::new(spec.values());

  write_template(&debian.join("control"), CONTROL, &context)?;
  write_template(&debian.join("rules"), RULES, &context)?;
  make_executable(&debian.join("rules"))?;

  create_changelog(spec, workspace, options, runner)?;

  for (index, item) in spec.menuitems.iter().enumerate() {
    let item_values = menu_item_values(item);
    let path = debian.join(format!("{}-{}.desktop", spec.name, index + 1));
    write_template(&path, MENU_DESKTOP, &Context::new(spec.values()).overlay(&item_values))?;
  }

  if spec.menu_directory {
    write_template(&debian.join(format!("{}.directory", spec.name)), MENU_DIRECTORY, &context)?;
    write_template(&debian.join(format!("{}.merge.menu", spec.name)), MERGE_MENU, &context)?;
  }

  write_template(&debian.join("compat"), COMPAT, &context)?;
  write_template(&debian.join("source/format"), SOURCE_FORMAT, &context)?;
  write_template(&debian.join("source/options"), SOURCE_OPTIONS, &context)?;
  write_template(
    &debian.join("source/include-binaries"),
    SOURCE_INCLUDE_BINARIES,
    &context,
  )?;

  if let Some(icon) = &spec.icon {
    let from = options.basedir.join(icon);
    let to = debian.join(format!("{}.png", spec.name));
    debug!(from = %from.display(), to = %to.display(), "copying icon");
    fs::copy(&from, &to).map_err(|source| io_err(&from, source))?;
  }

  Ok(debian)
}

fn create_changelog(
  spec: &PackageSpec,
  workspace: &Path,
  options: &BuildOptions,
  runner: &impl ToolRunner,
) -> Result<(), MetadataError> {
  let invocation = Invocation::new(&options.tools.changelog, workspace)
    .arg("-v")
    .arg(spec.full_version())
    .arg("--create")
    .arg("-D")
    .arg(&options.distribution)
    .arg("--force-distribution")
    .arg("--package")
    .arg(&spec.name)
    .arg(CHANGELOG_MESSAGE);

  runner.run(&invocation)?;
  Ok(())
}

fn menu_item_values(item: &MenuItem) -> Mapping {
  let mut values = Mapping::new();
  values.insert(Value::from("title"), Value::from(item.title.as_str()));
  values.insert(Value::from("directory"), Value::from(item.directory.as_str()));
  values.insert(Value::from("start_page"), Value::from(item.start_page.as_str()));
  values
}

fn write_template(path: &Path, template: &str, context: &Context<'_>) -> Result<(), MetadataError> {
  let rendered = template::render(template, context).map_err(|source| MetadataError::Render {
    path: path.to_path_buf(),
    source,
  })?;
  fs::write(path, rendered).map_err(|source| io_err(path, source))?;
  debug!(path = %path.display(), "wrote template");
  Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), MetadataError> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| io_err(path, source))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), MetadataError> {
  Ok(())
}

fn io_err(path: &Path, source: std::io::Error) -> MetadataError {
  MetadataError::Io {
    path: path.to_path_buf(),
    source,
  }
}
