//! Shared test helpers for CLI integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// Records its arguments and creates the changelog in the working directory.
const FAKE_DCH: &str = r#"#!/bin/sh
echo "dch $*" >> "$FAKE_TOOL_LOG"
mkdir -p debian
echo "fake changelog" > debian/changelog
"#;

/// Records its arguments and working directory, exiting with `$FAKE_BUILD_EXIT`.
const FAKE_BUILDPACKAGE: &str = r#"#!/bin/sh
echo "dpkg-buildpackage $* in $(basename "$PWD")" >> "$FAKE_TOOL_LOG"
test -f debian/control || exit 9
exit "${FAKE_BUILD_EXIT:-0}"
"#;

/// Isolated test environment.
///
/// Holds the config file, source tarballs and the build directory in one
/// temporary directory, with both packaging tools replaced by scripts.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  pub fn new(config: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("packages.yaml");
    fs::write(&config_path, config).unwrap();

    let env = Self { temp, config_path };
    env.write_script("bin/dch", FAKE_DCH);
    env.write_script("bin/dpkg-buildpackage", FAKE_BUILDPACKAGE);
    env
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  pub fn build_dir(&self) -> PathBuf {
    self.path("build")
  }

  /// Write a gzip tarball whose entries all live under `root`.
  pub fn write_source(&self, archive: &str, root: &str, files: &[(&str, &str)]) {
    let entries: Vec<(String, &str)> = files
      .iter()
      .map(|(name, content)| (format!("{root}/{name}"), *content))
      .collect();
    self.write_tarball(archive, &entries);
  }

  /// Write a gzip tarball with the given entries at the top level.
  pub fn write_tarball(&self, archive: &str, files: &[(String, &str)]) {
    let file = fs::File::create(self.path(archive)).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
      let mut header = tar::Header::new_gnu();
      header.set_size(content.len() as u64);
      header.set_mode(0o644);
      header.set_cksum();
      builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
  }

  pub fn write_file(&self, relative_path: &str, content: &[u8]) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  fn write_script(&self, relative_path: &str, content: &str) {
    self.write_file(relative_path, content.as_bytes());
    fs::set_permissions(self.path(relative_path), fs::Permissions::from_mode(0o755)).unwrap();
  }

  /// Lines recorded by the stand-in tools, in call order.
  pub fn tool_log(&self) -> Vec<String> {
    fs::read_to_string(self.path("tools.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Command for the binary with the config path and build directory set.
  ///
  /// Sets environment variables for isolated testing:
  /// - `PASSEPARTOUT_DCH`, `PASSEPARTOUT_DPKG_BUILDPACKAGE`: stand-in tools
  /// - `FAKE_TOOL_LOG`: where the stand-ins record their calls
  pub fn package_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("passepartout-package");
    cmd.env("PASSEPARTOUT_DCH", self.path("bin/dch"));
    cmd.env("PASSEPARTOUT_DPKG_BUILDPACKAGE", self.path("bin/dpkg-buildpackage"));
    cmd.env("FAKE_TOOL_LOG", self.path("tools.log"));
    cmd.env_remove("RUST_LOG");
    cmd.arg(&self.config_path).arg("--builddir").arg(self.build_dir());
    cmd
  }
}

pub fn is_symlink(path: &Path) -> bool {
  fs::symlink_metadata(path).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}
