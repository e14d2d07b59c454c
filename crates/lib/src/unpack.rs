//! Source archive unpacking.
//!
//! A source archive must hold a single top-level directory. It is extracted
//! into the build directory, the top-level directory is renamed to the
//! package name, and a `<name>_<version>.orig.tar<ext>` symlink to the
//! archive is placed next to it for the Debian tooling.
//!
//! Supports:
//! - `.tar`
//! - `.tar.gz` / `.tgz`
//! - `.tar.bz2`
//! - `.tar.xz`
//!
//! The compression is detected from the archive's magic bytes, not its name.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;

/// Errors that can occur while unpacking a source archive.
#[derive(Debug, Error)]
pub enum UnpackError {
  /// The archive does not consist of a single top-level directory.
  #[error("invalid source {}: source tarfile must contain a common base directory", archive.display())]
  InvalidSource { archive: PathBuf },

  #[error("unsupported {compression} compression: {}", archive.display())]
  UnsupportedCompression {
    archive: PathBuf,
    compression: &'static str,
  },

  #[error("refusing to extract {} outside of the build directory", entry.display())]
  UnsafeEntry { entry: PathBuf },

  #[error("failed to read archive {}: {source}", archive.display())]
  Read { archive: PathBuf, source: std::io::Error },

  #[error("io error on {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },
}

/// Paths produced by [`unpack_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
  /// `<builddir>/<name>`
  pub workspace: PathBuf,

  /// `<builddir>/<name>_<version>.orig.tar<ext>`
  pub orig_link: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
  None,
  Gzip,
  Bzip2,
  Xz,
}

/// Unpack `archive` into `builddir` as `<builddir>/<name>`.
///
/// A workspace left behind by an earlier failed build and a stale orig
/// symlink are both replaced, so unpacking the same package twice succeeds.
///
/// # Errors
///
/// Returns [`UnpackError::InvalidSource`] if the archive lacks a single
/// top-level directory. No renamed workspace exists in that case.
pub fn unpack_source(
  archive: &Path,
  builddir: &Path,
  name: &str,
  upstream_version: &str,
) -> Result<Unpacked, UnpackError> {
  info!(archive = %archive.display(), builddir = %builddir.display(), "unpacking source");

  fs::create_dir_all(builddir).map_err(|source| io_err(builddir, source))?;

  let workspace = builddir.join(name);
  remove_stale(&workspace)?;

  let entries = extract(archive, builddir)?;

  let root = common_root(&entries)
    .filter(|root| builddir.join(root).is_dir())
    .ok_or_else(|| UnpackError::InvalidSource {
      archive: archive.to_path_buf(),
    })?;
  debug!(root = %root.display(), "archive root");

  if root != Path::new(name) {
    let extracted = builddir.join(&root);
    fs::rename(&extracted, &workspace).map_err(|source| io_err(&extracted, source))?;
  }

  let orig_link = builddir.join(format!(
    "{name}_{upstream_version}.orig.tar{}",
    orig_extension(archive)
  ));
  link_orig_tarball(archive, &orig_link)?;

  info!(workspace = %workspace.display(), orig = %orig_link.display(), "source unpacked");
  Ok(Unpacked { workspace, orig_link })
}

/// Extension appended to `.orig.tar`, keeping the compression suffix.
pub fn orig_extension(archive: &Path) -> String {
  match archive.extension().and_then(|ext| ext.to_str()) {
    None | Some("tar") => String::new(),
    Some("tgz") => ".gz".to_string(),
    Some(ext) => format!(".{ext}"),
  }
}

fn extract(archive: &Path, builddir: &Path) -> Result<Vec<PathBuf>, UnpackError> {
  let read_err = |source| UnpackError::Read {
    archive: archive.to_path_buf(),
    source,
  };

  let compression = detect_compression(archive)?;
  debug!(?compression, "detected compression");

  let file = BufReader::new(File::open(archive).map_err(read_err)?);
  let reader: Box<dyn Read> = match compression {
    Compression::Gzip => Box::new(GzDecoder::new(file)),
    Compression::Bzip2 => Box::new(BzDecoder::new(file)),
    Compression::Xz => Box::new(XzDecoder::new(file)),
    Compression::None => Box::new(file),
  };

  let mut tar = Archive::new(reader);
  let mut names = Vec::new();

  for entry in tar.entries().map_err(read_err)? {
    let mut entry = entry.map_err(read_err)?;
    let path = entry.path().map_err(read_err)?.into_owned();

    if !entry.unpack_in(builddir).map_err(read_err)? {
      return Err(UnpackError::UnsafeEntry { entry: path });
    }
    names.push(path);
  }

  debug!(entries = names.len(), "extracted archive");
  Ok(names)
}

fn detect_compression(archive: &Path) -> Result<Compression, UnpackError> {
  let mut magic = [0u8; 6];
  let mut file = File::open(archive).map_err(|source| UnpackError::Read {
    archive: archive.to_path_buf(),
    source,
  })?;
  let len = file.read(&mut magic).map_err(|source| UnpackError::Read {
    archive: archive.to_path_buf(),
    source,
  })?;

  match &magic[..len] {
    [0x1f, 0x8b, ..] => Ok(Compression::Gzip),
    [b'B', b'Z', b'h', ..] => Ok(Compression::Bzip2),
    [0xfd, b'7', b'z', b'X', b'Z', 0x00] => Ok(Compression::Xz),
    [0x28, 0xb5, 0x2f, 0xfd, ..] => Err(UnpackError::UnsupportedCompression {
      archive: archive.to_path_buf(),
      compression: "zstd",
    }),
    _ => Ok(Compression::None),
  }
}

/// Longest common component prefix of all entry paths.
///
/// `.` components are ignored so archives built from `./` still have a root.
fn common_root(entries: &[PathBuf]) -> Option<PathBuf> {
  let mut prefix: Option<Vec<OsString>> = None;

  for entry in entries {
    let components: Vec<OsString> = entry
      .components()
      .filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_os_string()),
        _ => None,
      })
      .collect();

    if components.is_empty() {
      continue;
    }

    prefix = Some(match prefix {
      None => components,
      Some(mut prefix) => {
        let common = prefix.iter().zip(&components).take_while(|(a, b)| a == b).count();
        prefix.truncate(common);
        prefix
      }
    });
  }

  prefix
    .filter(|prefix| !prefix.is_empty())
    .map(|prefix| prefix.iter().collect())
}

fn remove_stale(workspace: &Path) -> Result<(), UnpackError> {
  let Ok(metadata) = fs::symlink_metadata(workspace) else {
    return Ok(());
  };

  warn!(path = %workspace.display(), "removing stale workspace");
  let removed = if metadata.is_dir() {
    fs::remove_dir_all(workspace)
  } else {
    fs::remove_file(workspace)
  };
  removed.map_err(|source| io_err(workspace, source))
}

fn link_orig_tarball(archive: &Path, link: &Path) -> Result<(), UnpackError> {
  if fs::symlink_metadata(link).is_ok() {
    debug!(link = %link.display(), "replacing existing orig link");
    fs::remove_file(link).map_err(|source| io_err(link, source))?;
  }

  let target = dunce::canonicalize(archive).map_err(|source| io_err(archive, source))?;

  #[cfg(unix)]
  let linked = std::os::unix::fs::symlink(&target, link);

  #[cfg(windows)]
  let linked = std::os::windows::fs::symlink_file(&target, link);

  linked.map_err(|source| io_err(link, source))
}

fn io_err(path: &Path, source: std::io::Error) -> UnpackError {
  UnpackError::Io {
    path: path.to_path_buf(),
    source,
  }
}
