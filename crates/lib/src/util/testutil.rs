//! Test utilities for passepartout-lib.
//!
//! Fixture archives are written with raw header names so tests can produce
//! layouts (such as `./`-prefixed entries) that `tar::Builder` would normalize.

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::Path;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use xz2::write::XzEncoder;

use crate::exec::{Invocation, ToolError, ToolRunner};

/// One entry of a fixture archive.
#[derive(Debug, Clone, Copy)]
pub enum TarEntry {
  Dir(&'static str),
  File(&'static str, &'static str),
}

/// Compression applied to a fixture archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
  Plain,
  Gzip,
  Bzip2,
  Xz,
}

/// Write a tar archive, gzip-compressed if `gzip` is set.
pub fn write_tarball(path: &Path, entries: &[TarEntry], gzip: bool) {
  write_tarball_with(path, entries, if gzip { Codec::Gzip } else { Codec::Plain });
}

pub fn write_tarball_with(path: &Path, entries: &[TarEntry], codec: Codec) {
  let file = File::create(path).unwrap();
  match codec {
    Codec::Plain => {
      append_entries(file, entries);
    }
    Codec::Gzip => {
      let encoder = append_entries(GzEncoder::new(file, flate2::Compression::default()), entries);
      encoder.finish().unwrap();
    }
    Codec::Bzip2 => {
      let encoder = append_entries(BzEncoder::new(file, bzip2::Compression::default()), entries);
      encoder.finish().unwrap();
    }
    Codec::Xz => {
      let encoder = append_entries(XzEncoder::new(file, 6), entries);
      encoder.finish().unwrap();
    }
  }
}

fn append_entries<W: std::io::Write>(writer: W, entries: &[TarEntry]) -> W {
  let mut builder = tar::Builder::new(writer);

  for entry in entries {
    let mut header = tar::Header::new_gnu();
    let (name, data) = match entry {
      TarEntry::Dir(name) => {
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        (format!("{}/", name.trim_end_matches('/')), "")
      }
      TarEntry::File(name, data) => {
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        (name.to_string(), *data)
      }
    };
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_size(data.len() as u64);
    header.set_cksum();
    builder.append(&header, data.as_bytes()).unwrap();
  }

  builder.into_inner().unwrap()
}

/// A [`ToolRunner`] that records invocations instead of spawning processes.
///
/// The changelog tool is emulated by writing `debian/changelog` in the
/// invocation's working directory.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  calls: RefCell<Vec<Invocation>>,
  failing: Option<String>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every invocation of `program` exit with status 2.
  pub fn failing(program: &str) -> Self {
    Self {
      calls: RefCell::default(),
      failing: Some(program.to_string()),
    }
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.borrow().clone()
  }

  pub fn programs(&self) -> Vec<String> {
    self.calls.borrow().iter().map(|call| call.program.clone()).collect()
  }
}

impl ToolRunner for RecordingRunner {
  fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
    self.calls.borrow_mut().push(invocation.clone());

    if self.failing.as_deref() == Some(invocation.program.as_str()) {
      return Err(ToolError::Failed {
        program: invocation.program.clone(),
        code: Some(2),
      });
    }

    if invocation.program == "dch" {
      let changelog = invocation.cwd.join("debian").join("changelog");
      fs::write(&changelog, format!("recorded: {}\n", invocation.args.join(" "))).map_err(|source| {
        ToolError::Spawn {
          program: invocation.program.clone(),
          source,
        }
      })?;
    }

    Ok(())
  }
}
