//! passepartout-lib: Debian packaging for static content
//!
//! Turns a YAML configuration and a set of source tarballs into Debian
//! packages:
//! - `config`: package descriptions, rendered through the `template` engine
//! - `unpack`: extraction of the source archive and the `.orig` symlink
//! - `debian`: generation of the `debian/` metadata directory
//! - `build`: the per-package stage machine
//! - `run`: building several packages in sequence

pub mod build;
pub mod config;
pub mod debian;
pub mod exec;
pub mod run;
pub mod template;
pub mod unpack;
pub mod util;
