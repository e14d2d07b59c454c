//! End-to-end tests running the binary against stand-in packaging tools.

#![cfg(unix)]

mod common;
