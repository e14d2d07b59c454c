//! Shared utilities.
//!
//! Test helpers for building fixture archives and recording tool calls.

#[cfg(test)]
pub mod testutil;
