//! External process capability for the fixture sequence.
//!
//! The fixture never spawns processes directly: it asks a [`ToolRunner`]
//! to locate tools and run them, so tests can substitute a fake.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod runner;

pub use runner::{Invocation, ProcessOutput, SystemRunner, ToolRunner, run_checked};
