//! # imagefixture-harness
//!
//! Test-side entry point for the HTTP server fixture image.
//!
//! - [`TestEnvironment`](environment::TestEnvironment): shared context
//!   handed to tests; owns the engine, the process runner, and the
//!   run-once state of the fixture build.
//! - [`ProtectedImages`](protect::ProtectedImages): images that test-run
//!   cleanup must keep.
//!
//! # Example
//!
//! ```rust,no_run
//! use imagefixture_common::config::FixtureConfig;
//! use imagefixture_harness::environment::TestEnvironment;
//!
//! # async fn run() -> imagefixture_common::error::Result<()> {
//! let env = TestEnvironment::connect(FixtureConfig::from_env()?).await?;
//! env.ensure_fixture_image().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod artifact;
pub mod environment;
mod fixture;
pub mod protect;
pub mod telemetry;

pub use environment::{TestEnvironment, TestEnvironmentBuilder};
pub use protect::ProtectedImages;
