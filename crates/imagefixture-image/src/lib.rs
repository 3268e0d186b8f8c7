//! # imagefixture-image
//!
//! Image build plumbing for the fixture sequence.
//!
//! Handles:
//! - **Context**: the transient directory submitted as the build context.
//! - **Archive**: tar serialization of that directory.
//! - **Engine**: the image-build capability and its Docker implementation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod archive;
pub mod context;
pub mod docker;
pub mod engine;
