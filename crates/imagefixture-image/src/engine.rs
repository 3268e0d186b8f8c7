//! Container engine abstraction for image builds.

use async_trait::async_trait;
use imagefixture_common::error::Result;
use imagefixture_common::types::{ImageTag, TargetPlatform};

/// Parameters of an image build submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Tag applied to the resulting image.
    pub tag: ImageTag,
    /// Name of the build descriptor inside the context.
    pub descriptor: String,
    /// Remove intermediate containers after a successful build.
    pub remove_intermediate: bool,
    /// Always remove intermediate containers, even when the build fails.
    pub force_remove: bool,
}

impl BuildRequest {
    /// Request for a throwaway fixture image: intermediate state is removed
    /// whether the build succeeds or fails.
    #[must_use]
    pub fn fixture(tag: ImageTag, descriptor: impl Into<String>) -> Self {
        Self {
            tag,
            descriptor: descriptor.into(),
            remove_intermediate: true,
            force_remove: true,
        }
    }
}

/// Outcome of a fully drained build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Number of log messages read from the build stream.
    pub messages: usize,
    /// Image ID announced by the engine, if it sent one.
    pub image_id: Option<String>,
}

/// Operating system and architecture as reported by the engine.
///
/// Either field may be absent or empty; [`EnginePlatform::target`] applies
/// the fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnginePlatform {
    /// Engine OS type.
    pub os_type: Option<String>,
    /// Engine CPU architecture.
    pub arch: Option<String>,
}

impl EnginePlatform {
    /// Resolves the platform to compile the fixture binary for.
    #[must_use]
    pub fn target(&self) -> TargetPlatform {
        TargetPlatform::resolve(self.os_type.as_deref(), self.arch.as_deref())
    }
}

/// A container engine able to build images from a tar context.
///
/// Implementors must consume the whole build log before returning, so that
/// a successful return means the build has finished.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Queries the engine's OS type and architecture.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Engine` if the engine cannot be queried.
    async fn platform(&self) -> Result<EnginePlatform>;

    /// Submits `context` (a tar stream) for building and drains the build log.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Engine` on transport or API errors and
    /// `FixtureError::BuildLog` if the log cannot be read or reports an error.
    async fn build_image(&self, context: Vec<u8>, request: &BuildRequest) -> Result<BuildSummary>;
}
