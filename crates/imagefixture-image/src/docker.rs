//! Docker Engine implementation of [`ImageEngine`] over the `bollard` client.

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::image::BuildImageOptions;
use bollard::models::BuildInfo;
use futures_util::{Stream, StreamExt};
use imagefixture_common::error::{FixtureError, Result};

use crate::engine::{BuildRequest, BuildSummary, EnginePlatform, ImageEngine};

/// Image engine talking to a local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using the platform defaults (`DOCKER_HOST`, then the local
    /// socket or named pipe).
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Engine` if the client cannot be configured.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| FixtureError::Engine {
            operation: "connect",
            message: e.to_string(),
        })?;
        Ok(Self { docker })
    }

    /// Wraps an already configured client.
    #[must_use]
    pub const fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Translates a build request into Docker build query parameters.
#[must_use]
pub fn build_options(request: &BuildRequest) -> BuildImageOptions<String> {
    BuildImageOptions {
        dockerfile: request.descriptor.clone(),
        t: request.tag.to_string(),
        rm: request.remove_intermediate,
        forcerm: request.force_remove,
        ..Default::default()
    }
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn platform(&self) -> Result<EnginePlatform> {
        let info = self.docker.info().await.map_err(|e| FixtureError::Engine {
            operation: "info",
            message: e.to_string(),
        })?;
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| FixtureError::Engine {
                operation: "version",
                message: e.to_string(),
            })?;
        let platform = EnginePlatform {
            os_type: info.os_type,
            arch: version.arch,
        };
        tracing::debug!(?platform, "engine platform queried");
        Ok(platform)
    }

    async fn build_image(&self, context: Vec<u8>, request: &BuildRequest) -> Result<BuildSummary> {
        let image = request.tag.to_string();
        tracing::info!(
            image = %image,
            context_bytes = context.len(),
            rm = request.remove_intermediate,
            forcerm = request.force_remove,
            "submitting image build"
        );

        let stream = self
            .docker
            .build_image(build_options(request), None, Some(context.into()));
        let summary = drain_build_log(&image, stream).await?;

        tracing::info!(
            image = %image,
            messages = summary.messages,
            image_id = ?summary.image_id,
            "image build finished"
        );
        Ok(summary)
    }
}

/// Reads a build log to end-of-stream, counting messages and keeping the
/// last announced image ID.
///
/// # Errors
///
/// Returns `FixtureError::BuildLog` on the first error entry in the log or a
/// mid-stream read failure, and `FixtureError::Engine` if the stream fails
/// before yielding anything.
pub async fn drain_build_log<S>(image: &str, stream: S) -> Result<BuildSummary>
where
    S: Stream<Item = std::result::Result<BuildInfo, DockerError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut summary = BuildSummary::default();
    while let Some(item) = stream.next().await {
        let info = item.map_err(|e| stream_error(image, summary.messages, e))?;
        summary.messages += 1;

        if let Some(error) = info.error {
            tracing::warn!(image, error = %error, "engine reported build error");
            return Err(FixtureError::BuildLog {
                image: image.to_string(),
                message: error,
            });
        }
        if let Some(line) = info.stream.as_deref() {
            tracing::trace!(image, "{}", line.trim_end());
        }
        if let Some(id) = info.aux.and_then(|aux| aux.id) {
            summary.image_id = Some(id);
        }
    }
    Ok(summary)
}

/// Classifies a stream error: failures before any log message are transport
/// or API rejections of the request itself.
fn stream_error(image: &str, messages_seen: usize, error: DockerError) -> FixtureError {
    match error {
        DockerError::DockerStreamError { error } => FixtureError::BuildLog {
            image: image.to_string(),
            message: error,
        },
        other if messages_seen == 0 => FixtureError::Engine {
            operation: "build",
            message: other.to_string(),
        },
        other => FixtureError::BuildLog {
            image: image.to_string(),
            message: other.to_string(),
        },
    }
}
