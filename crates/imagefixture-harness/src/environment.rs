//! Shared test environment and the fixture image ensurer.

use std::fmt;
use std::sync::Arc;

use imagefixture_common::config::FixtureConfig;
use imagefixture_common::error::{FixtureError, Result};
use imagefixture_common::types::TargetPlatform;
use imagefixture_exec::{SystemRunner, ToolRunner};
use imagefixture_image::docker::DockerEngine;
use imagefixture_image::engine::{BuildRequest, BuildSummary, EnginePlatform, ImageEngine};

use crate::artifact::{self, StagedContext};
use crate::fixture::{FixtureLatch, Outcome};
use crate::protect::{ProtectGuard, ProtectedImages};

/// Context object shared by the tests of one run.
///
/// Holds the engine client, the process runner, the platform the engine
/// reported, the image-protection registry, and the run-once state of the
/// fixture image build. Share it between tests behind an `Arc` or a
/// `static`.
pub struct TestEnvironment {
    engine: Arc<dyn ImageEngine>,
    runner: Arc<dyn ToolRunner>,
    platform: EnginePlatform,
    config: FixtureConfig,
    protected: ProtectedImages,
    fixture: FixtureLatch,
}

impl fmt::Debug for TestEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEnvironment")
            .field("platform", &self.platform)
            .field("config", &self.config)
            .field("protected", &self.protected)
            .field("fixture", &self.fixture)
            .finish_non_exhaustive()
    }
}

impl TestEnvironment {
    /// Connects to the local Docker daemon and records the platform it
    /// reports.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Engine` if the daemon cannot be reached.
    pub async fn connect(config: FixtureConfig) -> Result<Self> {
        let engine = DockerEngine::connect()?;
        let platform = engine.platform().await?;
        tracing::info!(
            os_type = ?platform.os_type,
            arch = ?platform.arch,
            "connected to container engine"
        );
        Self::builder()
            .engine(Arc::new(engine))
            .platform(platform)
            .config(config)
            .build()
    }

    /// Starts a builder for explicit wiring (custom engines or runners).
    #[must_use]
    pub fn builder() -> TestEnvironmentBuilder {
        TestEnvironmentBuilder::new()
    }

    /// Platform the fixture binary is compiled for.
    #[must_use]
    pub fn platform(&self) -> TargetPlatform {
        self.platform.target()
    }

    /// Platform values as reported by the engine.
    #[must_use]
    pub const fn engine_platform(&self) -> &EnginePlatform {
        &self.platform
    }

    /// Fixture configuration.
    #[must_use]
    pub const fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Image-protection registry.
    #[must_use]
    pub const fn protected_images(&self) -> &ProtectedImages {
        &self.protected
    }

    /// Engine handle.
    #[must_use]
    pub fn engine(&self) -> &dyn ImageEngine {
        self.engine.as_ref()
    }

    /// Summary of the fixture build, once it has succeeded.
    #[must_use]
    pub fn fixture_summary(&self) -> Option<&BuildSummary> {
        self.fixture.outcome().and_then(|outcome| outcome.as_ref().ok())
    }

    /// Number of times the fixture sequence has been started: zero before
    /// the first call, one afterwards.
    #[must_use]
    pub fn fixture_attempts(&self) -> usize {
        self.fixture.attempts()
    }

    /// Ensures the fixture image exists in the engine.
    ///
    /// The build runs at most once per environment, in its own runtime
    /// task. Callers arriving while it runs wait for it to finish; all
    /// callers get the same outcome, and a failed build is not retried. A
    /// caller that is cancelled while waiting leaves the build running for
    /// the next caller. The image is registered as protected whether or not
    /// the build succeeds.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Unavailable` wrapping the failure of the
    /// step that broke: tool lookup, compilation, copying, archival, or the
    /// engine build.
    pub async fn ensure_fixture_image(&self) -> Result<()> {
        let outcome = self
            .fixture
            .get_or_run(|| tokio::spawn(self.fixture_sequence().run()))
            .await;
        outcome.map(|_| ()).map_err(|first| FixtureError::Unavailable {
            image: self.config.image.to_string(),
            source: first,
        })
    }

    fn fixture_sequence(&self) -> FixtureSequence {
        FixtureSequence {
            engine: Arc::clone(&self.engine),
            runner: Arc::clone(&self.runner),
            platform: self.platform(),
            config: self.config.clone(),
            protected: self.protected.clone(),
        }
    }
}

/// Owned inputs of one fixture build, detached from any caller.
struct FixtureSequence {
    engine: Arc<dyn ImageEngine>,
    runner: Arc<dyn ToolRunner>,
    platform: TargetPlatform,
    config: FixtureConfig,
    protected: ProtectedImages,
}

impl FixtureSequence {
    async fn run(self) -> Outcome {
        let _protect = ProtectGuard::new(&self.protected, self.config.image.clone());
        tracing::info!(image = %self.config.image, platform = %self.platform, "building fixture image");

        let result = self.stage_and_build().await;
        match &result {
            Ok(summary) => tracing::info!(
                image = %self.config.image,
                image_id = ?summary.image_id,
                "fixture image ready"
            ),
            Err(e) => tracing::warn!(image = %self.config.image, error = %e, "fixture image build failed"),
        }
        result.map_err(Arc::new)
    }

    async fn stage_and_build(&self) -> Result<BuildSummary> {
        let runner = Arc::clone(&self.runner);
        let config = self.config.clone();
        let platform = self.platform.clone();
        let staged = tokio::task::spawn_blocking(move || {
            artifact::stage_context(runner.as_ref(), &config, &platform)
        })
        .await
        .map_err(|e| FixtureError::Task {
            message: e.to_string(),
        })??;

        let StagedContext {
            context,
            archive,
            source,
        } = staged;
        tracing::debug!(?source, path = %context.path().display(), "build context staged");

        let request = BuildRequest::fixture(self.config.image.clone(), &self.config.descriptor);
        let summary = self.engine.build_image(archive, &request).await?;
        drop(context);
        Ok(summary)
    }
}

/// Builder for [`TestEnvironment`].
#[derive(Default)]
pub struct TestEnvironmentBuilder {
    engine: Option<Arc<dyn ImageEngine>>,
    runner: Option<Arc<dyn ToolRunner>>,
    platform: EnginePlatform,
    config: FixtureConfig,
    protected: Option<ProtectedImages>,
}

impl fmt::Debug for TestEnvironmentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEnvironmentBuilder")
            .field("has_engine", &self.engine.is_some())
            .field("has_runner", &self.runner.is_some())
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestEnvironmentBuilder {
    /// Creates a builder with default configuration and the system runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container engine.
    #[must_use]
    pub fn engine(mut self, engine: Arc<dyn ImageEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the process runner. Defaults to [`SystemRunner`].
    #[must_use]
    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Sets the platform the engine reported.
    #[must_use]
    pub fn platform(mut self, platform: EnginePlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the fixture configuration.
    #[must_use]
    pub fn config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing protection registry instead of a fresh one.
    #[must_use]
    pub fn protected_images(mut self, registry: ProtectedImages) -> Self {
        self.protected = Some(registry);
        self
    }

    /// Builds the environment.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Config` if no engine was set.
    pub fn build(self) -> Result<TestEnvironment> {
        let engine = self.engine.ok_or_else(|| FixtureError::Config {
            message: "test environment requires an engine".to_string(),
        })?;
        Ok(TestEnvironment {
            engine,
            runner: self
                .runner
                .unwrap_or_else(|| Arc::new(SystemRunner::new())),
            platform: self.platform,
            config: self.config,
            protected: self.protected.unwrap_or_default(),
            fixture: FixtureLatch::new(),
        })
    }
}
