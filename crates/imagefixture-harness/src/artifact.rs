//! Build context staging for the fixture image.
//!
//! Fills a fresh [`BuildContext`] with the server binary (copied when a
//! prebuilt one exists, compiled otherwise) and the build descriptor, then
//! archives it. Every step stops the staging on its first error.

use std::path::{Path, PathBuf};

use imagefixture_common::config::FixtureConfig;
use imagefixture_common::error::{FixtureError, Result};
use imagefixture_common::types::TargetPlatform;
use imagefixture_exec::{Invocation, ToolRunner, run_checked};
use imagefixture_image::archive;
use imagefixture_image::context::BuildContext;

/// Where the server binary in the context came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Copied from an existing binary at this path.
    Prebuilt(PathBuf),
    /// Compiled for this platform.
    Compiled(TargetPlatform),
}

/// A populated build context and its tar serialization.
#[derive(Debug)]
pub struct StagedContext {
    /// Directory holding the staged files. Removed on drop.
    pub context: BuildContext,
    /// Tar stream of `context`.
    pub archive: Vec<u8>,
    /// How the binary was obtained.
    pub source: ArtifactSource,
}

/// Stages the binary and descriptor into a new context and archives it.
///
/// # Errors
///
/// Returns the first failure among copy-tool lookup, compiler lookup,
/// compilation, copying, and archival.
pub fn stage_context(
    runner: &dyn ToolRunner,
    config: &FixtureConfig,
    platform: &TargetPlatform,
) -> Result<StagedContext> {
    let copy_tool = runner.locate(&config.copy_tool)?;
    let context = BuildContext::create(config.temp_root.as_deref())?;

    let source = acquire_artifact(runner, &copy_tool, config, platform, &context)?;
    copy_into(
        runner,
        &copy_tool,
        &config.descriptor_path(),
        &context.file_path(&config.descriptor),
    )?;

    let archive = archive::archive_dir(context.path())?;
    Ok(StagedContext {
        context,
        archive,
        source,
    })
}

fn acquire_artifact(
    runner: &dyn ToolRunner,
    copy_tool: &Path,
    config: &FixtureConfig,
    platform: &TargetPlatform,
    context: &BuildContext,
) -> Result<ArtifactSource> {
    let prebuilt = config.prebuilt_artifact();
    let destination = context.file_path(&config.artifact);

    if prebuilt_exists(&prebuilt)? {
        tracing::info!(path = %prebuilt.display(), "using prebuilt fixture binary");
        copy_into(runner, copy_tool, &prebuilt, &destination)?;
        return Ok(ArtifactSource::Prebuilt(prebuilt));
    }

    let compiler = runner.locate(&config.compiler.program)?;
    tracing::info!(
        compiler = %compiler.display(),
        package = %config.compiler.package,
        %platform,
        "compiling fixture binary"
    );
    let invocation = Invocation::new(compiler)
        .args(config.compiler.build_args(&destination))
        .envs(config.compiler.build_env(platform));
    let _ = run_checked(runner, &invocation, |output| FixtureError::Compile {
        artifact: config.artifact.clone(),
        output,
    })?;
    Ok(ArtifactSource::Compiled(platform.clone()))
}

fn prebuilt_exists(path: &Path) -> Result<bool> {
    path.try_exists().map_err(|e| FixtureError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn copy_into(runner: &dyn ToolRunner, copy_tool: &Path, from: &Path, to: &Path) -> Result<()> {
    tracing::debug!(from = %from.display(), to = %to.display(), "copying into build context");
    let invocation = Invocation::new(copy_tool).args([
        from.display().to_string(),
        to.display().to_string(),
    ]);
    let _ = run_checked(runner, &invocation, |output| FixtureError::Copy {
        what: from.display().to_string(),
        output,
    })?;
    Ok(())
}
