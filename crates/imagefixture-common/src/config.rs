//! Configuration model for the fixture image.
//!
//! Every field has a default matching the stock layout, so an empty JSON
//! object (or no file at all) yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{FixtureError, Result};
use crate::types::{ImageTag, TargetPlatform};

/// Root configuration for the fixture image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Tag the image is built under.
    pub image: ImageTag,
    /// Directory holding the prebuilt binary and the build descriptor.
    pub source_dir: PathBuf,
    /// File name of the server binary.
    pub artifact: String,
    /// File name of the build descriptor.
    pub descriptor: String,
    /// External copy tool.
    pub copy_tool: String,
    /// Compiler used when no prebuilt binary exists.
    pub compiler: CompilerConfig,
    /// Directory under which the build context is created.
    /// `None` uses the system temp directory.
    pub temp_root: Option<PathBuf>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            image: ImageTag::new(constants::FIXTURE_IMAGE),
            source_dir: PathBuf::from(constants::DEFAULT_SOURCE_DIR),
            artifact: constants::ARTIFACT_NAME.to_string(),
            descriptor: constants::DESCRIPTOR_NAME.to_string(),
            copy_tool: constants::COPY_TOOL.to_string(),
            compiler: CompilerConfig::default(),
            temp_root: None,
        }
    }
}

impl FixtureConfig {
    /// Loads a configuration from a JSON file. Absent fields keep defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FixtureError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `IMAGEFIXTURE_CONFIG`, or returns defaults
    /// when the variable is unset or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the named file cannot be loaded.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(constants::CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Path of the optional prebuilt binary.
    #[must_use]
    pub fn prebuilt_artifact(&self) -> PathBuf {
        self.source_dir.join(&self.artifact)
    }

    /// Path of the build descriptor.
    #[must_use]
    pub fn descriptor_path(&self) -> PathBuf {
        self.source_dir.join(&self.descriptor)
    }

    fn validate(&self) -> Result<()> {
        let empty = [
            ("image", self.image.as_str()),
            ("artifact", self.artifact.as_str()),
            ("descriptor", self.descriptor.as_str()),
            ("copy_tool", self.copy_tool.as_str()),
            ("compiler.program", self.compiler.program.as_str()),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());
        if let Some((field, _)) = empty {
            return Err(FixtureError::Config {
                message: format!("{field} must not be empty"),
            });
        }
        Ok(())
    }
}

/// External compiler invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler executable name, resolved on the search path.
    pub program: String,
    /// Package passed to `build`.
    pub package: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: constants::COMPILER.to_string(),
            package: constants::COMPILER_PACKAGE.to_string(),
        }
    }
}

impl CompilerConfig {
    /// Arguments producing `output` from the configured package.
    #[must_use]
    pub fn build_args(&self, output: &Path) -> Vec<String> {
        vec![
            "build".into(),
            "-o".into(),
            output.display().to_string(),
            self.package.clone(),
        ]
    }

    /// Environment overrides for a static, cross-compiled build.
    #[must_use]
    pub fn build_env(&self, platform: &TargetPlatform) -> Vec<(String, String)> {
        vec![
            ("CGO_ENABLED".into(), "0".into()),
            ("GOOS".into(), platform.os.clone()),
            ("GOARCH".into(), platform.arch.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_contrib_httpserver() {
        let config = FixtureConfig::default();
        assert_eq!(config.image.as_str(), "httpserver");
        assert_eq!(
            config.prebuilt_artifact(),
            Path::new("../contrib/httpserver/httpserver")
        );
        assert_eq!(
            config.descriptor_path(),
            Path::new("../contrib/httpserver/Dockerfile")
        );
        assert_eq!(config.compiler.program, "go");
    }

    #[test]
    fn load_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"{ "source_dir": "/opt/httpserver" }"#).expect("write");

        let config = FixtureConfig::load(&path).expect("load");
        assert_eq!(config.source_dir, Path::new("/opt/httpserver"));
        assert_eq!(config.descriptor, "Dockerfile");
        assert_eq!(config.compiler, CompilerConfig::default());
    }

    #[test]
    fn load_missing_file_returns_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = FixtureConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(FixtureError::Io { .. })));
    }

    #[test]
    fn load_invalid_json_returns_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, "{ not json").expect("write");
        let result = FixtureConfig::load(&path);
        assert!(matches!(result, Err(FixtureError::Serialization { .. })));
    }

    #[test]
    fn load_rejects_empty_copy_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"{ "copy_tool": "" }"#).expect("write");
        let err = FixtureConfig::load(&path).expect_err("should reject");
        assert!(err.to_string().contains("copy_tool"));
    }

    #[test]
    fn build_env_disables_cgo_and_sets_target() {
        let platform = TargetPlatform::resolve(Some("linux"), Some("arm64"));
        let env = CompilerConfig::default().build_env(&platform);
        assert!(env.contains(&("CGO_ENABLED".into(), "0".into())));
        assert!(env.contains(&("GOOS".into(), "linux".into())));
        assert!(env.contains(&("GOARCH".into(), "arm64".into())));
    }

    #[test]
    fn build_args_write_to_output_path() {
        let args = CompilerConfig::default().build_args(Path::new("/tmp/ctx/httpserver"));
        assert_eq!(
            args,
            vec![
                "build",
                "-o",
                "/tmp/ctx/httpserver",
                "github.com/docker/docker/contrib/httpserver"
            ]
        );
    }
}
