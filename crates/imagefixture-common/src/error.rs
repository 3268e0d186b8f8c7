//! Unified error types for the imagefixture workspace.
//!
//! Every step of the fixture sequence maps its failure onto one variant, so a
//! failing test reports which step broke (tool lookup, build, copy, archive,
//! or image build) together with any captured process output.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A required external tool is not on the search path.
    #[error("tool not found: {tool} ({reason})")]
    ToolNotFound {
        /// Name of the tool that was looked up.
        tool: String,
        /// Lookup failure reported by the resolver.
        reason: String,
    },

    /// The external compiler exited unsuccessfully.
    #[error("could not build {artifact}: {output}")]
    Compile {
        /// Artifact the compiler was asked to produce.
        artifact: String,
        /// Combined stdout and stderr of the compiler.
        output: String,
    },

    /// The copy tool exited unsuccessfully.
    #[error("could not copy {what}: {output}")]
    Copy {
        /// File that was being copied.
        what: String,
        /// Combined stdout and stderr of the copy tool.
        output: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The build context could not be archived.
    #[error("could not archive build context {path}: {source}")]
    Archive {
        /// Directory being archived.
        path: PathBuf,
        /// Underlying I/O error from the tar writer.
        source: std::io::Error,
    },

    /// The container engine rejected a request or could not be reached.
    #[error("engine {operation} failed: {message}")]
    Engine {
        /// Engine operation that failed (`connect`, `info`, `build`, ...).
        operation: &'static str,
        /// Transport or API error description.
        message: String,
    },

    /// Reading the build log failed, or the log reported a build error.
    #[error("image build for {image} failed: {message}")]
    BuildLog {
        /// Tag of the image being built.
        image: String,
        /// Stream or build error description.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A blocking task could not be joined.
    #[error("fixture task aborted: {message}")]
    Task {
        /// Join error description.
        message: String,
    },

    /// The one-time fixture sequence failed; every caller receives this.
    #[error("fixture image {image} is unavailable: {source}")]
    Unavailable {
        /// Tag of the fixture image.
        image: String,
        /// Failure recorded by the run that attempted the build.
        source: Arc<FixtureError>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, FixtureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_names_the_tool() {
        let err = FixtureError::ToolNotFound {
            tool: "go".into(),
            reason: "cannot find binary path".into(),
        };
        assert_eq!(
            err.to_string(),
            "tool not found: go (cannot find binary path)"
        );
    }

    #[test]
    fn compile_error_carries_process_output() {
        let err = FixtureError::Compile {
            artifact: "httpserver".into(),
            output: "main.go:3: syntax error".into(),
        };
        assert!(err.to_string().contains("main.go:3: syntax error"));
    }

    #[test]
    fn unavailable_exposes_recorded_failure_as_source() {
        let first = Arc::new(FixtureError::Engine {
            operation: "build",
            message: "connection refused".into(),
        });
        let err = FixtureError::Unavailable {
            image: "httpserver".into(),
            source: Arc::clone(&first),
        };
        let source = std::error::Error::source(&err).expect("source present");
        assert!(source.to_string().contains("connection refused"));
    }
}
