//! Domain primitive types used across the imagefixture workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TAG, FALLBACK_ARCH, FALLBACK_OS};

/// Reference to a container image as passed to the engine (`name[:tag]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag(String);

impl ImageTag {
    /// Creates an image reference from a string value.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference exactly as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the reference with an explicit tag, appending `:latest` when
    /// the reference has none.
    ///
    /// A colon before the last `/` belongs to a registry port, not a tag.
    #[must_use]
    pub fn qualified(&self) -> String {
        let name_start = self.0.rfind('/').map_or(0, |i| i + 1);
        let has_tag = self.0[name_start..].contains(':');
        let has_digest = self.0.contains('@');
        if has_tag || has_digest {
            self.0.clone()
        } else {
            format!("{}:{DEFAULT_TAG}", self.0)
        }
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target operating system and CPU architecture for the fixture binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetPlatform {
    /// Operating system identifier (`linux`, `windows`, ...).
    pub os: String,
    /// CPU architecture identifier (`amd64`, `arm64`, ...).
    pub arch: String,
}

impl TargetPlatform {
    /// Resolves the platform from values reported by the environment.
    ///
    /// Missing or empty values fall back to `linux` / `amd64`. Anything else
    /// is taken verbatim.
    #[must_use]
    pub fn resolve(os: Option<&str>, arch: Option<&str>) -> Self {
        Self {
            os: non_empty_or(os, FALLBACK_OS),
            arch: non_empty_or(arch, FALLBACK_ARCH),
        }
    }
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}
