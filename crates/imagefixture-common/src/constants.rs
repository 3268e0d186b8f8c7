//! Fixed names and default paths for the HTTP server fixture image.

/// Tag the fixture image is built under.
pub const FIXTURE_IMAGE: &str = "httpserver";

/// Tag suffix assumed when an image reference carries none.
pub const DEFAULT_TAG: &str = "latest";

/// Directory holding the prebuilt binary and build descriptor, relative to
/// the test working directory.
pub const DEFAULT_SOURCE_DIR: &str = "../contrib/httpserver";

/// File name of the server binary, both in the source dir and in the context.
pub const ARTIFACT_NAME: &str = "httpserver";

/// File name of the build descriptor.
pub const DESCRIPTOR_NAME: &str = "Dockerfile";

/// External tool used to copy files into the build context.
pub const COPY_TOOL: &str = "cp";

/// External compiler used when no prebuilt binary exists.
pub const COMPILER: &str = "go";

/// Package the compiler builds.
pub const COMPILER_PACKAGE: &str = "github.com/docker/docker/contrib/httpserver";

/// Operating system assumed when the environment reports none.
pub const FALLBACK_OS: &str = "linux";

/// CPU architecture assumed when the environment reports none.
pub const FALLBACK_ARCH: &str = "amd64";

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "IMAGEFIXTURE_CONFIG";
