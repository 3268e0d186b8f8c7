//! Test doubles shared by the harness integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use imagefixture_common::config::FixtureConfig;
use imagefixture_common::error::{FixtureError, Result};
use imagefixture_exec::{Invocation, ProcessOutput, ToolRunner};
use imagefixture_harness::TestEnvironment;
use imagefixture_image::archive;
use imagefixture_image::engine::{BuildRequest, BuildSummary, EnginePlatform, ImageEngine};

/// Records every lookup and run; emulates `cp` and `go` on the real filesystem.
#[derive(Debug, Default)]
pub struct FakeRunner {
    missing: HashSet<String>,
    compile_failure: Option<String>,
    lookups: Mutex<Vec<String>>,
    runs: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `locate(tool)` fail.
    pub fn without_tool(mut self, tool: &str) -> Self {
        let _ = self.missing.insert(tool.to_string());
        self
    }

    /// Makes the compiler exit non-zero with `output`.
    pub fn failing_compile(mut self, output: &str) -> Self {
        self.compile_failure = Some(output.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn runs(&self) -> Vec<Invocation> {
        self.runs.lock().unwrap().clone()
    }

    /// Runs whose program file name is `tool`.
    pub fn runs_of(&self, tool: &str) -> Vec<Invocation> {
        self.runs()
            .into_iter()
            .filter(|inv| inv.program.file_name().is_some_and(|n| n == tool))
            .collect()
    }

    fn fake_cp(args: &[String]) -> ProcessOutput {
        match std::fs::copy(&args[0], &args[1]) {
            Ok(_) => ProcessOutput {
                combined: Vec::new(),
                exit_code: Some(0),
            },
            Err(e) => ProcessOutput {
                combined: format!("cp: {}: {e}", args[0]).into_bytes(),
                exit_code: Some(1),
            },
        }
    }

    fn fake_go(&self, invocation: &Invocation) -> ProcessOutput {
        if let Some(output) = &self.compile_failure {
            return ProcessOutput {
                combined: output.clone().into_bytes(),
                exit_code: Some(2),
            };
        }
        let output_path = &invocation.args[2];
        let body = format!(
            "httpserver for {}/{}",
            invocation.env_value("GOOS").unwrap_or_default(),
            invocation.env_value("GOARCH").unwrap_or_default()
        );
        std::fs::write(output_path, body).expect("write compiled artifact");
        ProcessOutput {
            combined: Vec::new(),
            exit_code: Some(0),
        }
    }
}

impl ToolRunner for FakeRunner {
    fn locate(&self, tool: &str) -> Result<PathBuf> {
        self.lookups.lock().unwrap().push(tool.to_string());
        if self.missing.contains(tool) {
            return Err(FixtureError::ToolNotFound {
                tool: tool.to_string(),
                reason: "cannot find binary path".to_string(),
            });
        }
        Ok(Path::new("/fake/bin").join(tool))
    }

    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.runs.lock().unwrap().push(invocation.clone());
        let name = invocation
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = match name.as_str() {
            "cp" => Self::fake_cp(&invocation.args),
            "go" => self.fake_go(invocation),
            other => panic!("unexpected program {other}"),
        };
        Ok(output)
    }
}

/// A build the fake engine received.
#[derive(Debug, Clone)]
pub struct RecordedBuild {
    pub request: BuildRequest,
    pub entries: Vec<String>,
    pub artifact: Vec<u8>,
}

/// Records build submissions; optionally slow or failing.
#[derive(Debug, Default)]
pub struct FakeEngine {
    failure: Option<String>,
    delay: Duration,
    started: AtomicUsize,
    builds: Mutex<Vec<RecordedBuild>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every build with a transport error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Delays each build.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn builds(&self) -> Vec<RecordedBuild> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEngine for FakeEngine {
    async fn platform(&self) -> Result<EnginePlatform> {
        Ok(EnginePlatform::default())
    }

    async fn build_image(&self, context: Vec<u8>, request: &BuildRequest) -> Result<BuildSummary> {
        let _ = self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(FixtureError::Engine {
                operation: "build",
                message: message.clone(),
            });
        }
        self.builds.lock().unwrap().push(RecordedBuild {
            request: request.clone(),
            entries: archive::list_entries(&context)?,
            artifact: read_entry(&context, "httpserver"),
        });
        Ok(BuildSummary {
            messages: 3,
            image_id: Some("sha256:f1x7u5e".to_string()),
        })
    }
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive = tar::Archive::new(bytes);
    for entry in archive.entries().expect("entries") {
        let mut entry = entry.expect("entry");
        if entry.path().expect("path").ends_with(name) {
            let mut content = Vec::new();
            let _ = entry.read_to_end(&mut content).expect("read entry");
            return content;
        }
    }
    Vec::new()
}

/// Source directory laid out like `contrib/httpserver`.
pub fn source_dir(with_prebuilt: bool) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("Dockerfile"),
        "FROM busybox\nEXPOSE 80/tcp\nCOPY httpserver .\nCMD [\"./httpserver\"]\n",
    )
    .expect("write Dockerfile");
    if with_prebuilt {
        std::fs::write(dir.path().join("httpserver"), b"prebuilt httpserver").expect("write binary");
    }
    dir
}

pub fn config_for(source: &Path) -> FixtureConfig {
    FixtureConfig {
        source_dir: source.to_path_buf(),
        ..FixtureConfig::default()
    }
}

pub fn environment(
    engine: &Arc<FakeEngine>,
    runner: &Arc<FakeRunner>,
    platform: EnginePlatform,
    config: FixtureConfig,
) -> TestEnvironment {
    imagefixture_harness::telemetry::init_test_tracing();
    TestEnvironment::builder()
        .engine(Arc::clone(engine) as Arc<dyn ImageEngine>)
        .runner(Arc::clone(runner) as Arc<dyn ToolRunner>)
        .platform(platform)
        .config(config)
        .build()
        .expect("build environment")
}
