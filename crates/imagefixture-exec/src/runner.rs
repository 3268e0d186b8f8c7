//! Tool lookup and command execution.

use std::path::{Path, PathBuf};
use std::process::Command;

use imagefixture_common::error::{FixtureError, Result};

/// A fully resolved command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path of the program, as returned by [`ToolRunner::locate`].
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Creates an invocation with no arguments or environment overrides.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends environment overrides.
    #[must_use]
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Returns the value this invocation sets for `key`, if any.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Output from a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// All of standard output followed by all of standard error. The two
    /// streams are captured separately, so lines are not interleaved in
    /// the order the process wrote them.
    pub combined: Vec<u8>,
    /// Exit code, or `None` when terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Combined output decoded lossily and trimmed.
    #[must_use]
    pub fn combined_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined).trim().to_string()
    }
}

/// Capability for locating and running external tools.
pub trait ToolRunner: Send + Sync {
    /// Resolves a tool name on the search path.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::ToolNotFound` if the tool cannot be resolved.
    fn locate(&self, tool: &str) -> Result<PathBuf>;

    /// Runs an invocation to completion and captures its output.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// [`ProcessOutput::success`].
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Io` if the process cannot be spawned.
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// [`ToolRunner`] backed by `PATH` lookup and real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemRunner {
    fn locate(&self, tool: &str) -> Result<PathBuf> {
        let path = which::which(tool).map_err(|e| FixtureError::ToolNotFound {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(tool, path = %path.display(), "tool located");
        Ok(path)
    }

    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        tracing::debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            env = ?invocation.env,
            "running command"
        );

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .output()
            .map_err(|e| FixtureError::Io {
                path: invocation.program.clone(),
                source: e,
            })?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let result = ProcessOutput {
            combined,
            exit_code: output.status.code(),
        };
        tracing::debug!(
            program = %invocation.program.display(),
            exit_code = ?result.exit_code,
            "command finished"
        );
        Ok(result)
    }
}

/// Runs `program` with `args` through `runner` and returns the output only
/// when it succeeded; otherwise hands the combined output to `on_failure`.
///
/// # Errors
///
/// Returns the spawn error, or the error built by `on_failure`.
pub fn run_checked<F>(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
    on_failure: F,
) -> Result<ProcessOutput>
where
    F: FnOnce(String) -> FixtureError,
{
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        let mut text = output.combined_lossy();
        if text.is_empty() {
            text = exit_description(output.exit_code, &invocation.program);
        }
        Err(on_failure(text))
    }
}

fn exit_description(code: Option<i32>, program: &Path) -> String {
    code.map_or_else(
        || format!("{} terminated by signal", program.display()),
        |c| format!("{} exited with status {c}", program.display()),
    )
}
