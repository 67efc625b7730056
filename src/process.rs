//! Centralized command execution with consistent error handling.
//!
//! Every external tool goes through [`Cmd`]. Arguments are passed as a
//! vector, never through a shell, so paths need no quoting. Commands that
//! need root can be wrapped in a privilege helper (`sudo` by default).

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::progress;

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Builder for configuring command execution.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    /// Wrapper prepended to the command line (e.g. `sudo`).
    wrapper: Option<OsString>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            wrapper: None,
            allow_fail: false,
            error_prefix: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Run the command through a privilege wrapper, if one is given.
    pub fn elevated(mut self, wrapper: Option<&str>) -> Self {
        self.wrapper = wrapper.map(OsString::from);
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// The full command line as it will be executed, for logging.
    pub fn display(&self) -> String {
        self.wrapper
            .iter()
            .chain(std::iter::once(&self.program))
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = match &self.wrapper {
            Some(wrapper) => {
                let mut cmd = Command::new(wrapper);
                cmd.arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        };
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self) -> String {
        format!(
            "Failed to execute '{}'. Is it installed?",
            self.program.to_string_lossy()
        )
    }

    fn check(&self, result: &CommandResult) -> Result<()> {
        if self.allow_fail || result.success() {
            return Ok(());
        }
        let prefix = self
            .error_prefix
            .clone()
            .unwrap_or_else(|| format!("'{}' failed", self.program.to_string_lossy()));

        let stderr = result.stderr_trimmed();
        if stderr.is_empty() {
            bail!("{} (exit code {})", prefix, result.code());
        } else {
            bail!("{} (exit code {}):\n{}", prefix, result.code(), stderr);
        }
    }

    /// Run the command and capture output.
    pub fn run(self) -> Result<CommandResult> {
        tracing::debug!("Running: {}", self.display());

        let output = self
            .command()
            .output()
            .with_context(|| self.spawn_error())?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        self.check(&result)?;
        Ok(result)
    }

    /// Run the command while an indeterminate spinner ticks.
    ///
    /// The command's output is captured as with [`Cmd::run`].
    pub fn run_with_spinner(self, msg: &str) -> Result<CommandResult> {
        tracing::debug!("Running: {}", self.display());

        let pb = progress::spinner(msg);
        pb.enable_steady_tick(Duration::from_millis(100));

        let output = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .and_then(|child| child.wait_with_output())
            .with_context(|| self.spawn_error());
        pb.finish_and_clear();
        let output = output?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        self.check(&result)?;
        Ok(result)
    }

    /// Run the command, streaming its stdout for `(NN.NN/100%)` markers.
    ///
    /// Each parsed percentage is handed to `on_percent` as it arrives.
    /// Lines without a marker are kept in the captured stdout.
    pub fn run_with_progress<F>(self, mut on_percent: F) -> Result<CommandResult>
    where
        F: FnMut(f32),
    {
        tracing::debug!("Running: {}", self.display());

        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| self.spawn_error())?;

        let mut stderr_pipe = child.stderr.take().context("stderr was not captured")?;
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf);
            buf
        });

        let mut stdout_pipe = child.stdout.take().context("stdout was not captured")?;
        let mut stdout = String::new();
        let mut pending = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stdout_pipe
                .read(&mut chunk)
                .context("Failed to read command output")?;
            if n == 0 {
                break;
            }
            pending.extend_from_slice(&chunk[..n]);
            while let Some(pos) = pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
                handle_progress_line(&line, &mut stdout, &mut on_percent);
            }
        }
        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).into_owned();
            handle_progress_line(&line, &mut stdout, &mut on_percent);
        }

        let status = child.wait().with_context(|| self.spawn_error())?;
        let stderr = stderr_reader.join().unwrap_or_default();

        let result = CommandResult {
            status,
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        self.check(&result)?;
        Ok(result)
    }
}

fn handle_progress_line<F: FnMut(f32)>(line: &str, stdout: &mut String, on_percent: &mut F) {
    match progress::parse_percent(line) {
        Some(percent) => on_percent(percent),
        None if !line.trim().is_empty() => {
            stdout.push_str(line);
            stdout.push('\n');
        }
        None => {}
    }
}

/// Check if a program exists in PATH.
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<String> {
    which::which(program)
        .ok()
        .map(|path| path.to_string_lossy().into_owned())
}

/// Check if a program exists in PATH (bool version).
pub fn exists(program: &str) -> bool {
    which(program).is_some()
}

// =============================================================================
// Tests
// =============================================================================
