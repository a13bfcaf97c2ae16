//! Scoped subprocess execution for actions that delegate to external tools.
//!
//! Every external command an action runs goes through [`run`], which gives
//! all actions the same capture and failure-translation policy: stderr text
//! wins over a caller-supplied fail message, which wins over a generic one.
//! Streams that are not captured are directed to a null sink rather than
//! inherited, so the action's structured outcome stays the only text on the
//! real stdout.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{ActionError, Result};

/// A command either as one shell-style line or an explicit argv sequence.
///
/// Both forms execute identically; the line form is split using POSIX
/// shell-word rules first.
#[derive(Debug, Clone)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    fn to_argv(&self) -> Result<Vec<String>> {
        match self {
            Self::Line(line) => shell_words::split(line)
                .map_err(|_| ActionError::execution("unable to parse the command provided")),
            Self::Argv(argv) => Ok(argv.clone()),
        }
    }

    /// Human-readable rendering for failure messages.
    pub fn display(&self) -> String {
        match self {
            Self::Line(line) => line.clone(),
            Self::Argv(argv) => shell_words::join(argv),
        }
    }
}

/// One subprocess invocation with its capture and failure policy.
#[derive(Debug)]
pub struct RunRequest {
    command: CommandLine,
    working_dir: Option<PathBuf>,
    capture_stdout: bool,
    capture_stderr: bool,
    ignore_failure: bool,
    fail_message: Option<String>,
}

impl RunRequest {
    /// A command given as a single shell-style string.
    pub fn line(command: impl Into<String>) -> Self {
        Self::new(CommandLine::Line(command.into()))
    }

    /// A command given as an explicit argv sequence.
    pub fn argv(argv: Vec<String>) -> Self {
        Self::new(CommandLine::Argv(argv))
    }

    fn new(command: CommandLine) -> Self {
        Self {
            command,
            working_dir: None,
            capture_stdout: false,
            capture_stderr: false,
            ignore_failure: false,
            fail_message: None,
        }
    }

    /// Run the child in `dir` instead of the current working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Capture stdout and return it in the result.
    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Capture stderr and return it in the result.
    pub fn capture_stderr(mut self) -> Self {
        self.capture_stderr = true;
        self
    }

    /// Return a non-zero exit to the caller as data instead of failing.
    pub fn ignore_failure(mut self) -> Self {
        self.ignore_failure = true;
        self
    }

    /// Message to fail with when the child exits non-zero and produced no
    /// stderr text.
    pub fn fail_message(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }
}

/// Captured result of a completed subprocess.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute a subprocess, blocking until it terminates.
///
/// stderr is captured internally whenever failures are not ignored, so the
/// trimmed stderr text is always available as the preferred failure message;
/// it is only surfaced in [`RunOutput`] when the caller asked for it.
pub fn run(request: &RunRequest) -> Result<RunOutput> {
    let argv = request.command.to_argv()?;
    let Some((program, args)) = argv.split_first() else {
        return Err(ActionError::execution("unable to execute an empty command"));
    };

    let want_stderr = request.capture_stderr || !request.ignore_failure;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(if request.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(if want_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = &request.working_dir {
        command.current_dir(dir);
    }

    log::debug!("running command: {}", request.command.display());
    let output = command.output().map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            ActionError::ExecutableMissing(request.command.display())
        } else {
            ActionError::execution(format!(
                "unable to execute command {}",
                request.command.display()
            ))
        }
    })?;

    // A signal death has no exit code; report it as a generic failure code.
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if exit_code != 0 && !request.ignore_failure {
        let trimmed = stderr.trim();
        if !trimmed.is_empty() {
            return Err(ActionError::execution(trimmed.to_string()));
        }
        if let Some(message) = &request.fail_message {
            return Err(ActionError::execution(message.clone()));
        }
        return Err(ActionError::execution(format!(
            "unable to execute command {}",
            request.command.display()
        )));
    }

    Ok(RunOutput {
        exit_code,
        stdout: request.capture_stdout.then_some(stdout),
        stderr: request.capture_stderr.then_some(stderr),
    })
}
