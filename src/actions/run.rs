//! Run action: execute an arbitrary command with idempotency short-circuits.
//!
//! Three independent short-circuits are evaluated in order before anything
//! executes: a `creates` path that already exists, a `removes` path that is
//! already gone, and an `unless` probe whose zero exit means "already done".
//! When the command does run, its exit code is reported as data rather than
//! raised; unlike every other action, a non-zero command exit is not a
//! failure here, since callers inspect the code themselves.

use serde_json::json;

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::paths;
use crate::runner::{self, RunRequest};

pub struct RunAction;

fn shell_request(shell: &str, command: &str, working_dir: Option<&str>) -> RunRequest {
    let request = RunRequest::argv(vec![
        shell.to_string(),
        "-c".to_string(),
        command.to_string(),
    ]);
    match working_dir {
        Some(dir) => request.working_dir(paths::expand(dir)),
        None => request,
    }
}

impl Action for RunAction {
    fn name(&self) -> &'static str {
        "run"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("command"),
            ArgumentSpec::optional("working_dir"),
            ArgumentSpec::with_default("shell", json!("/bin/bash")),
            ArgumentSpec::optional("unless"),
            ArgumentSpec::optional("creates"),
            ArgumentSpec::optional("removes"),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let command = input.str("command")?;
        let working_dir = input.opt_str("working_dir")?;
        let shell = input.str("shell")?;

        if let Some(creates) = input.opt_str("creates")? {
            if paths::expand(creates).exists() {
                return Ok(Outcome::ok());
            }
        }

        if let Some(removes) = input.opt_str("removes")? {
            if !paths::expand(removes).exists() {
                return Ok(Outcome::ok());
            }
        }

        if let Some(unless) = input.opt_str("unless")? {
            let probe = runner::run(&shell_request(shell, unless, working_dir).ignore_failure())?;
            if probe.success() {
                return Ok(Outcome::ok());
            }
        }

        let output = runner::run(
            &shell_request(shell, command, working_dir)
                .capture_stdout()
                .capture_stderr()
                .ignore_failure(),
        )?;

        Ok(Outcome::ok()
            .with("stdout", json!(output.stdout))
            .with("stderr", json!(output.stderr))
            .with("return_code", json!(output.exit_code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::invoke;
    use serde_json::Value;
    use std::fs;

    fn run_run(args: Value) -> Outcome {
        invoke(&RunAction, &args.to_string())
    }

    #[test]
    fn creates_short_circuits_without_executing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let sentinel = dir.path().join("sentinel");
        fs::write(&marker, b"").unwrap();

        let outcome = run_run(json!({
            "command": format!("touch {}", sentinel.display()),
            "creates": marker,
        }));
        assert!(outcome.is_ok() && !outcome.is_changed());
        // The command never ran.
        assert!(!sentinel.exists());
    }

    #[test]
    fn removes_short_circuits_when_path_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_run(json!({
            "command": "echo should-not-run",
            "removes": dir.path().join("already-gone"),
        }));
        assert!(outcome.is_ok());
        assert!(outcome.report().get("stdout").is_none());
    }

    #[test]
    fn unless_zero_exit_short_circuits() {
        let outcome = run_run(json!({
            "command": "echo should-not-run",
            "unless": "true",
        }));
        assert!(outcome.is_ok());
        assert!(outcome.report().get("stdout").is_none());
    }

    #[test]
    fn unless_nonzero_exit_runs_the_command() {
        let outcome = run_run(json!({
            "command": "echo ran",
            "unless": "false",
        }));
        let report = outcome.report();
        assert_eq!(report["return_code"], json!(0));
        assert_eq!(report["stdout"].as_str().unwrap().trim(), "ran");
    }

    #[test]
    fn nonzero_command_exit_is_still_ok() {
        let outcome = run_run(json!({"command": "echo oops >&2; exit 5"}));
        assert!(outcome.is_ok(), "run reports status, never fails: {outcome:?}");
        let report = outcome.report();
        assert_eq!(report["return_code"], json!(5));
        assert_eq!(report["stderr"].as_str().unwrap().trim(), "oops");
    }

    #[test]
    fn working_dir_applies() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_run(json!({
            "command": "pwd",
            "working_dir": dir.path(),
        }));
        let report = outcome.report();
        let reported = report["stdout"].as_str().unwrap().trim().to_string();
        assert_eq!(
            std::path::Path::new(&reported).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn command_is_mandatory() {
        let outcome = run_run(json!({}));
        assert_eq!(
            outcome,
            Outcome::fail("mandatory argument 'command' was not provided")
        );
    }
}
