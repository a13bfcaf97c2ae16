//! Rsync action: delegate tree synchronisation with structured diff capture.
//!
//! rsync is invoked with a machine-parseable per-file output format; an
//! empty result means nothing changed, anything else is reported verbatim to
//! the caller as (operation, filename) pairs rather than a bare boolean.

use serde_json::json;

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;
use crate::paths;
use crate::runner::{self, RunRequest};

pub struct RsyncAction;

/// One operation/filename record per affected file, tab-separated so that
/// filenames with spaces survive parsing.
const OUT_FORMAT: &str = "--out-format=%o\t%n";

impl Action for RsyncAction {
    fn name(&self) -> &'static str {
        "rsync"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("path"),
            ArgumentSpec::required("source"),
            ArgumentSpec::optional("executable"),
            ArgumentSpec::with_default("archive", json!(true)),
            ArgumentSpec::optional("options"),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let path = paths::expand(input.str("path")?);
        let source = paths::expand(input.str("source")?);

        let executable = match input.opt_str("executable")? {
            Some(executable) => executable.to_string(),
            None => locate_rsync()?,
        };

        let mut argv = vec![executable];
        if input.opt_bool("archive")?.unwrap_or(true) {
            argv.push("--archive".to_string());
        }
        if let Some(options) = input.opt_str_list("options")? {
            argv.extend(options);
        }
        argv.push(OUT_FORMAT.to_string());
        argv.push(source.to_string_lossy().to_string());
        argv.push(path.to_string_lossy().to_string());

        let output = runner::run(
            &RunRequest::argv(argv)
                .capture_stdout()
                .fail_message("rsync failed to sync the requested source to path"),
        )?;

        let stdout = output.stdout.unwrap_or_default();
        let changes = parse_changes(&stdout);
        if changes.is_empty() {
            return Ok(Outcome::ok());
        }
        Ok(Outcome::changed_with(
            [("changes".to_string(), json!(changes))].into_iter().collect(),
        ))
    }
}

fn locate_rsync() -> Result<String> {
    let found = runner::run(
        &RunRequest::argv(vec!["which".to_string(), "rsync".to_string()])
            .capture_stdout()
            .ignore_failure(),
    )?;
    if !found.success() {
        return Err(ActionError::execution(
            "unable to find rsync executable to use",
        ));
    }
    Ok(found.stdout.unwrap_or_default().trim().to_string())
}

/// Parse `%o\t%n` records into (operation, filename) pairs.
fn parse_changes(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let (operation, filename) = line.split_once('\t')?;
            Some((operation.to_string(), filename.to_string()))
        })
        .collect()
}
