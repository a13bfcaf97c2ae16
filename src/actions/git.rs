//! Git action: branch-aware clone or checkout.
//!
//! The repository marker is `<path>/.git/config`. An existing repository on
//! the requested branch is already converged; on another branch it is
//! switched; a missing repository is cloned with the branch preselected.

use serde_json::json;

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::paths;
use crate::runner::{self, RunRequest};

pub struct GitAction;

impl Action for GitAction {
    fn name(&self) -> &'static str {
        "git"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("repo"),
            ArgumentSpec::required("path"),
            ArgumentSpec::with_default("branch", json!("master")),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let repo = input.str("repo")?;
        let path = paths::expand(input.str("path")?);
        let branch = input.str("branch")?;

        if path.join(".git").join("config").is_file() {
            let head = runner::run(
                &RunRequest::line("git symbolic-ref --short HEAD")
                    .working_dir(&path)
                    .capture_stdout()
                    .fail_message("unable to check existing repository branch"),
            )?;

            if head.stdout.as_deref().map(str::trim) == Some(branch) {
                return Ok(Outcome::ok());
            }

            runner::run(
                &RunRequest::argv(vec![
                    "git".to_string(),
                    "checkout".to_string(),
                    branch.to_string(),
                ])
                .working_dir(&path)
                .fail_message("unable to checkout requested branch"),
            )?;
            return Ok(Outcome::changed(
                "existing repo found and switched to requested branch",
            ));
        }

        runner::run(
            &RunRequest::argv(vec![
                "git".to_string(),
                "clone".to_string(),
                "--quiet".to_string(),
                "-b".to_string(),
                branch.to_string(),
                repo.to_string(),
                path.to_string_lossy().to_string(),
            ])
            .fail_message("unable to clone git repository"),
        )?;
        Ok(Outcome::changed("repository cloned successfully"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::invoke;
    use serde_json::Value;

    fn run_git(args: Value) -> Outcome {
        invoke(&GitAction, &args.to_string())
    }

    #[test]
    fn repo_and_path_are_mandatory() {
        let outcome = run_git(json!({"repo": "https://example.org/dotfiles.git"}));
        assert_eq!(
            outcome,
            Outcome::fail("mandatory argument 'path' was not provided")
        );
    }

    #[test]
    fn branch_defaults_to_master() {
        let specs = GitAction.arg_specs();
        let input = crate::args::ActionInput::validate(
            &specs,
            json!({"repo": "r", "path": "/tmp/r"})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(input.str("branch").unwrap(), "master");
    }

    #[test]
    fn unsupported_argument_rejected() {
        let outcome = run_git(json!({
            "repo": "r",
            "path": "/tmp/r",
            "depth": 1,
        }));
        assert_eq!(
            outcome,
            Outcome::fail("argument 'depth' is not supported by this action")
        );
    }
}
