//! Login item action: converge a macOS login item to present or absent.
//!
//! System Events owns the login item list; it is driven through a single JXA
//! script run by osascript, with a JSON listing for the comparison step so
//! the idempotency check never parses AppleScript prose.

use serde::Deserialize;
use serde_json::{Map, json};

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;
use crate::runner::{self, RunRequest};

pub struct LoginItemAction;

/// One script, four operations: list, add, set-hidden, delete.
const LOGIN_ITEMS_SCRIPT: &str = r"
function run(argv) {
    const events = Application('System Events');
    const op = argv[0];
    if (op === 'list') {
        return JSON.stringify(events.loginItems().map(function (item) {
            return { path: item.path(), hidden: item.hidden() };
        }));
    }
    const path = argv[1];
    const hidden = argv[2] === 'true';
    if (op === 'add') {
        events.loginItems.push(events.LoginItem({ path: path, hidden: hidden }));
        return 'ok';
    }
    for (const item of events.loginItems()) {
        if (item.path() !== path) { continue; }
        if (op === 'set-hidden') { item.hidden = hidden; }
        if (op === 'delete') { item.delete(); }
        return 'ok';
    }
    return 'ok';
}";

#[derive(Debug, Deserialize, PartialEq)]
struct LoginItem {
    path: String,
    hidden: bool,
}

fn system_events(args: &[&str]) -> Result<Option<String>> {
    let mut argv = vec![
        "osascript".to_string(),
        "-l".to_string(),
        "JavaScript".to_string(),
        "-e".to_string(),
        LOGIN_ITEMS_SCRIPT.to_string(),
    ];
    argv.extend(args.iter().map(ToString::to_string));

    let output = runner::run(
        &RunRequest::argv(argv)
            .capture_stdout()
            .fail_message("unable to update the login items requested"),
    )?;
    Ok(output.stdout)
}

fn list_login_items() -> Result<Vec<LoginItem>> {
    let listing = system_events(&["list"])?.unwrap_or_default();
    serde_json::from_str(listing.trim())
        .map_err(|_| ActionError::execution("unable to read the existing login items"))
}

impl Action for LoginItemAction {
    fn name(&self) -> &'static str {
        "login_item"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("path"),
            ArgumentSpec::with_default("state", json!("present")).choices(&["present", "absent"]),
            ArgumentSpec::with_default("hidden", json!(false)),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let path = input.str("path")?;
        let state = input.str("state")?;
        let hidden = input.opt_bool("hidden")?.unwrap_or(false);

        if !std::path::Path::new(path).exists() {
            return Err(ActionError::execution("the path provided could not be found"));
        }

        let items = list_login_items()?;
        let existing = items.iter().find(|item| item.path == path);
        let hidden_arg = if hidden { "true" } else { "false" };

        if state == "present" {
            match existing {
                Some(item) if item.hidden == hidden => Ok(Outcome::ok()),
                Some(_) => {
                    system_events(&["set-hidden", path, hidden_arg])?;
                    Ok(Outcome::changed_with(Map::new()))
                }
                None => {
                    system_events(&["add", path, hidden_arg])?;
                    Ok(Outcome::changed_with(Map::new()))
                }
            }
        } else {
            match existing {
                Some(_) => {
                    system_events(&["delete", path, hidden_arg])?;
                    Ok(Outcome::changed_with(Map::new()))
                }
                None => Ok(Outcome::ok()),
            }
        }
    }
}
