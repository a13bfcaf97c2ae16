//! The concrete actions and their registry.

mod file;
mod find;
mod git;
mod login_item;
mod plist;
mod rsync;
mod run;

pub use file::FileAction;
pub use find::FindAction;
pub use git::GitAction;
pub use login_item::LoginItemAction;
pub use plist::PlistAction;
pub use rsync::RsyncAction;
pub use run::RunAction;

use crate::action::Action;

/// Every registered action, in the order they are listed to the user.
pub fn all() -> &'static [&'static dyn Action] {
    &[
        &FileAction,
        &FindAction,
        &GitAction,
        &LoginItemAction,
        &PlistAction,
        &RsyncAction,
        &RunAction,
    ]
}

/// Find an action by its protocol name.
pub fn lookup(name: &str) -> Option<&'static dyn Action> {
    all().iter().copied().find(|action| action.name() == name)
}
