//! Path expansion helpers.
//!
//! Actions receive paths exactly as the operator wrote them in config, so
//! `~` and environment variables must be taken into account before any
//! filesystem access. All modules go through [`expand`] rather than calling
//! shellexpand directly.

use std::path::{Path, PathBuf};

/// Expand `~` and environment variables in a path string.
///
/// Unknown environment variables are left as-is rather than failing; the
/// filesystem operation that follows will produce the meaningful error.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// The final component of a path, used when a destination directory is given
/// and the entry should be placed inside it.
pub fn basename(path: &Path) -> PathBuf {
    path.file_name().map_or_else(PathBuf::new, PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde_to_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/dotfiles"), home.join("dotfiles"));
    }

    #[test]
    fn absolute_paths_unchanged() {
        assert_eq!(expand("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn unknown_env_vars_left_as_is() {
        assert_eq!(
            expand("/path/$ATTUNE_UNSET_VAR_12345/file"),
            PathBuf::from("/path/$ATTUNE_UNSET_VAR_12345/file")
        );
    }

    #[test]
    fn basename_of_file_path() {
        assert_eq!(basename(Path::new("/etc/hosts")), PathBuf::from("hosts"));
    }
}
