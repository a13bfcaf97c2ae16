//! Find action: filtered recursive enumeration under a root directory.
//!
//! The walk descends with sorted entries for reproducible output, lists
//! symlinked directories without following them, and prunes recursion
//! entirely beyond `max_depth`. The selection predicate is a conjunction of
//! depth window, type classification, glob patterns and exact attribute
//! matches.

use std::path::Path;

use serde_json::json;
use walkdir::WalkDir;

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::attrs;
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;
use crate::paths;

pub struct FindAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    Symlink,
    Alias,
    File,
}

impl EntryKind {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "directory" => Ok(Self::Directory),
            "symlink" => Ok(Self::Symlink),
            "alias" => Ok(Self::Alias),
            "file" => Ok(Self::File),
            _ => Err(ActionError::argument(
                "argument 'types' may only contain file, directory, symlink or alias",
            )),
        }
    }
}

/// Classifies an entry into one of the four kinds.
///
/// The classifier is chosen once at the top of the walk rather than decided
/// per entry, so platform capability never leaks into the recursion itself.
trait TypeClassifier {
    fn classify(&self, entry: &walkdir::DirEntry) -> EntryKind;
}

/// Symlink/directory/file classification from the entry's own file type.
struct PlainClassifier;

impl TypeClassifier for PlainClassifier {
    fn classify(&self, entry: &walkdir::DirEntry) -> EntryKind {
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

/// As [`PlainClassifier`], but distinguishes Finder alias files.
///
/// Alias files are bookmark-data files and start with a fixed magic, which
/// is far cheaper to probe than resolving the bookmark.
struct AliasClassifier;

const BOOKMARK_MAGIC: &[u8; 16] = b"book\x00\x00\x00\x00mark\x00\x00\x00\x00";

impl TypeClassifier for AliasClassifier {
    fn classify(&self, entry: &walkdir::DirEntry) -> EntryKind {
        match PlainClassifier.classify(entry) {
            EntryKind::File if has_bookmark_magic(entry.path()) => EntryKind::Alias,
            kind => kind,
        }
    }
}

fn has_bookmark_magic(path: &Path) -> bool {
    use std::io::Read;

    let mut header = [0u8; 16];
    std::fs::File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .is_ok()
        && &header == BOOKMARK_MAGIC
}

/// Validated filter set for one find invocation.
struct FindRequest {
    min_depth: Option<u64>,
    max_depth: Option<u64>,
    types: Option<Vec<EntryKind>>,
    patterns: Option<Vec<glob::Pattern>>,
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    flags: Option<u32>,
}

impl FindRequest {
    fn from_input(input: &ActionInput) -> Result<Self> {
        let types = match input.opt_str_list("types")? {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| EntryKind::parse(name))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let patterns = match input.opt_str_list("patterns")? {
            Some(raw) => Some(
                raw.iter()
                    .map(|pattern| {
                        glob::Pattern::new(pattern).map_err(|_| {
                            ActionError::argument(
                                "argument 'patterns' contains an invalid pattern",
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let mode = match input.opt_str("mode")? {
            Some(text) => Some(attrs::parse_mode(text)?),
            None => None,
        };

        // Names are resolved to numeric ids once per invocation.
        let uid = match input.opt_str("owner")? {
            Some(owner) => Some(
                attrs::lookup_uid(owner)
                    .ok_or_else(|| ActionError::execution("the owner requested was not found"))?,
            ),
            None => None,
        };
        let gid = match input.opt_str("group")? {
            Some(group) => Some(
                attrs::lookup_gid(group)
                    .ok_or_else(|| ActionError::execution("the group requested was not found"))?,
            ),
            None => None,
        };

        let flags = match input.opt_str_list("flags")? {
            Some(names) => Some(flag_bits(&names)?),
            None => None,
        };

        Ok(Self {
            min_depth: input.opt_u64("min_depth")?,
            max_depth: input.opt_u64("max_depth")?,
            types,
            patterns,
            mode,
            uid,
            gid,
            flags,
        })
    }

    fn wants_metadata(&self) -> bool {
        self.mode.is_some() || self.uid.is_some() || self.gid.is_some() || self.flags.is_some()
    }

    fn selects(&self, entry: &walkdir::DirEntry, kind: EntryKind) -> Result<bool> {
        let depth = entry.depth() as u64;
        if self.min_depth.is_some_and(|min| depth < min) {
            return Ok(false);
        }
        if self
            .types
            .as_ref()
            .is_some_and(|types| !types.contains(&kind))
        {
            return Ok(false);
        }
        if self.patterns.as_ref().is_some_and(|patterns| {
            let path = entry.path().to_string_lossy();
            !patterns.iter().any(|pattern| pattern.matches(&path))
        }) {
            return Ok(false);
        }

        if self.wants_metadata() {
            let metadata = entry.metadata().map_err(|_| {
                ActionError::execution("unable to determine the attributes of the path requested")
            })?;
            if !metadata_matches(self, &metadata) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(unix)]
fn metadata_matches(request: &FindRequest, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    if request
        .mode
        .is_some_and(|mode| metadata.mode() & 0o7777 != mode)
    {
        return false;
    }
    if request.uid.is_some_and(|uid| metadata.uid() != uid) {
        return false;
    }
    if request.gid.is_some_and(|gid| metadata.gid() != gid) {
        return false;
    }
    if let Some(flags) = request.flags {
        if entry_flags(metadata) & flags == 0 {
            return false;
        }
    }
    true
}

#[cfg(target_os = "macos")]
fn entry_flags(metadata: &std::fs::Metadata) -> u32 {
    use std::os::macos::fs::MetadataExt;
    metadata.st_flags()
}

#[cfg(not(target_os = "macos"))]
fn entry_flags(_metadata: &std::fs::Metadata) -> u32 {
    0
}

/// BSD file flag names understood by the flag filter.
#[cfg(target_os = "macos")]
const FLAGS: &[(&str, u32)] = &[
    ("archived", libc::SF_ARCHIVED),
    ("hidden", libc::UF_HIDDEN),
    ("nodump", libc::UF_NODUMP),
    ("opaque", libc::UF_OPAQUE),
    ("sappend", libc::SF_APPEND),
    ("schange", libc::SF_IMMUTABLE),
    ("uappend", libc::UF_APPEND),
    ("uchange", libc::UF_IMMUTABLE),
];

#[cfg(target_os = "macos")]
fn flag_bits(names: &[String]) -> Result<u32> {
    let mut bits = 0;
    for name in names {
        let flag = FLAGS
            .iter()
            .find(|(known, _)| known == name)
            .ok_or_else(|| ActionError::execution("the specified flag is unsupported"))?;
        bits |= flag.1;
    }
    Ok(bits)
}

#[cfg(not(target_os = "macos"))]
fn flag_bits(_names: &[String]) -> Result<u32> {
    Err(ActionError::execution("the specified flag is unsupported"))
}

impl Action for FindAction {
    fn name(&self) -> &'static str {
        "find"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("path"),
            ArgumentSpec::optional("min_depth"),
            ArgumentSpec::optional("max_depth"),
            ArgumentSpec::optional("types"),
            ArgumentSpec::optional("patterns"),
            ArgumentSpec::optional("mode"),
            ArgumentSpec::optional("owner"),
            ArgumentSpec::optional("group"),
            ArgumentSpec::optional("flags"),
            ArgumentSpec::with_default("aliases", json!(true)),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let root = paths::expand(input.str("path")?);
        if !root.is_dir() {
            return Err(ActionError::execution(
                "unable to find a directory with the path provided",
            ));
        }

        let request = FindRequest::from_input(input)?;
        let classifier: &dyn TypeClassifier = if input.opt_bool("aliases")?.unwrap_or(true) {
            &AliasClassifier
        } else {
            &PlainClassifier
        };

        let mut walker = WalkDir::new(&root).min_depth(1).sort_by_file_name();
        if let Some(max_depth) = request.max_depth {
            walker = walker.max_depth(max_depth as usize);
        }

        let mut found = Vec::new();
        for entry in walker {
            let entry = entry
                .map_err(|_| ActionError::execution("unable to enumerate the path provided"))?;
            let kind = classifier.classify(&entry);
            if request.selects(&entry, kind)? {
                found.push(entry.path().to_string_lossy().to_string());
            }
        }

        Ok(Outcome::ok().with("paths", json!(found)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::invoke;
    use serde_json::Value;
    use std::fs;

    fn run_find(args: Value) -> Outcome {
        invoke(&FindAction, &args.to_string())
    }

    fn paths_of(outcome: &Outcome) -> Vec<String> {
        outcome.report()["paths"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap().to_string())
            .collect()
    }

    /// tree/
    ///   alpha/         (dir)
    ///     deep.txt
    ///   beta.txt
    ///   gamma.log
    ///   link -> beta.txt
    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::write(dir.path().join("alpha/deep.txt"), b"d").unwrap();
        fs::write(dir.path().join("beta.txt"), b"b").unwrap();
        fs::write(dir.path().join("gamma.log"), b"g").unwrap();
        std::os::unix::fs::symlink(dir.path().join("beta.txt"), dir.path().join("link")).unwrap();
        dir
    }

    #[test]
    fn non_directory_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        let outcome = run_find(json!({"path": file}));
        assert_eq!(
            outcome,
            Outcome::fail("unable to find a directory with the path provided")
        );
    }

    #[test]
    fn directories_at_depth_one_only() {
        let dir = fixture();
        let outcome = run_find(json!({
            "path": dir.path(),
            "types": ["directory"],
            "max_depth": 1,
        }));
        assert_eq!(
            paths_of(&outcome),
            vec![dir.path().join("alpha").to_string_lossy().to_string()]
        );
    }

    #[test]
    fn min_depth_excludes_shallow_entries() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "min_depth": 2}));
        assert_eq!(
            paths_of(&outcome),
            vec![dir.path().join("alpha/deep.txt").to_string_lossy().to_string()]
        );
    }

    #[test]
    fn patterns_filter_on_full_path() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "patterns": ["*.txt"]}));
        let found = paths_of(&outcome);
        assert!(found.iter().all(|p| p.ends_with(".txt")));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn symlinks_classified_and_not_followed() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "types": ["symlink"]}));
        assert_eq!(
            paths_of(&outcome),
            vec![dir.path().join("link").to_string_lossy().to_string()]
        );
    }

    #[test]
    fn results_are_sorted_within_each_directory() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "max_depth": 1}));
        let found = paths_of(&outcome);
        let mut sorted = found.clone();
        sorted.sort();
        assert_eq!(found, sorted);
    }

    #[test]
    fn unknown_type_rejected() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "types": ["wormhole"]}));
        assert_eq!(
            outcome,
            Outcome::fail("argument 'types' may only contain file, directory, symlink or alias")
        );
    }

    #[test]
    fn unknown_owner_fails() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "owner": "attune-no-such-user"}));
        assert_eq!(outcome, Outcome::fail("the owner requested was not found"));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn flags_unsupported_off_macos() {
        let dir = fixture();
        let outcome = run_find(json!({"path": dir.path(), "flags": ["hidden"]}));
        assert_eq!(outcome, Outcome::fail("the specified flag is unsupported"));
    }

    #[test]
    fn mode_filter_matches_exactly() {
        use std::os::unix::fs::PermissionsExt;

        let dir = fixture();
        fs::set_permissions(
            dir.path().join("beta.txt"),
            fs::Permissions::from_mode(0o640),
        )
        .unwrap();
        let outcome = run_find(json!({"path": dir.path(), "mode": "640"}));
        assert_eq!(
            paths_of(&outcome),
            vec![dir.path().join("beta.txt").to_string_lossy().to_string()]
        );
    }
}
