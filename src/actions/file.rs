//! File action: converge a single path to a requested state.
//!
//! Supported states are `file`, `directory`, `alias`, `symlink` and
//! `absent`. Content equality is decided by streaming checksum, symlink
//! equality by exact link-target comparison, and alias equality by resolving
//! the existing bookmark. Attribute reconciliation runs afterwards and can
//! flip Ok to Changed on its own.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::attrs::FileAttrs;
use crate::checksum;
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;
use crate::paths;
use crate::runner::{self, RunRequest};

pub struct FileAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    File,
    Directory,
    Alias,
    Symlink,
    Absent,
}

/// Validated request for one file invocation.
///
/// The constructor checks the full source/state combination atomically, so
/// an invalid intermediate request never exists.
#[derive(Debug)]
struct FileRequest {
    path: PathBuf,
    source: Option<PathBuf>,
    state: FileState,
    attrs: FileAttrs,
}

impl FileRequest {
    fn from_input(input: &ActionInput) -> Result<Self> {
        let state = match input.str("state")? {
            "file" => FileState::File,
            "directory" => FileState::Directory,
            "alias" => FileState::Alias,
            "symlink" => FileState::Symlink,
            _ => FileState::Absent,
        };
        let source = input.opt_str("source")?;

        if source.is_some() {
            if state == FileState::Absent {
                return Err(ActionError::argument(
                    "the 'source' argument may not be provided when 'state' is 'absent'",
                ));
            }
            if state == FileState::Directory {
                return Err(ActionError::argument(
                    "the file action doesn't support copying one directory to another, \
                     use the rsync action instead",
                ));
            }
        } else if matches!(state, FileState::Alias | FileState::Symlink) {
            let name = input.str("state")?;
            return Err(ActionError::argument(format!(
                "the 'source' argument must be provided when 'state' is '{name}'"
            )));
        }

        Ok(Self {
            path: paths::expand(input.str("path")?),
            source: source.map(paths::expand),
            state,
            attrs: FileAttrs::from_input(input)?,
        })
    }

    /// Attribute pass for a path that already satisfies existence/content.
    fn settle(&self, path: &Path) -> Result<Outcome> {
        if self.attrs.reconcile(path)? {
            Ok(Outcome::changed_with(
                [("path".to_string(), json!(path))].into_iter().collect(),
            ))
        } else {
            Ok(Outcome::ok().with("path", json!(path)))
        }
    }

    /// Attribute pass plus Changed for a path that was just mutated.
    fn converged(&self, path: &Path) -> Result<Outcome> {
        self.attrs.reconcile(path)?;
        Ok(Outcome::changed_with(
            [("path".to_string(), json!(path))].into_iter().collect(),
        ))
    }
}

impl Action for FileAction {
    fn name(&self) -> &'static str {
        "file"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("path"),
            ArgumentSpec::optional("source"),
            ArgumentSpec::with_default("state", json!("file"))
                .choices(&["file", "directory", "alias", "symlink", "absent"]),
            ArgumentSpec::optional("mode"),
            ArgumentSpec::optional("owner"),
            ArgumentSpec::optional("group"),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let request = FileRequest::from_input(input)?;
        match request.state {
            FileState::File => match &request.source {
                Some(source) => converge_copy(&request, source),
                None => converge_touch(&request),
            },
            FileState::Directory => converge_directory(&request),
            FileState::Symlink => converge_symlink(&request),
            FileState::Alias => converge_alias(&request),
            FileState::Absent => converge_absent(&request),
        }
    }
}

/// Remove whatever occupies `path`, returning whether anything was removed.
fn remove_existing(path: &Path) -> Result<bool> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(false);
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|_| {
        ActionError::execution("the existing item at the path requested could not be removed")
    })?;
    Ok(true)
}

/// Destination directories receive the source's basename inside them.
fn place_into_dir(path: &Path, source: &Path) -> PathBuf {
    if path.is_dir() && !path.is_symlink() {
        path.join(paths::basename(source))
    } else {
        path.to_path_buf()
    }
}

fn converge_copy(request: &FileRequest, source: &Path) -> Result<Outcome> {
    if !source.is_file() {
        return Err(ActionError::execution(
            "the source provided could not be found or is not a file",
        ));
    }

    let path = place_into_dir(&request.path, source);

    if path.is_file() && checksum::files_equal(source, &path)? {
        return request.settle(&path);
    }

    fs::copy(source, &path)
        .map_err(|_| ActionError::execution("unable to copy source file to path requested"))?;
    request.converged(&path)
}

fn converge_touch(request: &FileRequest) -> Result<Outcome> {
    let path = &request.path;

    // Any existing file content is already satisfactory.
    if path.is_file() {
        return request.settle(path);
    }
    if path.is_dir() {
        return Err(ActionError::execution("the destination path is a directory"));
    }

    fs::File::create(path).map_err(|_| {
        ActionError::execution("unable to create an empty file at the path requested")
    })?;
    request.converged(path)
}

fn converge_directory(request: &FileRequest) -> Result<Outcome> {
    let path = &request.path;

    // Directory state is exclusive of file/symlink occupancy: only a real
    // directory at the path satisfies it.
    if fs::symlink_metadata(path).is_ok_and(|m| m.is_dir()) {
        return request.settle(path);
    }

    remove_existing(path)?;
    fs::create_dir(path)
        .map_err(|_| ActionError::execution("the requested directory could not be created"))?;
    request.converged(path)
}

fn converge_symlink(request: &FileRequest) -> Result<Outcome> {
    let source = request.source.as_deref().unwrap_or(Path::new(""));
    let path = place_into_dir(&request.path, source);

    // Link-target comparison is exact; no canonicalisation.
    if path.is_symlink() && fs::read_link(&path).is_ok_and(|target| target == source) {
        return request.settle(&path);
    }

    remove_existing(&path)?;
    #[cfg(unix)]
    std::os::unix::fs::symlink(source, &path)
        .map_err(|_| ActionError::execution("the requested symlink could not be created"))?;
    request.converged(&path)
}

fn converge_absent(request: &FileRequest) -> Result<Outcome> {
    let path = &request.path;
    if remove_existing(path)? {
        Ok(Outcome::changed_with(
            [("path".to_string(), json!(path))].into_iter().collect(),
        ))
    } else {
        Ok(Outcome::ok().with("path", json!(path)))
    }
}

// Finder aliases are bookmark files; comparison and creation go through the
// NSURL bookmark APIs, driven by osascript so the engine itself stays
// portable.

const RESOLVE_BOOKMARK: &str = r"
ObjC.import('Foundation');
function run(argv) {
    const url = $.NSURL.fileURLWithPath(argv[0]);
    const data = $.NSURL.bookmarkDataWithContentsOfURLError(url, null);
    if (data.isNil()) { return ''; }
    const resolved = $.NSURL.URLByResolvingBookmarkDataOptionsRelativeToURLBookmarkDataIsStaleError(
        data, $.NSURLBookmarkResolutionWithoutUI, null, null, null);
    if (resolved.isNil()) { return ''; }
    return resolved.path.js;
}";

const CREATE_BOOKMARK: &str = r"
ObjC.import('Foundation');
function run(argv) {
    const source = $.NSURL.fileURLWithPath(argv[0]);
    const target = $.NSURL.fileURLWithPath(argv[1]);
    const data = source.bookmarkDataWithOptionsIncludingResourceValuesForKeysRelativeToURLError(
        $.NSURLBookmarkCreationSuitableForBookmarkFile, null, null, null);
    if (data.isNil()) { return 'fail'; }
    const ok = $.NSURL.writeBookmarkDataToURLOptionsError(
        data, target, $.NSURLBookmarkCreationSuitableForBookmarkFile, null);
    return ok ? 'ok' : 'fail';
}";

fn osascript(script: &str, args: &[&Path]) -> Vec<String> {
    let mut argv = vec![
        "osascript".to_string(),
        "-l".to_string(),
        "JavaScript".to_string(),
        "-e".to_string(),
        script.to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string_lossy().to_string()));
    argv
}

fn converge_alias(request: &FileRequest) -> Result<Outcome> {
    let source = request.source.as_deref().unwrap_or(Path::new(""));

    // Aliases must point at an absolute, existing source.
    let source = std::path::absolute(source)
        .map_err(|_| ActionError::execution("the source file provided does not exist"))?;
    if !source.exists() {
        return Err(ActionError::execution(
            "the source file provided does not exist",
        ));
    }

    let path = place_into_dir(&request.path, &source);

    if path.is_file() {
        let resolved = runner::run(
            &RunRequest::argv(osascript(RESOLVE_BOOKMARK, &[&path]))
                .capture_stdout()
                .ignore_failure(),
        )?;
        if resolved
            .stdout
            .as_deref()
            .is_some_and(|out| Path::new(out.trim()) == source)
        {
            return request.settle(&path);
        }
    }

    remove_existing(&path)?;
    let created = runner::run(
        &RunRequest::argv(osascript(CREATE_BOOKMARK, &[&source, &path]))
            .capture_stdout()
            .fail_message("unable to create an alias at the path requested"),
    )?;
    if created.stdout.as_deref().map(str::trim) != Some("ok") {
        return Err(ActionError::execution(
            "unable to create an alias at the path requested",
        ));
    }
    request.converged(&path)
}
