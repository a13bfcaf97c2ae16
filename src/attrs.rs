//! File attribute reconciliation (mode, owner, group).
//!
//! Attribute convergence is a secondary idempotent step that runs after a
//! file action has satisfied existence/content. It can flip an outcome from
//! Ok to Changed on its own without any content mutation.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::{fs, io};

use crate::args::ActionInput;
use crate::error::{ActionError, Result};

/// Requested ownership and permission attributes for a filesystem entry.
#[derive(Debug, Clone, Default)]
pub struct FileAttrs {
    mode: Option<u32>,
    owner: Option<String>,
    group: Option<String>,
}

impl FileAttrs {
    /// Pull the shared `mode`/`owner`/`group` arguments out of a validated
    /// input mapping.
    pub fn from_input(input: &ActionInput) -> Result<Self> {
        let mode = match input.opt_str("mode")? {
            Some(text) => Some(parse_mode(text)?),
            None => None,
        };
        Ok(Self {
            mode,
            owner: input.opt_str("owner")?.map(str::to_string),
            group: input.opt_str("group")?.map(str::to_string),
        })
    }

    /// The argument names this struct consumes, for action spec declarations.
    pub fn argument_names() -> [&'static str; 3] {
        ["mode", "owner", "group"]
    }

    /// Converge the entry at `path` to the requested attributes.
    ///
    /// Returns `true` when any attribute had to be updated. Attributes that
    /// were not requested are left untouched.
    pub fn reconcile(&self, path: &Path) -> Result<bool> {
        if self.mode.is_none() && self.owner.is_none() && self.group.is_none() {
            return Ok(false);
        }

        let metadata = fs::symlink_metadata(path).map_err(|_| {
            ActionError::execution("unable to determine the attributes of the path requested")
        })?;
        let mut changed = false;

        if let Some(mode) = self.mode {
            if metadata.permissions().mode() & 0o7777 != mode {
                fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|_| {
                    ActionError::execution("unable to update the mode of the path requested")
                })?;
                changed = true;
            }
        }

        let uid = match &self.owner {
            Some(owner) => Some(
                lookup_uid(owner)
                    .ok_or_else(|| ActionError::execution("the owner requested was not found"))?,
            ),
            None => None,
        };
        let gid = match &self.group {
            Some(group) => Some(
                lookup_gid(group)
                    .ok_or_else(|| ActionError::execution("the group requested was not found"))?,
            ),
            None => None,
        };

        let owner_differs = uid.is_some_and(|uid| uid != metadata.uid());
        let group_differs = gid.is_some_and(|gid| gid != metadata.gid());
        if owner_differs || group_differs {
            chown(path, uid.unwrap_or(metadata.uid()), gid.unwrap_or(metadata.gid()))
                .map_err(|_| {
                    ActionError::execution("unable to update the ownership of the path requested")
                })?;
            changed = true;
        }

        Ok(changed)
    }
}

/// Parse an octal permission string such as `644` or `0755`.
pub fn parse_mode(text: &str) -> Result<u32> {
    u32::from_str_radix(text, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| ActionError::argument("argument 'mode' must be an octal permission string"))
}

/// Resolve a user name to its numeric uid.
pub fn lookup_uid(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    // SAFETY: getpwnam returns a pointer into static libc storage or null;
    // we only dereference it after the null check and copy out pw_uid.
    let entry = unsafe { libc::getpwnam(c_name.as_ptr()) };
    if entry.is_null() {
        return None;
    }
    Some(unsafe { (*entry).pw_uid })
}

/// Resolve a group name to its numeric gid.
pub fn lookup_gid(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    // SAFETY: as for getpwnam; the pointer is checked before the read.
    let entry = unsafe { libc::getgrnam(c_name.as_ptr()) };
    if entry.is_null() {
        return None;
    }
    Some(unsafe { (*entry).gr_gid })
}

fn chown(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    // SAFETY: c_path is a valid NUL-terminated path for the duration of the
    // call; chown reads it and touches no other memory of ours.
    let rc = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
