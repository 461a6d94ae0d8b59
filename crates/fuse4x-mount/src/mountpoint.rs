//! Mount point validation.
//!
//! Resolves the user-supplied path and checks that it can be mounted on.
//! Nothing here modifies the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MountpointError;
use crate::params::MAXPATHLEN;
use crate::platform::Platform;

/// Whether a filesystem type name belongs to a fuse4x volume.
///
/// Matches the bare type and the `fuse4x_<subtype>` names set through
/// `fstypename=`.
pub fn is_own_fstype(fstype: &str, fs_type: &str) -> bool {
    fstype
        .strip_prefix(fs_type)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

/// Resolves `path` to a canonical directory that may be mounted on.
///
/// The recursion check only looks at the filesystem that directly contains
/// the directory; `allow_recursion` skips it.
pub fn validate_mountpoint(
    path: &Path,
    allow_recursion: bool,
    fs_type: &str,
    platform: &dyn Platform,
) -> Result<PathBuf, MountpointError> {
    let missing = |source| MountpointError::Missing {
        path: path.to_path_buf(),
        source,
    };
    let canonical = fs::canonicalize(path).map_err(missing)?;
    let metadata = fs::metadata(&canonical).map_err(missing)?;
    if !metadata.is_dir() {
        return Err(MountpointError::NotADirectory(canonical));
    }

    let len = canonical.as_os_str().len();
    if len >= MAXPATHLEN {
        return Err(MountpointError::TooLong {
            path: canonical,
            len,
        });
    }

    let fstype = platform
        .fstype_name(&canonical)
        .map_err(|source| MountpointError::Statfs {
            path: canonical.clone(),
            source,
        })?;
    debug!(mountpoint = %canonical.display(), %fstype, "resolved mount point");

    if is_own_fstype(&fstype, fs_type) && !allow_recursion {
        return Err(MountpointError::Recursive(canonical));
    }

    Ok(canonical)
}
