//! The operation contract every fuse4x filesystem implements.
//!
//! Once a volume is mounted, the kernel forwards each request on the
//! volume to one of these methods, addressed by the path relative to the
//! volume root. Calls arrive concurrently from the request loop, so
//! implementations take `&self` and must be `Send + Sync`; any shared
//! mutable state needs its own synchronization.
//!
//! Unimplemented operations answer `ENOSYS`, except `release`, `flush` and
//! `fsync`, which succeed by default because they are optional.

use std::ffi::{OsStr, OsString};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::error::{Errno, OpResult};
use crate::types::{
    Capabilities, DirEntry, FileAttr, SetAttrX, StatFs, Timespec, XTimes, XattrFlags,
};

/// Filesystem operations addressed by path.
#[allow(unused_variables)]
pub trait FilesystemOps: Send + Sync {
    /// Called once when the volume is mounted. Returns the optional
    /// behaviour to enable.
    fn init(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Attributes of `path`, without following a trailing symlink.
    fn getattr(&self, path: &Path) -> OpResult<FileAttr> {
        Err(Errno::ENOSYS)
    }

    /// Checks `mask` (`R_OK`, `W_OK`, `X_OK`, `F_OK`) against `path`.
    fn access(&self, path: &Path, mask: i32) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Target of the symlink at `path`.
    fn readlink(&self, path: &Path) -> OpResult<PathBuf> {
        Err(Errno::ENOSYS)
    }

    /// Lists `path`, calling `filler` once per entry until it breaks.
    fn readdir(
        &self,
        path: &Path,
        filler: &mut dyn FnMut(DirEntry) -> ControlFlow<()>,
    ) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Creates a regular file, FIFO or special node. `mode` carries the type
    /// bits.
    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn mkdir(&self, path: &Path, mode: u32) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn unlink(&self, path: &Path) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn rmdir(&self, path: &Path) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Creates `link` pointing at `target`. The target is stored verbatim.
    fn symlink(&self, target: &Path, link: &Path) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn rename(&self, from: &Path, to: &Path) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Creates the hard link `to` for `from`.
    fn link(&self, from: &Path, to: &Path) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn chmod(&self, path: &Path, mode: u32) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Changes ownership without following a trailing symlink. `None`
    /// leaves that id unchanged.
    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn truncate(&self, path: &Path, size: u64) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Sets access and modification times.
    fn utimens(&self, path: &Path, atime: Timespec, mtime: Timespec) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Checks that `path` can be opened with `flags`.
    fn open(&self, path: &Path, flags: i32) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Reads into `buf` from `offset`. Returns the number of bytes read.
    fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> OpResult<usize> {
        Err(Errno::ENOSYS)
    }

    /// Writes `data` at `offset`. Returns the number of bytes written.
    fn write(&self, path: &Path, data: &[u8], offset: u64) -> OpResult<usize> {
        Err(Errno::ENOSYS)
    }

    /// Statistics of the filesystem containing `path`.
    fn statfs(&self, path: &Path) -> OpResult<StatFs> {
        Err(Errno::ENOSYS)
    }

    fn flush(&self, path: &Path) -> OpResult<()> {
        Ok(())
    }

    /// Last close of an open file.
    fn release(&self, path: &Path) -> OpResult<()> {
        Ok(())
    }

    fn fsync(&self, path: &Path, datasync: bool) -> OpResult<()> {
        Ok(())
    }

    /// Value of the attribute `name`. `position` is an offset into a
    /// resource fork and is zero otherwise.
    fn getxattr(&self, path: &Path, name: &OsStr, position: u32) -> OpResult<Vec<u8>> {
        Err(Errno::ENOSYS)
    }

    fn setxattr(
        &self,
        path: &Path,
        name: &OsStr,
        value: &[u8],
        flags: XattrFlags,
        position: u32,
    ) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    fn listxattr(&self, path: &Path) -> OpResult<Vec<OsString>> {
        Err(Errno::ENOSYS)
    }

    fn removexattr(&self, path: &Path, name: &OsStr) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Atomically swaps the contents of two paths.
    fn exchange(&self, path1: &Path, path2: &Path, options: u64) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }

    /// Backup and creation times of `path`.
    fn getxtimes(&self, path: &Path) -> OpResult<XTimes> {
        Err(Errno::ENOSYS)
    }

    /// Applies every field `attr.valid` names.
    fn setattr_x(&self, path: &Path, attr: &SetAttrX) -> OpResult<()> {
        Err(Errno::ENOSYS)
    }
}
