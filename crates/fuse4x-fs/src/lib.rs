//! Filesystem operation contract for fuse4x volumes.
//!
//! [`FilesystemOps`] is the set of path-addressed operations a filesystem
//! serves once its volume is mounted. Every operation returns
//! [`OpResult`]: a value on success or a positive [`Errno`], which
//! [`ReplyCode`] turns into the negated code the kernel expects.
//!
//! [`Passthrough`] is the reference implementation. It maps each operation
//! onto the same host call for a path under a host directory, and remaps
//! the `com.apple.system.Security` attribute into the `org.` namespace.
//!
//! # Example
//!
//! ```
//! use fuse4x_fs::{FilesystemOps, Passthrough, ReplyCode};
//! use std::path::Path;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let fs = Passthrough::with_root(dir.path());
//!
//! fs.mknod(Path::new("/hello"), 0o100644, 0).unwrap();
//! let written = fs.write(Path::new("/hello"), b"hi", 0);
//! assert_eq!(written.reply_code(), 2);
//! assert_eq!(fs.unlink(Path::new("/absent")).reply_code(), -i64::from(libc::ENOENT));
//! ```

#![warn(clippy::all)]

mod error;
mod ops;
mod passthrough;
mod sys;
mod types;
pub mod xattr;

pub use error::{Errno, OpResult, ReplyCode, ToErrno, io_error_to_errno};
pub use ops::FilesystemOps;
pub use passthrough::Passthrough;
pub use types::{
    Capabilities, DirEntry, FileAttr, FileType, SetAttrMask, SetAttrX, StatFs, Timespec, XTimes,
    XattrFlags,
};
