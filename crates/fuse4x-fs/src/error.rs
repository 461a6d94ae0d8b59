//! Errno convention for filesystem operations.
//!
//! Operations return [`OpResult`]; the reply sent to the kernel is either a
//! non-negative value or the negated error code, produced by
//! [`ReplyCode::reply_code`]. Host errors are translated at every operation
//! boundary, so nothing propagates as a panic.

use std::fmt;
use std::io;

/// A positive POSIX error code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(i32);

impl Errno {
    pub const EPERM: Self = Self(libc::EPERM);
    pub const ENOENT: Self = Self(libc::ENOENT);
    pub const EIO: Self = Self(libc::EIO);
    pub const EACCES: Self = Self(libc::EACCES);
    pub const EEXIST: Self = Self(libc::EEXIST);
    pub const EINVAL: Self = Self(libc::EINVAL);
    pub const ERANGE: Self = Self(libc::ERANGE);
    pub const ENOSYS: Self = Self(libc::ENOSYS);
    pub const ENOTSUP: Self = Self(libc::ENOTSUP);
    pub const ENAMETOOLONG: Self = Self(libc::ENAMETOOLONG);

    /// Missing extended attribute.
    #[cfg(target_os = "macos")]
    pub const ENOATTR: Self = Self(libc::ENOATTR);
    /// Missing extended attribute.
    #[cfg(not(target_os = "macos"))]
    pub const ENOATTR: Self = Self(libc::ENODATA);

    /// Wraps a raw code. Non-positive values become `EIO`.
    pub fn from_raw(code: i32) -> Self {
        if code > 0 { Self(code) } else { Self::EIO }
    }

    /// The error left by the last failed libc call.
    pub fn last() -> Self {
        Self::from(io::Error::last_os_error())
    }

    /// The positive code.
    pub fn code(self) -> i32 {
        self.0
    }

    /// The code as sent to the kernel.
    pub fn as_negative(self) -> i32 {
        -self.0
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errno({})", self.0)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno {})", io::Error::from_raw_os_error(self.0), self.0)
    }
}

impl std::error::Error for Errno {}

impl From<io::Error> for Errno {
    fn from(e: io::Error) -> Self {
        Self::from_raw(io_error_to_errno(&e))
    }
}

impl From<nix::errno::Errno> for Errno {
    fn from(e: nix::errno::Errno) -> Self {
        Self::from_raw(e as i32)
    }
}

/// Result of one filesystem operation.
pub type OpResult<T> = Result<T, Errno>;

/// Maps an I/O error to its errno, `EIO` when it carries none.
pub fn io_error_to_errno(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(libc::EIO)
}

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        io_error_to_errno(self)
    }
}

impl ToErrno for nix::errno::Errno {
    fn to_errno(&self) -> i32 {
        *self as i32
    }
}

impl ToErrno for Errno {
    fn to_errno(&self) -> i32 {
        self.0
    }
}

/// Collapses an operation result into the kernel reply convention.
pub trait ReplyCode {
    /// `0` or a byte count on success, the negated errno on failure.
    fn reply_code(self) -> i64;
}

impl ReplyCode for OpResult<()> {
    fn reply_code(self) -> i64 {
        match self {
            Ok(()) => 0,
            Err(e) => i64::from(e.as_negative()),
        }
    }
}

impl ReplyCode for OpResult<usize> {
    fn reply_code(self) -> i64 {
        match self {
            Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Err(e) => i64::from(e.as_negative()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_raw_code() {
        let err = io::Error::from_raw_os_error(libc::ENOENT);
        assert_eq!(Errno::from(err), Errno::ENOENT);
        assert_eq!(io::Error::other("no code").to_errno(), libc::EIO);
    }

    #[test]
    fn test_nix_errno_converts() {
        assert_eq!(Errno::from(nix::errno::Errno::EACCES), Errno::EACCES);
    }

    #[test]
    fn test_non_positive_becomes_eio() {
        assert_eq!(Errno::from_raw(0), Errno::EIO);
        assert_eq!(Errno::from_raw(-2), Errno::EIO);
    }

    #[test]
    fn test_reply_codes() {
        assert_eq!(OpResult::<()>::Ok(()).reply_code(), 0);
        assert_eq!(OpResult::<()>::Err(Errno::ENOENT).reply_code(), -i64::from(libc::ENOENT));
        assert_eq!(OpResult::<usize>::Ok(512).reply_code(), 512);
        assert_eq!(OpResult::<usize>::Err(Errno::EIO).reply_code(), -i64::from(libc::EIO));
    }

    #[test]
    fn test_display_names_code() {
        assert!(Errno::ENOENT.to_string().contains(&libc::ENOENT.to_string()));
    }
}
