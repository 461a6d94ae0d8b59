//! Error types for the mount negotiation sequence.
//!
//! Each stage has its own error enum; [`MountError`] aggregates them into the
//! categories a caller acts on. Every stage is fail-fast, so a `MountError`
//! always describes the first problem found.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A malformed, unknown or out-of-range mount option, or a conflict between
/// options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    /// The token matches no row of the option table.
    #[error("unknown mount option '{0}'")]
    Unknown(String),

    /// A numeric parameter is not a base-10 `u32`.
    #[error("invalid value for '{param}': '{value}' is not a decimal number")]
    InvalidNumber {
        /// Option key.
        param: &'static str,
        /// Raw value as supplied.
        value: String,
    },

    /// A numeric parameter outside the range the kernel accepts.
    #[error("'{param}={value}' is outside the supported range {min}..={max}")]
    OutOfRange {
        /// Option key.
        param: &'static str,
        /// Parsed value.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The I/O size must be at least the block size.
    #[error("'iosize={iosize}' is smaller than 'blocksize={blocksize}'")]
    IoSizeBelowBlockSize {
        /// Effective I/O size.
        iosize: u32,
        /// Effective block size.
        blocksize: u32,
    },

    /// A string parameter does not fit its fixed-size kernel field.
    #[error("'{param}' parameter too long ({len} bytes, at most {max} allowed)")]
    TooLong {
        /// Option key.
        param: &'static str,
        /// Length of the supplied value in bytes.
        len: usize,
        /// Longest accepted value in bytes.
        max: usize,
    },

    /// A string parameter contains a NUL byte.
    #[error("'{param}' parameter contains a NUL byte")]
    InteriorNul {
        /// Option key.
        param: &'static str,
    },

    /// The custom fsid does not fit the minor-number bits.
    #[error("invalid 'fsid' {0:#x}: only the low 24 bits may be set")]
    InvalidFsid(u32),

    /// Two options that cannot be combined were both given.
    #[error(transparent)]
    Conflict(#[from] OptionConflict),
}

/// Pairs of options that are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum OptionConflict {
    #[error("'allow_other' and 'allow_root' are mutually exclusive")]
    AllowOtherAllowRoot,
    #[error("'negative_vncache' can't be used with 'novncache'")]
    NegativeVncacheNoVncache,
    #[error("disabling the unified buffer cache ('noubc') can't be used with 'nosyncwrites'")]
    NoSyncWritesNoUbc,
    #[error("disabling readahead ('noreadahead') can't be used with 'nosyncwrites'")]
    NoSyncWritesNoReadahead,
    #[error("'default_permissions' can't be used with 'defer_permissions'")]
    DefaultDeferPermissions,
    #[error("'auto_xattr' can't be used with 'native_xattr'")]
    AutoNativeXattr,
}

/// The mount point is unusable.
#[derive(Debug, Error)]
pub enum MountpointError {
    /// The path could not be resolved or does not exist.
    #[error("failed to stat() on mountpoint {} - {source}", path.display())]
    Missing {
        /// Path as supplied.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The path exists but is not a directory.
    #[error("mountpoint {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The canonical path does not fit the kernel's path field.
    #[error("mountpoint {} is too long ({len} bytes)", path.display())]
    TooLong {
        /// Canonical path.
        path: PathBuf,
        /// Length in bytes.
        len: usize,
    },

    /// The containing filesystem could not be inspected.
    #[error("failed to statfs() on mountpoint {} - {source}", path.display())]
    Statfs {
        /// Canonical path.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The directory already lives on a fuse4x volume.
    #[error("mount point {} is itself on a fuse4x volume", .0.display())]
    Recursive(PathBuf),
}

/// The kernel extension is missing or does not match this library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// The running OS predates the supported releases, or could not be
    /// identified.
    #[error("fuse4x is not supported on this OS version ({release})")]
    OsTooOld {
        /// Kernel release string, or a description of why it is unknown.
        release: String,
    },

    /// The version query failed even after running the loader.
    #[error(
        "fuse4x kernel extension was not loaded ({reason}). \
         Please check /var/log/system.log for more information."
    )]
    Missing {
        /// What went wrong with the load attempt.
        reason: String,
    },

    /// The loaded kernel extension speaks another protocol version.
    #[error(
        "fuse4x client library version is incompatible with the kernel extension \
         (kext='{kernel}', library='{library}')"
    )]
    VersionMismatch {
        /// Version reported by the kernel.
        kernel: String,
        /// Version compiled into this library.
        library: String,
    },
}

/// Stable classification of [`MountError`], used to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    OptionSyntax,
    OptionConflict,
    Mountpoint,
    KernelIncompatible,
    Device,
    MountSyscall,
    Unmount,
}

/// Errors from the mount negotiation sequence.
#[derive(Debug, Error)]
pub enum MountError {
    /// A mount option is malformed, unknown or out of range.
    #[error("fuse4x: {0}")]
    OptionSyntax(OptionError),

    /// Two mount options cannot be combined.
    #[error("fuse4x: {0}")]
    OptionConflict(OptionConflict),

    /// The mount point failed validation.
    #[error("fuse4x: {0}")]
    Mountpoint(#[from] MountpointError),

    /// The kernel extension is unavailable or incompatible.
    #[error("{0}")]
    KernelIncompatible(#[from] KernelError),

    /// Every device node is busy or inaccessible.
    #[error("fuse4x: failed to open device file: all {count} devices are busy or unavailable")]
    DeviceExhausted {
        /// Size of the device pool that was scanned.
        count: u32,
    },

    /// A device opened but could not be identified.
    #[error("fuse4x: fstat of {} failed: {source}", path.display())]
    DeviceStat {
        /// Device node path.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The `mount(2)` call failed.
    #[error("fuse4x failed to mount {} to {} : {source}", device.display(), mountpoint.display())]
    MountSyscall {
        /// Device node used for the attempt.
        device: PathBuf,
        /// Canonical mount point.
        mountpoint: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The `unmount(2)` call failed.
    #[error("fuse4x failed to unmount {}: {source}", mountpoint.display())]
    Unmount {
        /// Mount point.
        mountpoint: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
}

impl MountError {
    /// Classifies this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::OptionSyntax(_) => ErrorCategory::OptionSyntax,
            Self::OptionConflict(_) => ErrorCategory::OptionConflict,
            Self::Mountpoint(_) => ErrorCategory::Mountpoint,
            Self::KernelIncompatible(_) => ErrorCategory::KernelIncompatible,
            Self::DeviceExhausted { .. } | Self::DeviceStat { .. } => ErrorCategory::Device,
            Self::MountSyscall { .. } => ErrorCategory::MountSyscall,
            Self::Unmount { .. } => ErrorCategory::Unmount,
        }
    }
}

impl From<OptionError> for MountError {
    fn from(e: OptionError) -> Self {
        match e {
            OptionError::Conflict(c) => Self::OptionConflict(c),
            other => Self::OptionSyntax(other),
        }
    }
}

impl From<OptionConflict> for MountError {
    fn from(c: OptionConflict) -> Self {
        Self::OptionConflict(c)
    }
}

/// Result type for mount negotiation.
pub type MountResult<T> = Result<T, MountError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_routes_to_conflict_category() {
        let err: MountError = OptionError::Conflict(OptionConflict::AllowOtherAllowRoot).into();
        assert_eq!(err.category(), ErrorCategory::OptionConflict);
        assert!(err.to_string().contains("allow_root"));
    }

    #[test]
    fn test_syntax_routes_to_syntax_category() {
        let err: MountError = OptionError::Unknown("bogus".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::OptionSyntax);
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_device_exhausted_names_count() {
        let err = MountError::DeviceExhausted { count: 24 };
        assert_eq!(err.category(), ErrorCategory::Device);
        assert!(err.to_string().contains("24"));
    }

    #[test]
    fn test_version_mismatch_message_names_both_versions() {
        let err = KernelError::VersionMismatch {
            kernel: "0.8.0".to_string(),
            library: "0.9.2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kext='0.8.0'"));
        assert!(msg.contains("library='0.9.2'"));
    }

    #[test]
    fn test_mountpoint_error_display() {
        let err = MountpointError::NotADirectory(PathBuf::from("/tmp/file"));
        assert!(err.to_string().contains("/tmp/file"));

        let err = MountpointError::Recursive(PathBuf::from("/Volumes/x"));
        assert!(err.to_string().contains("fuse4x volume"));
    }
}
