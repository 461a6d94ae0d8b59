//! The negotiated mount configuration.
//!
//! A [`MountConfig`] starts from the documented defaults, is mutated only by
//! the parser during one pass, and is validated once by
//! [`MountConfig::finalize`]. Later stages only read it.

use crate::error::{OptionConflict, OptionError};
use crate::flags::{AltFlags, StdMountFlags};
use crate::options::{NumericParam, TextParam};
use crate::params::{
    DEFAULT_BLOCKSIZE, DEFAULT_DAEMON_TIMEOUT, DEFAULT_INIT_TIMEOUT, DEFAULT_IOSIZE,
    MAX_BLOCKSIZE, MAX_DAEMON_TIMEOUT, MAX_INIT_TIMEOUT, MAX_IOSIZE, MIN_BLOCKSIZE,
    MIN_DAEMON_TIMEOUT, MIN_INIT_TIMEOUT, MIN_IOSIZE, MINOR_MASK,
};

/// Mount configuration produced by the option parser.
///
/// The mount path and the selected device are not part of this type; they
/// are produced by later stages and joined with the configuration when the
/// kernel argument block is built (see [`crate::MountArgs`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// Flags passed to `mount(2)` directly.
    pub std_flags: StdMountFlags,
    /// fuse4x flags passed in the argument block.
    pub alt_flags: AltFlags,
    /// Block size of the virtual device.
    pub blocksize: u32,
    /// Preferred I/O size.
    pub iosize: u32,
    /// Upcall timeout in seconds.
    pub daemon_timeout: u32,
    /// Seconds the kernel waits for the daemon's init reply.
    pub init_timeout: u32,
    /// Custom filesystem id (low 24 bits of the device minor).
    pub fsid: u32,
    /// Filesystem subtype reported by `statfs`.
    pub fssubtype: u32,
    /// Name shown as the mount source; defaulted at mount time.
    pub fsname: Option<String>,
    /// Type name reported by `statfs`.
    pub fstypename: Option<String>,
    /// Volume name shown in the Finder; defaulted at mount time.
    pub volname: Option<String>,
    /// Suppress interactive alerts.
    pub quiet: bool,
    /// Skip the recursive-mount check.
    pub allow_recursion: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            std_flags: StdMountFlags::empty(),
            alt_flags: AltFlags::empty(),
            blocksize: DEFAULT_BLOCKSIZE,
            iosize: DEFAULT_IOSIZE,
            daemon_timeout: DEFAULT_DAEMON_TIMEOUT,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            fsid: 0,
            fssubtype: 0,
            fsname: None,
            fstypename: None,
            volname: None,
            quiet: false,
            allow_recursion: false,
        }
    }
}

/// Mutually exclusive flag pairs, checked in this order.
const CONFLICTS: &[(AltFlags, AltFlags, OptionConflict)] = &[
    (
        AltFlags::ALLOW_OTHER,
        AltFlags::ALLOW_ROOT,
        OptionConflict::AllowOtherAllowRoot,
    ),
    (
        AltFlags::NEGATIVE_VNCACHE,
        AltFlags::NO_VNCACHE,
        OptionConflict::NegativeVncacheNoVncache,
    ),
    (
        AltFlags::NO_SYNCWRITES,
        AltFlags::NO_UBC,
        OptionConflict::NoSyncWritesNoUbc,
    ),
    (
        AltFlags::NO_SYNCWRITES,
        AltFlags::NO_READAHEAD,
        OptionConflict::NoSyncWritesNoReadahead,
    ),
    (
        AltFlags::DEFAULT_PERMISSIONS,
        AltFlags::DEFER_PERMISSIONS,
        OptionConflict::DefaultDeferPermissions,
    ),
    (
        AltFlags::AUTO_XATTR,
        AltFlags::NATIVE_XATTR,
        OptionConflict::AutoNativeXattr,
    ),
];

/// Clamps a `daemon_timeout=` value into its accepted range.
pub fn clamp_daemon_timeout(secs: u32) -> u32 {
    secs.clamp(MIN_DAEMON_TIMEOUT, MAX_DAEMON_TIMEOUT)
}

/// Clamps an `init_timeout=` value into its accepted range.
pub fn clamp_init_timeout(secs: u32) -> u32 {
    secs.clamp(MIN_INIT_TIMEOUT, MAX_INIT_TIMEOUT)
}

impl MountConfig {
    /// Stores a numeric parameter and marks it present.
    pub(crate) fn set_numeric(&mut self, param: NumericParam, value: u32) {
        let slot = match param {
            NumericParam::BlockSize => &mut self.blocksize,
            NumericParam::DaemonTimeout => &mut self.daemon_timeout,
            NumericParam::InitTimeout => &mut self.init_timeout,
            NumericParam::IoSize => &mut self.iosize,
            NumericParam::Fsid => &mut self.fsid,
            NumericParam::FsSubtype => &mut self.fssubtype,
        };
        *slot = value;
        self.alt_flags |= param.presence_flag();
    }

    /// Stores a string parameter.
    pub(crate) fn set_text(&mut self, param: TextParam, value: String) {
        let slot = match param {
            TextParam::FsName => &mut self.fsname,
            TextParam::FsTypeName => &mut self.fstypename,
            TextParam::VolName => &mut self.volname,
        };
        *slot = Some(value);
    }

    /// Returns the first conflicting flag pair, if any.
    pub fn first_conflict(&self) -> Option<OptionConflict> {
        CONFLICTS
            .iter()
            .find(|(a, b, _)| self.alt_flags.contains(*a) && self.alt_flags.contains(*b))
            .map(|(_, _, conflict)| *conflict)
    }

    /// Applies derived flags, checks cross-option invariants and clamps
    /// timeouts.
    ///
    /// Called once after every token has been consumed. Idempotent.
    pub fn finalize(&mut self) -> Result<(), OptionError> {
        if self.std_flags.contains(StdMountFlags::LOCAL) {
            self.alt_flags |= AltFlags::LOCALVOL;
        }

        if let Some(conflict) = self.first_conflict() {
            return Err(conflict.into());
        }

        if self.alt_flags.contains(AltFlags::FSID) && self.fsid & !MINOR_MASK != 0 {
            return Err(OptionError::InvalidFsid(self.fsid));
        }

        check_range(
            NumericParam::BlockSize,
            self.blocksize,
            MIN_BLOCKSIZE,
            MAX_BLOCKSIZE,
        )?;
        check_range(NumericParam::IoSize, self.iosize, MIN_IOSIZE, MAX_IOSIZE)?;
        if self.iosize < self.blocksize {
            return Err(OptionError::IoSizeBelowBlockSize {
                iosize: self.iosize,
                blocksize: self.blocksize,
            });
        }

        self.daemon_timeout = clamp_daemon_timeout(self.daemon_timeout);
        self.init_timeout = clamp_init_timeout(self.init_timeout);
        Ok(())
    }
}

fn check_range(param: NumericParam, value: u32, min: u32, max: u32) -> Result<(), OptionError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(OptionError::OutOfRange {
            param: param.name(),
            value,
            min,
            max,
        })
    }
}
