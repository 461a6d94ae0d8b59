//! Mount flag sets.
//!
//! Two independent bitsets travel with every mount request:
//!
//! - [`StdMountFlags`]: the generic Darwin `MNT_*` flags handed to `mount(2)`
//!   as its `flags` argument.
//! - [`AltFlags`]: fuse4x-specific flags stored in the `altflags` field of
//!   the kernel argument block (see [`crate::MountArgs`]).
//!
//! Both are wire values: the bit positions are fixed by the kernel, not by
//! this crate, so they are spelled out rather than derived.

use bitflags::bitflags;

bitflags! {
    /// Standard Darwin mount flags (`<sys/mount.h>`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StdMountFlags: u32 {
        /// Read-only filesystem.
        const RDONLY = 0x0000_0001;
        /// All I/O is synchronous.
        const SYNCHRONOUS = 0x0000_0002;
        /// Can't exec from filesystem.
        const NOEXEC = 0x0000_0004;
        /// Don't honor setuid bits.
        const NOSUID = 0x0000_0008;
        /// Don't interpret special files.
        const NODEV = 0x0000_0010;
        /// Union with underlying filesystem.
        const UNION = 0x0000_0020;
        /// Filesystem written asynchronously.
        const ASYNC = 0x0000_0040;
        /// Files receive the quarantine attribute.
        const QUARANTINE = 0x0000_0400;
        /// Filesystem is stored locally.
        const LOCAL = 0x0000_1000;
        /// Quotas are enabled.
        const QUOTA = 0x0000_2000;
        /// Identifies the root filesystem.
        const ROOTFS = 0x0000_4000;
        /// Not a user-visible volume in the Finder.
        const DONTBROWSE = 0x0010_0000;
        /// Ignore ownership information on objects.
        const IGNORE_OWNERSHIP = 0x0020_0000;
        /// Mounted by the automounter.
        const AUTOMOUNTED = 0x0040_0000;
        /// Filesystem is journaled.
        const JOURNALED = 0x0080_0000;
        /// Don't allow user extended attributes.
        const NOUSERXATTR = 0x0100_0000;
        /// Filesystem should defer writes.
        const DEFWRITE = 0x0200_0000;
        /// MAC support for individual labels.
        const MULTILABEL = 0x0400_0000;
        /// Disable update of file access time.
        const NOATIME = 0x1000_0000;
    }
}

bitflags! {
    /// fuse4x mount-time flags (`FUSE_MOPT_*`).
    ///
    /// Bits 14 and 26 are unassigned and must stay clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AltFlags: u64 {
        const ALLOW_OTHER = 1 << 0;
        const ALLOW_ROOT = 1 << 1;
        const AUTO_XATTR = 1 << 2;
        /// `blocksize=` was supplied.
        const BLOCKSIZE = 1 << 3;
        /// `daemon_timeout=` was supplied.
        const DAEMON_TIMEOUT = 1 << 4;
        const DEFAULT_PERMISSIONS = 1 << 5;
        const DEFER_PERMISSIONS = 1 << 6;
        const DIRECT_IO = 1 << 7;
        const EXTENDED_SECURITY = 1 << 8;
        /// `fsid=` was supplied.
        const FSID = 1 << 9;
        /// `fssubtype=` was supplied.
        const FSSUBTYPE = 1 << 10;
        /// `init_timeout=` was supplied.
        const INIT_TIMEOUT = 1 << 11;
        /// `iosize=` was supplied.
        const IOSIZE = 1 << 12;
        const JAIL_SYMLINKS = 1 << 13;
        const NEGATIVE_VNCACHE = 1 << 15;
        const PING_DISKARB = 1 << 16;
        const NO_APPLEDOUBLE = 1 << 17;
        const NO_APPLEXATTR = 1 << 18;
        const NO_ATTRCACHE = 1 << 19;
        const NO_READAHEAD = 1 << 20;
        const NO_SYNCONCLOSE = 1 << 21;
        const NO_SYNCWRITES = 1 << 22;
        const NO_UBC = 1 << 23;
        const NO_VNCACHE = 1 << 24;
        const USE_INO = 1 << 25;
        const AUTO_CACHE = 1 << 27;
        const NATIVE_XATTR = 1 << 28;
        const SPARSE = 1 << 29;
        const QUIET = 1 << 30;
        /// Mirrors [`StdMountFlags::LOCAL`]; set during validation.
        const LOCALVOL = 1 << 31;

        /// `nolocalcaches` expands to exactly these four bits.
        const NO_LOCALCACHES = Self::NO_ATTRCACHE.bits()
            | Self::NO_READAHEAD.bits()
            | Self::NO_UBC.bits()
            | Self::NO_VNCACHE.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_localcaches_is_four_bits() {
        assert_eq!(AltFlags::NO_LOCALCACHES.bits().count_ones(), 4);
        assert!(AltFlags::NO_LOCALCACHES.contains(AltFlags::NO_ATTRCACHE));
        assert!(AltFlags::NO_LOCALCACHES.contains(AltFlags::NO_READAHEAD));
        assert!(AltFlags::NO_LOCALCACHES.contains(AltFlags::NO_UBC));
        assert!(AltFlags::NO_LOCALCACHES.contains(AltFlags::NO_VNCACHE));
    }

    #[test]
    fn test_reserved_alt_bits_unused() {
        for bit in [14u32, 26] {
            assert!(AltFlags::from_bits(1u64 << bit).is_none(), "bit {bit}");
        }
    }

    #[test]
    fn test_alt_flags_fit_in_32_bits() {
        // The kernel reads altflags as u64 but only assigns the low word.
        assert_eq!(AltFlags::all().bits() >> 32, 0);
    }

    #[test]
    fn test_std_flags_match_darwin_values() {
        assert_eq!(StdMountFlags::RDONLY.bits(), 0x1);
        assert_eq!(StdMountFlags::LOCAL.bits(), 0x1000);
        assert_eq!(StdMountFlags::DONTBROWSE.bits(), 0x0010_0000);
        assert_eq!(StdMountFlags::NOATIME.bits(), 0x1000_0000);
    }
}
