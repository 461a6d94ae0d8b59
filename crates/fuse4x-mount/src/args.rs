//! The kernel mount argument block.
//!
//! [`MountArgs`] is handed to `mount(2)` as its `data` argument. The kernel
//! reads it as a fixed C layout, so the encoding below is a wire format:
//! field order, widths and padding are part of the contract with the kernel
//! extension and must not be reordered.
//!
//! | offset | size | field            |
//! |-------:|-----:|------------------|
//! |      0 | 1024 | `mntpath`        |
//! |   1024 | 1024 | `fsname`         |
//! |   2048 |   16 | `fstypename`     |
//! |   2064 | 1024 | `volname`        |
//! |   3088 |    8 | `altflags`       |
//! |   3096 |    4 | `blocksize`      |
//! |   3100 |    4 | `daemon_timeout` |
//! |   3104 |    4 | `fsid`           |
//! |   3108 |    4 | `fssubtype`      |
//! |   3112 |    4 | `init_timeout`   |
//! |   3116 |    4 | `iosize`         |
//! |   3120 |    4 | `rdev`           |
//! |   3124 |    4 | padding          |
//!
//! Integers are native-endian. Strings are NUL-terminated and zero-filled.

use crate::config::MountConfig;
use crate::flags::AltFlags;
use crate::params::{MAXPATHLEN, MFSTYPENAMELEN};

/// Layout version of the argument block.
pub const MOUNT_ARGS_VERSION: u32 = 1;

/// Encoded size in bytes, including trailing alignment padding.
pub const MOUNT_ARGS_SIZE: usize = 3128;

/// Byte offsets of each field in the encoded block.
pub mod offsets {
    pub const MNTPATH: usize = 0;
    pub const FSNAME: usize = 1024;
    pub const FSTYPENAME: usize = 2048;
    pub const VOLNAME: usize = 2064;
    pub const ALTFLAGS: usize = 3088;
    pub const BLOCKSIZE: usize = 3096;
    pub const DAEMON_TIMEOUT: usize = 3100;
    pub const FSID: usize = 3104;
    pub const FSSUBTYPE: usize = 3108;
    pub const INIT_TIMEOUT: usize = 3112;
    pub const IOSIZE: usize = 3116;
    pub const RDEV: usize = 3120;
}

/// Fully resolved mount request, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountArgs {
    /// Canonical mount point.
    pub mntpath: String,
    /// Mount source name.
    pub fsname: String,
    /// Type name reported by `statfs`; empty means the kernel default.
    pub fstypename: String,
    /// Volume name.
    pub volname: String,
    /// fuse4x flags.
    pub altflags: AltFlags,
    pub blocksize: u32,
    pub daemon_timeout: u32,
    pub fsid: u32,
    pub fssubtype: u32,
    pub init_timeout: u32,
    pub iosize: u32,
    /// Device number of the opened `/dev/fuse4xN` node.
    pub rdev: u32,
}

impl MountArgs {
    /// Joins a validated configuration with the resolved mount point, the
    /// opened device and the final names.
    pub fn new(
        config: &MountConfig,
        mntpath: String,
        fsname: String,
        volname: String,
        rdev: u32,
    ) -> Self {
        Self {
            mntpath,
            fsname,
            fstypename: config.fstypename.clone().unwrap_or_default(),
            volname,
            altflags: config.alt_flags,
            blocksize: config.blocksize,
            daemon_timeout: config.daemon_timeout,
            fsid: config.fsid,
            fssubtype: config.fssubtype,
            init_timeout: config.init_timeout,
            iosize: config.iosize,
            rdev,
        }
    }

    /// Encodes the block in kernel layout.
    ///
    /// Strings longer than their field are cut so the terminating NUL always
    /// fits; the parser and mountpoint validator reject such values earlier.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MOUNT_ARGS_SIZE];
        put_str(&mut buf, offsets::MNTPATH, MAXPATHLEN, &self.mntpath);
        put_str(&mut buf, offsets::FSNAME, MAXPATHLEN, &self.fsname);
        put_str(&mut buf, offsets::FSTYPENAME, MFSTYPENAMELEN, &self.fstypename);
        put_str(&mut buf, offsets::VOLNAME, MAXPATHLEN, &self.volname);
        buf[offsets::ALTFLAGS..offsets::ALTFLAGS + 8]
            .copy_from_slice(&self.altflags.bits().to_ne_bytes());
        for (offset, value) in [
            (offsets::BLOCKSIZE, self.blocksize),
            (offsets::DAEMON_TIMEOUT, self.daemon_timeout),
            (offsets::FSID, self.fsid),
            (offsets::FSSUBTYPE, self.fssubtype),
            (offsets::INIT_TIMEOUT, self.init_timeout),
            (offsets::IOSIZE, self.iosize),
            (offsets::RDEV, self.rdev),
        ] {
            buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
        }
        buf
    }
}

fn put_str(buf: &mut [u8], offset: usize, capacity: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(capacity - 1);
    buf[offset..offset + len].copy_from_slice(&bytes[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(buf: &[u8], offset: usize) -> u32 {
        u32::from_ne_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    fn read_str(buf: &[u8], offset: usize, capacity: usize) -> &str {
        let field = &buf[offset..offset + capacity];
        let end = field.iter().position(|&b| b == 0).unwrap();
        std::str::from_utf8(&field[..end]).unwrap()
    }

    fn sample() -> MountArgs {
        let config = MountConfig {
            alt_flags: AltFlags::ALLOW_OTHER | AltFlags::LOCALVOL,
            fsid: 0x12_3456,
            fssubtype: 7,
            fstypename: Some("ntfs".to_string()),
            ..Default::default()
        };
        MountArgs::new(
            &config,
            "/Volumes/test".to_string(),
            "prog@fuse3".to_string(),
            "Test".to_string(),
            0x2300_0003,
        )
    }

    #[test]
    fn test_offsets_are_contiguous() {
        assert_eq!(offsets::FSNAME, offsets::MNTPATH + MAXPATHLEN);
        assert_eq!(offsets::FSTYPENAME, offsets::FSNAME + MAXPATHLEN);
        assert_eq!(offsets::VOLNAME, offsets::FSTYPENAME + MFSTYPENAMELEN);
        assert_eq!(offsets::ALTFLAGS, offsets::VOLNAME + MAXPATHLEN);
        assert_eq!(offsets::ALTFLAGS % 8, 0);
        assert_eq!(offsets::BLOCKSIZE, offsets::ALTFLAGS + 8);
        assert_eq!(offsets::RDEV + 4 + 4, MOUNT_ARGS_SIZE);
        assert_eq!(MOUNT_ARGS_SIZE % 8, 0);
    }

    #[test]
    fn test_encode_places_fields() {
        let buf = sample().encode();
        assert_eq!(buf.len(), MOUNT_ARGS_SIZE);
        assert_eq!(read_str(&buf, offsets::MNTPATH, MAXPATHLEN), "/Volumes/test");
        assert_eq!(read_str(&buf, offsets::FSNAME, MAXPATHLEN), "prog@fuse3");
        assert_eq!(read_str(&buf, offsets::FSTYPENAME, MFSTYPENAMELEN), "ntfs");
        assert_eq!(read_str(&buf, offsets::VOLNAME, MAXPATHLEN), "Test");

        let alt = u64::from_ne_bytes(
            buf[offsets::ALTFLAGS..offsets::ALTFLAGS + 8]
                .try_into()
                .unwrap(),
        );
        assert_eq!(alt, (AltFlags::ALLOW_OTHER | AltFlags::LOCALVOL).bits());
        assert_eq!(read_u32(&buf, offsets::BLOCKSIZE), 4096);
        assert_eq!(read_u32(&buf, offsets::DAEMON_TIMEOUT), 60);
        assert_eq!(read_u32(&buf, offsets::FSID), 0x12_3456);
        assert_eq!(read_u32(&buf, offsets::FSSUBTYPE), 7);
        assert_eq!(read_u32(&buf, offsets::INIT_TIMEOUT), 10);
        assert_eq!(read_u32(&buf, offsets::IOSIZE), 32 * 1024 * 1024);
        assert_eq!(read_u32(&buf, offsets::RDEV), 0x2300_0003);
        assert_eq!(&buf[offsets::RDEV + 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_overlong_string_keeps_terminator() {
        let mut args = sample();
        args.fstypename = "x".repeat(40);
        let buf = args.encode();
        assert_eq!(buf[offsets::FSTYPENAME + MFSTYPENAMELEN - 1], 0);
        assert_eq!(
            read_str(&buf, offsets::FSTYPENAME, MFSTYPENAMELEN).len(),
            MFSTYPENAMELEN - 1
        );
    }
}
