//! Value types exchanged through [`FilesystemOps`](crate::FilesystemOps).

use std::ffi::OsString;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

use bitflags::bitflags;
use filetime::FileTime;

const S_IFMT: u32 = 0o170_000;
const S_IFIFO: u32 = 0o010_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFSOCK: u32 = 0o140_000;

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: u32,
}

impl Timespec {
    pub const ZERO: Self = Self { sec: 0, nsec: 0 };

    pub fn new(sec: i64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    pub fn now() -> Self {
        FileTime::now().into()
    }
}

impl From<FileTime> for Timespec {
    fn from(t: FileTime) -> Self {
        Self {
            sec: t.unix_seconds(),
            nsec: t.nanoseconds(),
        }
    }
}

impl From<Timespec> for FileTime {
    fn from(t: Timespec) -> Self {
        FileTime::from_unix_time(t.sec, t.nsec)
    }
}

/// Kind of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    NamedPipe,
    CharDevice,
    BlockDevice,
    Directory,
    RegularFile,
    Symlink,
    Socket,
}

impl FileType {
    /// Decodes the type bits of an `st_mode`.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFIFO => Some(Self::NamedPipe),
            S_IFCHR => Some(Self::CharDevice),
            S_IFDIR => Some(Self::Directory),
            S_IFBLK => Some(Self::BlockDevice),
            S_IFREG => Some(Self::RegularFile),
            S_IFLNK => Some(Self::Symlink),
            S_IFSOCK => Some(Self::Socket),
            _ => None,
        }
    }

    /// Type bits for an `st_mode`.
    pub fn mode_bits(self) -> u32 {
        match self {
            Self::NamedPipe => S_IFIFO,
            Self::CharDevice => S_IFCHR,
            Self::Directory => S_IFDIR,
            Self::BlockDevice => S_IFBLK,
            Self::RegularFile => S_IFREG,
            Self::Symlink => S_IFLNK,
            Self::Socket => S_IFSOCK,
        }
    }
}

/// Attributes of one node, as returned by `getattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: u64,
    pub size: u64,
    pub blocks: u64,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
    /// Zero when the host does not record creation times.
    pub crtime: Timespec,
    pub kind: FileType,
    /// Permission bits, including setuid, setgid and sticky.
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub blksize: u32,
    /// BSD file flags (`st_flags`); zero where unsupported.
    pub flags: u32,
}

impl From<&Metadata> for FileAttr {
    fn from(meta: &Metadata) -> Self {
        let mode = meta.mode();
        Self {
            ino: meta.ino(),
            size: meta.size(),
            blocks: meta.blocks(),
            atime: FileTime::from_last_access_time(meta).into(),
            mtime: FileTime::from_last_modification_time(meta).into(),
            ctime: Timespec::new(meta.ctime(), meta.ctime_nsec() as u32),
            crtime: FileTime::from_creation_time(meta).map_or(Timespec::ZERO, Timespec::from),
            kind: FileType::from_mode(mode).unwrap_or(FileType::RegularFile),
            perm: (mode & 0o7777) as u16,
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            blksize: meta.blksize() as u32,
            flags: bsd_flags(meta),
        }
    }
}

#[cfg(target_os = "macos")]
fn bsd_flags(meta: &Metadata) -> u32 {
    std::os::macos::fs::MetadataExt::st_flags(meta)
}

#[cfg(not(target_os = "macos"))]
fn bsd_flags(_meta: &Metadata) -> u32 {
    0
}

/// One directory entry passed to the `readdir` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub ino: u64,
    /// `None` when the host did not report the type.
    pub kind: Option<FileType>,
}

/// Filesystem statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFs {
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
    pub block_size: u64,
    pub fragment_size: u64,
    pub name_max: u64,
}

/// Backup and creation times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XTimes {
    pub backup: Timespec,
    pub creation: Timespec,
}

bitflags! {
    /// Which fields of a [`SetAttrX`] request are present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SetAttrMask: u32 {
        const MODE = 1 << 0;
        const UID = 1 << 1;
        const GID = 1 << 2;
        const SIZE = 1 << 3;
        const ACCTIME = 1 << 4;
        const MODTIME = 1 << 5;
        const CRTIME = 1 << 6;
        const CHGTIME = 1 << 7;
        const BKUPTIME = 1 << 8;
        const FLAGS = 1 << 9;
    }
}

/// A combined attribute change. Only fields named in `valid` are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetAttrX {
    pub valid: SetAttrMask,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub acctime: Timespec,
    pub modtime: Timespec,
    pub crtime: Timespec,
    pub chgtime: Timespec,
    pub bkuptime: Timespec,
    pub flags: u32,
}

impl SetAttrX {
    /// Whether `field` is present.
    pub fn wants(&self, field: SetAttrMask) -> bool {
        self.valid.contains(field)
    }
}

bitflags! {
    /// Flags of a `setxattr` request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct XattrFlags: u32 {
        /// Fail if the attribute exists.
        const CREATE = 1 << 0;
        /// Fail if the attribute does not exist.
        const REPLACE = 1 << 1;
        /// Skip the host's security checks.
        const NOSECURITY = 1 << 2;
    }
}

bitflags! {
    /// Optional behaviour a filesystem asks the kernel to enable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Volume renames are forwarded to the filesystem.
        const SET_VOLNAME = 1 << 0;
        /// Backup and creation times are queried through `getxtimes`.
        const XTIMES = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_type_mode_bits() {
        for kind in [
            FileType::NamedPipe,
            FileType::CharDevice,
            FileType::BlockDevice,
            FileType::Directory,
            FileType::RegularFile,
            FileType::Symlink,
            FileType::Socket,
        ] {
            assert_eq!(FileType::from_mode(kind.mode_bits() | 0o644), Some(kind));
        }
        assert_eq!(FileType::from_mode(0o644), None);
    }

    #[test]
    fn test_attr_from_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        std::fs::write(&path, b"hello").unwrap();
        let meta = std::fs::symlink_metadata(&path).unwrap();

        let attr = FileAttr::from(&meta);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.size, 5);
        assert_eq!(attr.ino, meta.ino());
        assert_eq!(u32::from(attr.perm), meta.mode() & 0o7777);
        assert_eq!(attr.nlink, 1);
    }

    #[test]
    fn test_timespec_filetime_conversion() {
        let t = Timespec::new(1_700_000_000, 250);
        assert_eq!(Timespec::from(FileTime::from(t)), t);
    }
}
