//! Passthrough reference filesystem.
//!
//! Every operation resolves its path under a host directory and performs
//! the matching host call, translating the host error into an [`Errno`].
//! Nothing is cached and no handles are kept, so concurrent calls need no
//! synchronization.

use std::ffi::{OsStr, OsString};
use std::fs::{self, DirBuilder, File, OpenOptions, Permissions};
use std::ops::ControlFlow;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use nix::dir::{Dir, Type};
use nix::fcntl::OFlag;
use nix::sys::stat::{Mode, SFlag};
use nix::unistd::AccessFlags;
use tracing::trace;

use crate::error::{Errno, OpResult};
use crate::ops::FilesystemOps;
use crate::sys;
use crate::types::{
    Capabilities, DirEntry, FileAttr, FileType, SetAttrMask, SetAttrX, StatFs, Timespec, XTimes,
    XattrFlags,
};
use crate::xattr;

/// Serves a host directory tree unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    root: PathBuf,
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Passthrough {
    /// Serves the host root: volume paths are host paths.
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Serves `root` as the volume root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Host directory behind the volume root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for a volume path.
    ///
    /// `.` and `..` are resolved lexically and `..` stops at the volume
    /// root, as it does at `/`. Symlinks are left to the host.
    pub fn host_path(&self, path: &Path) -> PathBuf {
        let mut relative = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => relative.push(name),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        if relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

fn dir_entry_kind(kind: Type) -> FileType {
    match kind {
        Type::Fifo => FileType::NamedPipe,
        Type::CharacterDevice => FileType::CharDevice,
        Type::Directory => FileType::Directory,
        Type::BlockDevice => FileType::BlockDevice,
        Type::File => FileType::RegularFile,
        Type::Symlink => FileType::Symlink,
        Type::Socket => FileType::Socket,
    }
}

fn permission_bits(mode: u32) -> Mode {
    Mode::from_bits_truncate((mode & 0o7777) as libc::mode_t)
}

impl FilesystemOps for Passthrough {
    fn init(&self) -> Capabilities {
        Capabilities::SET_VOLNAME | Capabilities::XTIMES
    }

    fn getattr(&self, path: &Path) -> OpResult<FileAttr> {
        let meta = fs::symlink_metadata(self.host_path(path))?;
        Ok(FileAttr::from(&meta))
    }

    fn access(&self, path: &Path, mask: i32) -> OpResult<()> {
        nix::unistd::access(
            self.host_path(path).as_path(),
            AccessFlags::from_bits_truncate(mask),
        )?;
        Ok(())
    }

    fn readlink(&self, path: &Path) -> OpResult<PathBuf> {
        Ok(fs::read_link(self.host_path(path))?)
    }

    fn readdir(
        &self,
        path: &Path,
        filler: &mut dyn FnMut(DirEntry) -> ControlFlow<()>,
    ) -> OpResult<()> {
        let host = self.host_path(path);
        let mut dir = Dir::open(
            host.as_path(),
            OFlag::O_RDONLY | OFlag::O_DIRECTORY,
            Mode::empty(),
        )?;
        for entry in dir.iter() {
            let entry = entry?;
            let item = DirEntry {
                name: OsStr::from_bytes(entry.file_name().to_bytes()).to_os_string(),
                ino: entry.ino(),
                kind: entry.file_type().map(dir_entry_kind),
            };
            if filler(item).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> OpResult<()> {
        let host = self.host_path(path);
        trace!(path = %host.display(), mode, rdev, "mknod");
        match FileType::from_mode(mode) {
            Some(FileType::RegularFile) => {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(mode & 0o7777)
                    .open(&host)?;
            }
            Some(FileType::NamedPipe) => {
                nix::unistd::mkfifo(host.as_path(), permission_bits(mode))?;
            }
            kind => {
                nix::sys::stat::mknod(
                    host.as_path(),
                    SFlag::from_bits_truncate(kind.map_or(0, FileType::mode_bits) as libc::mode_t),
                    permission_bits(mode),
                    rdev as libc::dev_t,
                )?;
            }
        }
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> OpResult<()> {
        DirBuilder::new().mode(mode).create(self.host_path(path))?;
        Ok(())
    }

    fn unlink(&self, path: &Path) -> OpResult<()> {
        fs::remove_file(self.host_path(path))?;
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> OpResult<()> {
        fs::remove_dir(self.host_path(path))?;
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> OpResult<()> {
        std::os::unix::fs::symlink(target, self.host_path(link))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> OpResult<()> {
        trace!(from = %from.display(), to = %to.display(), "rename");
        fs::rename(self.host_path(from), self.host_path(to))?;
        Ok(())
    }

    fn link(&self, from: &Path, to: &Path) -> OpResult<()> {
        fs::hard_link(self.host_path(from), self.host_path(to))?;
        Ok(())
    }

    fn chmod(&self, path: &Path, mode: u32) -> OpResult<()> {
        fs::set_permissions(self.host_path(path), Permissions::from_mode(mode))?;
        Ok(())
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> OpResult<()> {
        std::os::unix::fs::lchown(self.host_path(path), uid, gid)?;
        Ok(())
    }

    fn truncate(&self, path: &Path, size: u64) -> OpResult<()> {
        let size = libc::off_t::try_from(size).map_err(|_| Errno::EINVAL)?;
        nix::unistd::truncate(self.host_path(path).as_path(), size)?;
        Ok(())
    }

    fn utimens(&self, path: &Path, atime: Timespec, mtime: Timespec) -> OpResult<()> {
        filetime::set_file_times(self.host_path(path), atime.into(), mtime.into())?;
        Ok(())
    }

    fn open(&self, path: &Path, flags: i32) -> OpResult<()> {
        let access = flags & libc::O_ACCMODE;
        OpenOptions::new()
            .read(access != libc::O_WRONLY)
            .write(access != libc::O_RDONLY)
            .custom_flags(flags & !libc::O_ACCMODE)
            .open(self.host_path(path))?;
        Ok(())
    }

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> OpResult<usize> {
        let file = File::open(self.host_path(path))?;
        Ok(file.read_at(buf, offset)?)
    }

    fn write(&self, path: &Path, data: &[u8], offset: u64) -> OpResult<usize> {
        let file = OpenOptions::new().write(true).open(self.host_path(path))?;
        Ok(file.write_at(data, offset)?)
    }

    fn statfs(&self, path: &Path) -> OpResult<StatFs> {
        let st = nix::sys::statvfs::statvfs(self.host_path(path).as_path())?;
        Ok(StatFs {
            blocks: u64::from(st.blocks()),
            blocks_free: u64::from(st.blocks_free()),
            blocks_available: u64::from(st.blocks_available()),
            files: u64::from(st.files()),
            files_free: u64::from(st.files_free()),
            block_size: u64::from(st.block_size()),
            fragment_size: u64::from(st.fragment_size()),
            name_max: u64::from(st.name_max()),
        })
    }

    fn getxattr(&self, path: &Path, name: &OsStr, position: u32) -> OpResult<Vec<u8>> {
        let host = self.host_path(path);
        let name = xattr::stored_name(name);
        let size = sys::getxattr(&host, &name, &mut [], position)?;
        let mut value = vec![0; size];
        let len = sys::getxattr(&host, &name, &mut value, position)?;
        value.truncate(len);
        Ok(value)
    }

    fn setxattr(
        &self,
        path: &Path,
        name: &OsStr,
        value: &[u8],
        flags: XattrFlags,
        position: u32,
    ) -> OpResult<()> {
        let flags = xattr::store_flags(name, flags);
        sys::setxattr(
            &self.host_path(path),
            &xattr::stored_name(name),
            value,
            flags,
            position,
        )
    }

    fn listxattr(&self, path: &Path) -> OpResult<Vec<OsString>> {
        let host = self.host_path(path);
        let size = sys::listxattr(&host, &mut [])?;
        let mut buf = vec![0; size];
        let len = sys::listxattr(&host, &mut buf)?;
        buf.truncate(len);
        Ok(xattr::visible_names(xattr::split_names(&buf)))
    }

    fn removexattr(&self, path: &Path, name: &OsStr) -> OpResult<()> {
        sys::removexattr(&self.host_path(path), &xattr::stored_name(name))
    }

    fn exchange(&self, path1: &Path, path2: &Path, _options: u64) -> OpResult<()> {
        trace!(path1 = %path1.display(), path2 = %path2.display(), "exchange");
        sys::exchange(&self.host_path(path1), &self.host_path(path2))
    }

    fn getxtimes(&self, path: &Path) -> OpResult<XTimes> {
        sys::getxtimes(&self.host_path(path))
    }

    fn setattr_x(&self, path: &Path, attr: &SetAttrX) -> OpResult<()> {
        let host = self.host_path(path);
        trace!(path = %host.display(), valid = ?attr.valid, "setattr_x");

        if attr.wants(SetAttrMask::MODE) {
            sys::lchmod(&host, attr.mode)?;
        }

        let uid = attr.wants(SetAttrMask::UID).then_some(attr.uid);
        let gid = attr.wants(SetAttrMask::GID).then_some(attr.gid);
        if uid.is_some() || gid.is_some() {
            std::os::unix::fs::lchown(&host, uid, gid)?;
        }

        if attr.wants(SetAttrMask::SIZE) {
            self.truncate(path, attr.size)?;
        }

        if attr.wants(SetAttrMask::MODTIME) {
            let atime = if attr.wants(SetAttrMask::ACCTIME) {
                attr.acctime
            } else {
                Timespec::now()
            };
            filetime::set_file_times(&host, atime.into(), attr.modtime.into())?;
        } else if attr.wants(SetAttrMask::ACCTIME) {
            filetime::set_file_atime(&host, FileTime::from(attr.acctime))?;
        }

        if attr.wants(SetAttrMask::CRTIME) {
            sys::set_crtime(&host, attr.crtime)?;
        }
        if attr.wants(SetAttrMask::CHGTIME) {
            sys::set_chgtime(&host, attr.chgtime)?;
        }
        if attr.wants(SetAttrMask::BKUPTIME) {
            sys::set_bkuptime(&host, attr.bkuptime)?;
        }
        if attr.wants(SetAttrMask::FLAGS) {
            sys::lchflags(&host, attr.flags)?;
        }
        Ok(())
    }
}
