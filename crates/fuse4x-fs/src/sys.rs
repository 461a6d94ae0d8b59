//! Host calls std does not wrap: extended attributes, atomic exchange,
//! extended times and BSD flags. None of them follow a trailing symlink.

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::{Errno, OpResult};
#[cfg(not(target_os = "macos"))]
use crate::types::XTimes;
use crate::types::{Timespec, XattrFlags};

pub(crate) fn c_path(path: &Path) -> OpResult<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)
}

fn c_name(name: &OsStr) -> OpResult<CString> {
    CString::new(name.as_bytes()).map_err(|_| Errno::EINVAL)
}

fn check(res: libc::c_int) -> OpResult<()> {
    if res == -1 { Err(Errno::last()) } else { Ok(()) }
}

fn check_len(res: libc::ssize_t) -> OpResult<usize> {
    usize::try_from(res).map_err(|_| Errno::last())
}

fn buf_parts(buf: &mut [u8]) -> (*mut libc::c_void, usize) {
    if buf.is_empty() {
        (std::ptr::null_mut(), 0)
    } else {
        (buf.as_mut_ptr().cast(), buf.len())
    }
}

#[cfg(target_os = "macos")]
mod imp {
    use std::mem::size_of;

    use super::{OpResult, Timespec, XattrFlags, buf_parts, c_name, c_path, check, check_len};
    use std::ffi::OsStr;
    use std::path::Path;

    const XATTR_NOSECURITY: libc::c_int = 0x0008;

    fn xattr_options(flags: XattrFlags) -> libc::c_int {
        let mut options = libc::XATTR_NOFOLLOW;
        if flags.contains(XattrFlags::CREATE) {
            options |= libc::XATTR_CREATE;
        }
        if flags.contains(XattrFlags::REPLACE) {
            options |= libc::XATTR_REPLACE;
        }
        if flags.contains(XattrFlags::NOSECURITY) {
            options |= XATTR_NOSECURITY;
        }
        options
    }

    pub(crate) fn getxattr(
        path: &Path,
        name: &OsStr,
        buf: &mut [u8],
        position: u32,
    ) -> OpResult<usize> {
        let (path, name) = (c_path(path)?, c_name(name)?);
        let (ptr, len) = buf_parts(buf);
        // SAFETY: both strings are NUL-terminated; ptr/len describe `buf` or are null/0.
        let res = unsafe {
            libc::getxattr(path.as_ptr(), name.as_ptr(), ptr, len, position, libc::XATTR_NOFOLLOW)
        };
        check_len(res)
    }

    pub(crate) fn setxattr(
        path: &Path,
        name: &OsStr,
        value: &[u8],
        flags: XattrFlags,
        position: u32,
    ) -> OpResult<()> {
        let (path, name) = (c_path(path)?, c_name(name)?);
        // SAFETY: both strings are NUL-terminated; value is a live slice.
        check(unsafe {
            libc::setxattr(
                path.as_ptr(),
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                position,
                xattr_options(flags),
            )
        })
    }

    pub(crate) fn listxattr(path: &Path, buf: &mut [u8]) -> OpResult<usize> {
        let path = c_path(path)?;
        let (ptr, len) = buf_parts(buf);
        // SAFETY: path is NUL-terminated; ptr/len describe `buf` or are null/0.
        let res = unsafe { libc::listxattr(path.as_ptr(), ptr.cast(), len, libc::XATTR_NOFOLLOW) };
        check_len(res)
    }

    pub(crate) fn removexattr(path: &Path, name: &OsStr) -> OpResult<()> {
        let (path, name) = (c_path(path)?, c_name(name)?);
        // SAFETY: both strings are NUL-terminated.
        check(unsafe { libc::removexattr(path.as_ptr(), name.as_ptr(), libc::XATTR_NOFOLLOW) })
    }

    pub(crate) fn exchange(a: &Path, b: &Path) -> OpResult<()> {
        let (a, b) = (c_path(a)?, c_path(b)?);
        // SAFETY: both strings are NUL-terminated.
        check(unsafe { libc::renamex_np(a.as_ptr(), b.as_ptr(), libc::RENAME_SWAP) })
    }

    fn attr_list(attr: libc::attrgroup_t) -> libc::attrlist {
        libc::attrlist {
            bitmapcount: libc::ATTR_BIT_MAP_COUNT,
            reserved: 0,
            commonattr: attr,
            volattr: 0,
            dirattr: 0,
            fileattr: 0,
            forkattr: 0,
        }
    }

    #[repr(C, packed(4))]
    struct TimeAttrBuf {
        _length: u32,
        time: libc::timespec,
    }

    pub(crate) fn get_time_attr(path: &Path, attr: libc::attrgroup_t) -> OpResult<Timespec> {
        let path = c_path(path)?;
        let mut list = attr_list(attr);
        let mut buf = TimeAttrBuf {
            _length: 0,
            time: libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
        };
        // SAFETY: list and buf are live locals; the size passed matches buf.
        check(unsafe {
            libc::getattrlist(
                path.as_ptr(),
                (&raw mut list).cast(),
                (&raw mut buf).cast(),
                size_of::<TimeAttrBuf>(),
                libc::FSOPT_NOFOLLOW,
            )
        })?;
        let time = buf.time;
        Ok(Timespec::new(time.tv_sec, time.tv_nsec as u32))
    }

    pub(crate) fn set_time_attr(
        path: &Path,
        attr: libc::attrgroup_t,
        time: Timespec,
    ) -> OpResult<()> {
        let path = c_path(path)?;
        let mut list = attr_list(attr);
        let mut value = libc::timespec {
            tv_sec: time.sec,
            tv_nsec: libc::c_long::from(time.nsec),
        };
        // SAFETY: list and value are live locals; the size passed matches value.
        check(unsafe {
            libc::setattrlist(
                path.as_ptr(),
                (&raw mut list).cast(),
                (&raw mut value).cast(),
                size_of::<libc::timespec>(),
                libc::FSOPT_NOFOLLOW,
            )
        })
    }

    pub(crate) fn getxtimes(path: &Path) -> OpResult<crate::types::XTimes> {
        std::fs::symlink_metadata(path)?;
        Ok(crate::types::XTimes {
            backup: get_time_attr(path, libc::ATTR_CMN_BKUPTIME).unwrap_or(Timespec::ZERO),
            creation: get_time_attr(path, libc::ATTR_CMN_CRTIME).unwrap_or(Timespec::ZERO),
        })
    }

    pub(crate) fn set_crtime(path: &Path, time: Timespec) -> OpResult<()> {
        set_time_attr(path, libc::ATTR_CMN_CRTIME, time)
    }

    pub(crate) fn set_chgtime(path: &Path, time: Timespec) -> OpResult<()> {
        set_time_attr(path, libc::ATTR_CMN_CHGTIME, time)
    }

    pub(crate) fn set_bkuptime(path: &Path, time: Timespec) -> OpResult<()> {
        set_time_attr(path, libc::ATTR_CMN_BKUPTIME, time)
    }

    pub(crate) fn lchflags(path: &Path, flags: u32) -> OpResult<()> {
        let path = c_path(path)?;
        // SAFETY: path is NUL-terminated.
        check(unsafe { libc::lchflags(path.as_ptr(), flags) })
    }

    pub(crate) fn lchmod(path: &Path, mode: u32) -> OpResult<()> {
        let path = c_path(path)?;
        // SAFETY: path is NUL-terminated.
        check(unsafe {
            libc::fchmodat(
                libc::AT_FDCWD,
                path.as_ptr(),
                mode as libc::mode_t,
                libc::AT_SYMLINK_NOFOLLOW,
            )
        })
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::{
        Errno, OpResult, Timespec, XTimes, XattrFlags, buf_parts, c_name, c_path, check, check_len,
    };
    use filetime::FileTime;
    use std::ffi::OsStr;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    // Resource fork offsets do not exist here.
    fn require_zero_position(position: u32) -> OpResult<()> {
        if position == 0 { Ok(()) } else { Err(Errno::EINVAL) }
    }

    pub(crate) fn getxattr(
        path: &Path,
        name: &OsStr,
        buf: &mut [u8],
        position: u32,
    ) -> OpResult<usize> {
        require_zero_position(position)?;
        let (path, name) = (c_path(path)?, c_name(name)?);
        let (ptr, len) = buf_parts(buf);
        // SAFETY: both strings are NUL-terminated; ptr/len describe `buf` or are null/0.
        let res = unsafe { libc::lgetxattr(path.as_ptr(), name.as_ptr(), ptr, len) };
        check_len(res)
    }

    pub(crate) fn setxattr(
        path: &Path,
        name: &OsStr,
        value: &[u8],
        flags: XattrFlags,
        position: u32,
    ) -> OpResult<()> {
        require_zero_position(position)?;
        let (path, name) = (c_path(path)?, c_name(name)?);
        let mut raw = 0;
        if flags.contains(XattrFlags::CREATE) {
            raw |= libc::XATTR_CREATE;
        }
        if flags.contains(XattrFlags::REPLACE) {
            raw |= libc::XATTR_REPLACE;
        }
        // SAFETY: both strings are NUL-terminated; value is a live slice.
        check(unsafe {
            libc::lsetxattr(
                path.as_ptr(),
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                raw,
            )
        })
    }

    pub(crate) fn listxattr(path: &Path, buf: &mut [u8]) -> OpResult<usize> {
        let path = c_path(path)?;
        let (ptr, len) = buf_parts(buf);
        // SAFETY: path is NUL-terminated; ptr/len describe `buf` or are null/0.
        let res = unsafe { libc::llistxattr(path.as_ptr(), ptr.cast(), len) };
        check_len(res)
    }

    pub(crate) fn removexattr(path: &Path, name: &OsStr) -> OpResult<()> {
        let (path, name) = (c_path(path)?, c_name(name)?);
        // SAFETY: both strings are NUL-terminated.
        check(unsafe { libc::lremovexattr(path.as_ptr(), name.as_ptr()) })
    }

    pub(crate) fn exchange(a: &Path, b: &Path) -> OpResult<()> {
        let (a, b) = (c_path(a)?, c_path(b)?);
        // SAFETY: both strings are NUL-terminated.
        check(unsafe {
            libc::renameat2(
                libc::AT_FDCWD,
                a.as_ptr(),
                libc::AT_FDCWD,
                b.as_ptr(),
                libc::RENAME_EXCHANGE,
            )
        })
    }

    pub(crate) fn getxtimes(path: &Path) -> OpResult<XTimes> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(XTimes {
            backup: Timespec::ZERO,
            creation: FileTime::from_creation_time(&meta).map_or(Timespec::ZERO, Timespec::from),
        })
    }

    pub(crate) fn set_crtime(_path: &Path, _time: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn set_chgtime(_path: &Path, _time: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn set_bkuptime(_path: &Path, _time: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn lchflags(_path: &Path, _flags: u32) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    // Symlink modes cannot be changed here; follows like chmod(2).
    pub(crate) fn lchmod(path: &Path, mode: u32) -> OpResult<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        Ok(())
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
mod imp {
    use super::{Errno, OpResult, Timespec, XTimes, XattrFlags};
    use filetime::FileTime;
    use std::ffi::OsStr;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    pub(crate) fn getxattr(_: &Path, _: &OsStr, _: &mut [u8], _: u32) -> OpResult<usize> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn setxattr(_: &Path, _: &OsStr, _: &[u8], _: XattrFlags, _: u32) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn listxattr(_: &Path, _: &mut [u8]) -> OpResult<usize> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn removexattr(_: &Path, _: &OsStr) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn exchange(_: &Path, _: &Path) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn getxtimes(path: &Path) -> OpResult<XTimes> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(XTimes {
            backup: Timespec::ZERO,
            creation: FileTime::from_creation_time(&meta).map_or(Timespec::ZERO, Timespec::from),
        })
    }

    pub(crate) fn set_crtime(_: &Path, _: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn set_chgtime(_: &Path, _: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn set_bkuptime(_: &Path, _: Timespec) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn lchflags(_: &Path, _: u32) -> OpResult<()> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn lchmod(path: &Path, mode: u32) -> OpResult<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        Ok(())
    }
}

pub(crate) use imp::{
    exchange, getxattr, getxtimes, lchflags, lchmod, listxattr, removexattr, set_bkuptime,
    set_chgtime, set_crtime, setxattr,
};
