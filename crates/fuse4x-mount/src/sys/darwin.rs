//! Darwin system calls and CoreFoundation notifications.

use std::ffi::{CString, c_void};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{class, msg_send};
use objc2_foundation::NSString;
use tracing::warn;

use crate::flags::StdMountFlags;

const CF_USER_NOTIFICATION_CAUTION_ALERT_LEVEL: usize = 2;

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFUserNotificationDisplayNotice(
        timeout: f64,
        flags: usize,
        icon_url: *const c_void,
        sound_url: *const c_void,
        localization_url: *const c_void,
        alert_header: *const c_void,
        alert_message: *const c_void,
        default_button_title: *const c_void,
    ) -> i32;
}

fn c_string(bytes: &[u8]) -> io::Result<CString> {
    CString::new(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn c_path(path: &Path) -> io::Result<CString> {
    c_string(path.as_os_str().as_bytes())
}

/// Reads a sysctl by name. The value is returned as reported, including any
/// trailing NUL.
pub(crate) fn sysctl_string(name: &str) -> io::Result<Vec<u8>> {
    let name = c_string(name.as_bytes())?;
    let mut len: libc::size_t = 0;

    // SAFETY: a null output buffer asks for the value's size only.
    let rc = unsafe {
        libc::sysctlbyname(name.as_ptr(), ptr::null_mut(), &mut len, ptr::null_mut(), 0)
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut buf = vec![0u8; len];
    // SAFETY: `buf` is `len` bytes long and `len` tells the kernel so.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            buf.as_mut_ptr().cast(),
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    buf.truncate(len);
    Ok(buf)
}

pub(crate) fn mount(
    fs_type: &str,
    target: &Path,
    flags: StdMountFlags,
    data: &[u8],
) -> io::Result<()> {
    let fs_type = c_string(fs_type.as_bytes())?;
    let target = c_path(target)?;
    // SAFETY: all pointers are valid for the call; the kernel copies `data`
    // in and never writes through it.
    let rc = unsafe {
        libc::mount(
            fs_type.as_ptr(),
            target.as_ptr(),
            flags.bits() as libc::c_int,
            data.as_ptr().cast_mut().cast(),
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

pub(crate) fn unmount(target: &Path, force: bool) -> io::Result<()> {
    let target = c_path(target)?;
    let flags = if force { libc::MNT_FORCE } else { 0 };
    // SAFETY: `target` is a valid NUL-terminated path.
    let rc = unsafe { libc::unmount(target.as_ptr(), flags) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Posts on the distributed notification center. Delivery is not
/// confirmed.
pub(crate) fn post_distributed(name: &str, object: &str, user_info: &[(&str, &str)]) {
    let ns_name = NSString::from_str(name);
    let ns_object = NSString::from_str(object);

    // SAFETY: standard Foundation selectors with matching argument types.
    unsafe {
        let center: Option<Retained<AnyObject>> =
            msg_send![class!(NSDistributedNotificationCenter), defaultCenter];
        let Some(center) = center else {
            warn!(notification = name, "no distributed notification center");
            return;
        };

        let info: Option<Retained<AnyObject>> = if user_info.is_empty() {
            None
        } else {
            let dict: Option<Retained<AnyObject>> =
                msg_send![class!(NSMutableDictionary), dictionary];
            if let Some(dict) = &dict {
                for (key, value) in user_info {
                    let key = NSString::from_str(key);
                    let value = NSString::from_str(value);
                    let _: () = msg_send![&**dict, setObject: &*value, forKey: &*key];
                }
            }
            dict
        };

        let _: () = msg_send![
            &*center,
            postNotificationName: &*ns_name,
            object: &*ns_object,
            userInfo: info.as_deref(),
            deliverImmediately: true
        ];
    }
}

/// Shows a modal caution alert with an OK button. Returns immediately.
pub(crate) fn display_notice(title: &str, message: &str) {
    let title = NSString::from_str(title);
    let message = NSString::from_str(message);
    let ok = NSString::from_str("OK");

    // SAFETY: NSString is toll-free bridged with CFString; the strings
    // outlive the call.
    unsafe {
        CFUserNotificationDisplayNotice(
            0.0,
            CF_USER_NOTIFICATION_CAUTION_ALERT_LEVEL,
            ptr::null(),
            ptr::null(),
            ptr::null(),
            Retained::as_ptr(&title).cast(),
            Retained::as_ptr(&message).cast(),
            Retained::as_ptr(&ok).cast(),
        );
    }
}
