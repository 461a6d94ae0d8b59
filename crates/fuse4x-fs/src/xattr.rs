//! Extended attribute name remapping.
//!
//! The kernel owns `com.apple.system.Security` on the volume itself, so the
//! passthrough stores that attribute under `org.apple.system.Security` on
//! the host and hides the stored name from listings.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

use crate::types::XattrFlags;

/// Namespace whose attributes must keep the host's security checks.
pub const APPLE_PREFIX: &str = "com.apple.";

/// Attribute name as seen through the volume.
pub const FILESEC_XATTR: &str = "com.apple.system.Security";

/// Attribute name under which [`FILESEC_XATTR`] is stored on the host.
pub const FILESEC_XATTR_STORED: &str = "org.apple.system.Security";

/// Host name for an attribute requested through the volume.
pub fn stored_name(name: &OsStr) -> Cow<'_, OsStr> {
    if name == FILESEC_XATTR {
        Cow::Owned(OsString::from(FILESEC_XATTR_STORED))
    } else {
        Cow::Borrowed(name)
    }
}

/// Flags to use when storing `name` on the host.
pub fn store_flags(name: &OsStr, flags: XattrFlags) -> XattrFlags {
    if name.as_bytes().starts_with(APPLE_PREFIX.as_bytes()) {
        flags - XattrFlags::NOSECURITY
    } else {
        flags
    }
}

/// Splits a NUL-separated name list as returned by `listxattr(2)`.
pub fn split_names(buf: &[u8]) -> Vec<OsString> {
    buf.split(|&b| b == 0)
        .filter(|name| !name.is_empty())
        .map(|name| OsString::from_vec(name.to_vec()))
        .collect()
}

/// Drops the stored security attribute from a listing.
pub fn visible_names(names: Vec<OsString>) -> Vec<OsString> {
    names
        .into_iter()
        .filter(|name| name != FILESEC_XATTR_STORED)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_attribute_renamed() {
        assert_eq!(
            &*stored_name(OsStr::new(FILESEC_XATTR)),
            OsStr::new(FILESEC_XATTR_STORED)
        );
        assert_eq!(&*stored_name(OsStr::new("user.tag")), OsStr::new("user.tag"));
        assert!(matches!(stored_name(OsStr::new("user.tag")), Cow::Borrowed(_)));
    }

    #[test]
    fn test_apple_names_keep_security() {
        let flags = XattrFlags::NOSECURITY | XattrFlags::CREATE;
        assert_eq!(
            store_flags(OsStr::new("com.apple.FinderInfo"), flags),
            XattrFlags::CREATE
        );
        assert_eq!(store_flags(OsStr::new("user.tag"), flags), flags);
    }

    #[test]
    fn test_listing_hides_stored_name() {
        let names = split_names(b"user.a\0org.apple.system.Security\0user.b\0");
        assert_eq!(names.len(), 3);
        assert_eq!(
            visible_names(names),
            vec![OsString::from("user.a"), OsString::from("user.b")]
        );
        assert!(split_names(b"").is_empty());
    }
}
