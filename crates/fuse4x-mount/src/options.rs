//! The mount option vocabulary.
//!
//! Every option this crate recognizes is one row of [`MOUNT_OPTIONS`]: a
//! [`Matcher`] that decides whether a raw token names the option, and an
//! [`OptionAction`] describing what the token does to the configuration.
//! The parser is a single generic dispatcher over this table; adding an
//! option means adding a row, never a new code path.

use std::fmt;

use crate::flags::{AltFlags, StdMountFlags};
use crate::params::{MAXPATHLEN, MFSTYPENAMELEN};

/// How a table row is matched against a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// The token must equal the literal.
    Exact(&'static str),
    /// The token must start with the literal (`key=`); the rest is the value.
    Prefix(&'static str),
}

impl Matcher {
    /// The literal this matcher compares against.
    pub fn literal(self) -> &'static str {
        match self {
            Self::Exact(s) | Self::Prefix(s) => s,
        }
    }

    /// Returns the value part of `token` if it matches.
    ///
    /// Exact matches yield an empty value.
    pub fn matches(self, token: &str) -> Option<&str> {
        match self {
            Self::Exact(lit) => (token == lit).then_some(""),
            Self::Prefix(lit) => token.strip_prefix(lit),
        }
    }
}

/// Numeric `key=value` parameters carried in the kernel argument block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericParam {
    BlockSize,
    DaemonTimeout,
    InitTimeout,
    IoSize,
    Fsid,
    FsSubtype,
}

impl NumericParam {
    /// Option key as the user spells it.
    pub fn name(self) -> &'static str {
        match self {
            Self::BlockSize => "blocksize",
            Self::DaemonTimeout => "daemon_timeout",
            Self::InitTimeout => "init_timeout",
            Self::IoSize => "iosize",
            Self::Fsid => "fsid",
            Self::FsSubtype => "fssubtype",
        }
    }

    /// The "value present" bit this parameter sets in [`AltFlags`].
    pub fn presence_flag(self) -> AltFlags {
        match self {
            Self::BlockSize => AltFlags::BLOCKSIZE,
            Self::DaemonTimeout => AltFlags::DAEMON_TIMEOUT,
            Self::InitTimeout => AltFlags::INIT_TIMEOUT,
            Self::IoSize => AltFlags::IOSIZE,
            Self::Fsid => AltFlags::FSID,
            Self::FsSubtype => AltFlags::FSSUBTYPE,
        }
    }
}

/// String `key=value` parameters carried in the kernel argument block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextParam {
    FsName,
    FsTypeName,
    VolName,
}

impl TextParam {
    /// Option key as the user spells it.
    pub fn name(self) -> &'static str {
        match self {
            Self::FsName => "fsname",
            Self::FsTypeName => "fstypename",
            Self::VolName => "volname",
        }
    }

    /// Capacity of the fixed-size kernel field, including its NUL.
    pub fn capacity(self) -> usize {
        match self {
            Self::FsName | Self::VolName => MAXPATHLEN,
            Self::FsTypeName => MFSTYPENAMELEN,
        }
    }

    /// Longest value that fits the kernel field.
    pub fn max_len(self) -> usize {
        self.capacity() - 1
    }
}

/// What a recognized option does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    /// Set a standard OS mount flag.
    Standard(StdMountFlags),
    /// Set one or more fuse4x flags. `nolocalcaches` uses this with
    /// [`AltFlags::NO_LOCALCACHES`].
    Protocol(AltFlags),
    /// Store a numeric parameter and set its presence flag.
    Numeric(NumericParam),
    /// Store a bounded string parameter.
    Text(TextParam),
    /// Set [`AltFlags::QUIET`] and suppress interactive alerts.
    Quiet,
    /// Permit mounting on top of another fuse4x volume.
    AllowRecursion,
    /// Forward a volume icon path to the volicon helper module.
    VolIcon,
    /// Accepted for compatibility and discarded.
    Ignored,
}

/// One row of the option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOption {
    /// Token matcher.
    pub matcher: Matcher,
    /// Effect on the configuration.
    pub action: OptionAction,
}

impl fmt::Display for MountOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.matcher {
            Matcher::Exact(lit) => f.write_str(lit),
            Matcher::Prefix(lit) => write!(f, "{lit}VALUE"),
        }
    }
}

const fn std_opt(lit: &'static str, flag: StdMountFlags) -> MountOption {
    MountOption {
        matcher: Matcher::Exact(lit),
        action: OptionAction::Standard(flag),
    }
}

const fn alt_opt(lit: &'static str, flag: AltFlags) -> MountOption {
    MountOption {
        matcher: Matcher::Exact(lit),
        action: OptionAction::Protocol(flag),
    }
}

const fn num_opt(lit: &'static str, param: NumericParam) -> MountOption {
    MountOption {
        matcher: Matcher::Prefix(lit),
        action: OptionAction::Numeric(param),
    }
}

const fn text_opt(lit: &'static str, param: TextParam) -> MountOption {
    MountOption {
        matcher: Matcher::Prefix(lit),
        action: OptionAction::Text(param),
    }
}

/// Every recognized option, in documentation order.
pub const MOUNT_OPTIONS: &[MountOption] = &[
    // Standard XNU flags
    std_opt("-r", StdMountFlags::RDONLY),
    std_opt("rdonly", StdMountFlags::RDONLY),
    std_opt("ro", StdMountFlags::RDONLY),
    std_opt("sync", StdMountFlags::SYNCHRONOUS),
    std_opt("noexec", StdMountFlags::NOEXEC),
    std_opt("nosuid", StdMountFlags::NOSUID),
    std_opt("nodev", StdMountFlags::NODEV),
    std_opt("union", StdMountFlags::UNION),
    std_opt("async", StdMountFlags::ASYNC),
    std_opt("quarantine", StdMountFlags::QUARANTINE),
    std_opt("local", StdMountFlags::LOCAL),
    std_opt("quota", StdMountFlags::QUOTA),
    std_opt("rootfs", StdMountFlags::ROOTFS),
    std_opt("nobrowse", StdMountFlags::DONTBROWSE),
    std_opt("noowners", StdMountFlags::IGNORE_OWNERSHIP),
    std_opt("automounted", StdMountFlags::AUTOMOUNTED),
    std_opt("journaled", StdMountFlags::JOURNALED),
    std_opt("nouserxattr", StdMountFlags::NOUSERXATTR),
    std_opt("defwrite", StdMountFlags::DEFWRITE),
    std_opt("multilabel", StdMountFlags::MULTILABEL),
    std_opt("noatime", StdMountFlags::NOATIME),
    // fuse4x flags
    alt_opt("allow_other", AltFlags::ALLOW_OTHER),
    MountOption {
        matcher: Matcher::Exact("allow_recursion"),
        action: OptionAction::AllowRecursion,
    },
    alt_opt("allow_root", AltFlags::ALLOW_ROOT),
    alt_opt("auto_xattr", AltFlags::AUTO_XATTR),
    num_opt("blocksize=", NumericParam::BlockSize),
    num_opt("daemon_timeout=", NumericParam::DaemonTimeout),
    alt_opt("default_permissions", AltFlags::DEFAULT_PERMISSIONS),
    alt_opt("defer_permissions", AltFlags::DEFER_PERMISSIONS),
    alt_opt("direct_io", AltFlags::DIRECT_IO),
    alt_opt("extended_security", AltFlags::EXTENDED_SECURITY),
    num_opt("fsid=", NumericParam::Fsid),
    text_opt("fsname=", TextParam::FsName),
    num_opt("fssubtype=", NumericParam::FsSubtype),
    text_opt("fstypename=", TextParam::FsTypeName),
    num_opt("init_timeout=", NumericParam::InitTimeout),
    num_opt("iosize=", NumericParam::IoSize),
    alt_opt("jail_symlinks", AltFlags::JAIL_SYMLINKS),
    alt_opt("negative_vncache", AltFlags::NEGATIVE_VNCACHE),
    alt_opt("noappledouble", AltFlags::NO_APPLEDOUBLE),
    alt_opt("noapplexattr", AltFlags::NO_APPLEXATTR),
    alt_opt("noattrcache", AltFlags::NO_ATTRCACHE),
    alt_opt("nolocalcaches", AltFlags::NO_LOCALCACHES),
    alt_opt("noreadahead", AltFlags::NO_READAHEAD),
    alt_opt("nosynconclose", AltFlags::NO_SYNCONCLOSE),
    alt_opt("nosyncwrites", AltFlags::NO_SYNCWRITES),
    alt_opt("noubc", AltFlags::NO_UBC),
    alt_opt("novncache", AltFlags::NO_VNCACHE),
    alt_opt("use_ino", AltFlags::USE_INO),
    text_opt("volname=", TextParam::VolName),
    MountOption {
        matcher: Matcher::Prefix("volicon="),
        action: OptionAction::VolIcon,
    },
    alt_opt("ping_diskarb", AltFlags::PING_DISKARB),
    alt_opt("auto_cache", AltFlags::AUTO_CACHE),
    alt_opt("native_xattr", AltFlags::NATIVE_XATTR),
    alt_opt("sparse", AltFlags::SPARSE),
    MountOption {
        matcher: Matcher::Exact("quiet"),
        action: OptionAction::Quiet,
    },
    // Consumed by the high-level library, not by the kernel.
    MountOption {
        matcher: Matcher::Prefix("subtype="),
        action: OptionAction::Ignored,
    },
];

/// Finds the table row for `token`.
///
/// Exact literals win over prefixes; among prefixes the longest literal
/// wins, so the result never depends on table order.
pub fn lookup(token: &str) -> Option<(&'static MountOption, &str)> {
    if let Some(opt) = MOUNT_OPTIONS
        .iter()
        .find(|o| matches!(o.matcher, Matcher::Exact(lit) if lit == token))
    {
        return Some((opt, ""));
    }

    MOUNT_OPTIONS
        .iter()
        .filter(|o| matches!(o.matcher, Matcher::Prefix(_)))
        .filter_map(|o| o.matcher.matches(token).map(|value| (o, value)))
        .max_by_key(|(o, _)| o.matcher.literal().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_literals_are_unique() {
        let mut seen = HashSet::new();
        for opt in MOUNT_OPTIONS {
            assert!(seen.insert(opt.matcher.literal()), "duplicate {}", opt);
        }
    }

    #[test]
    fn test_prefix_literals_end_with_equals() {
        for opt in MOUNT_OPTIONS {
            if let Matcher::Prefix(lit) = opt.matcher {
                assert!(lit.ends_with('='), "{lit}");
            }
        }
    }

    #[test]
    fn test_lookup_exact() {
        let (opt, value) = lookup("allow_other").unwrap();
        assert_eq!(opt.action, OptionAction::Protocol(AltFlags::ALLOW_OTHER));
        assert_eq!(value, "");
    }

    #[test]
    fn test_lookup_prefix_returns_value() {
        let (opt, value) = lookup("blocksize=4096").unwrap();
        assert_eq!(opt.action, OptionAction::Numeric(NumericParam::BlockSize));
        assert_eq!(value, "4096");
    }

    #[test]
    fn test_lookup_similar_prefixes() {
        let (opt, value) = lookup("fstypename=ntfs").unwrap();
        assert_eq!(opt.action, OptionAction::Text(TextParam::FsTypeName));
        assert_eq!(value, "ntfs");

        let (opt, _) = lookup("subtype=sshfs").unwrap();
        assert_eq!(opt.action, OptionAction::Ignored);

        let (opt, _) = lookup("fssubtype=3").unwrap();
        assert_eq!(opt.action, OptionAction::Numeric(NumericParam::FsSubtype));
    }

    #[test]
    fn test_lookup_flag_does_not_match_with_value() {
        assert!(lookup("allow_other=1").is_none());
        assert!(lookup("blocksize").is_none());
        assert!(lookup("bogus").is_none());
    }

    #[test]
    fn test_text_param_capacity() {
        assert_eq!(TextParam::FsName.max_len(), 1023);
        assert_eq!(TextParam::FsTypeName.max_len(), 15);
    }

    #[test]
    fn test_display_prefix_option() {
        let (opt, _) = lookup("volname=x").unwrap();
        assert_eq!(opt.to_string(), "volname=VALUE");
    }
}
