//! Option parsing.
//!
//! [`parse_options`] is the single dispatcher over [`MOUNT_OPTIONS`]: each
//! token is looked up once, its action applied, and after the last token the
//! configuration is finalized.
//!
//! [`MOUNT_OPTIONS`]: crate::options::MOUNT_OPTIONS

use tracing::{debug, trace};

use crate::config::MountConfig;
use crate::error::OptionError;
use crate::flags::AltFlags;
use crate::options::{self, NumericParam, OptionAction, TextParam};
use crate::params::MAXPATHLEN;

/// Result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedOptions {
    /// Validated configuration.
    pub config: MountConfig,
    /// Arguments to forward to helper modules of the high-level library,
    /// in the order their options appeared.
    pub passthrough: Vec<String>,
}

/// Parses individual option tokens into a validated configuration.
///
/// Tokens are matched exact-literal first, then by the longest `key=`
/// prefix. The first unknown or malformed token aborts the parse; conflicts
/// between options are checked once all tokens are consumed.
pub fn parse_options<I, S>(tokens: I) -> Result<ParsedOptions, OptionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedOptions::default();

    for token in tokens {
        let token = token.as_ref();
        let Some((opt, value)) = options::lookup(token) else {
            return Err(OptionError::Unknown(token.to_string()));
        };
        trace!(token, option = %opt, "matched mount option");

        let config = &mut parsed.config;
        match opt.action {
            OptionAction::Standard(flag) => config.std_flags |= flag,
            OptionAction::Protocol(flags) => config.alt_flags |= flags,
            OptionAction::Numeric(param) => {
                config.set_numeric(param, parse_u32(param, value)?);
            }
            OptionAction::Text(param) => {
                config.set_text(param, bounded_text(param, value)?);
            }
            OptionAction::Quiet => {
                config.alt_flags |= AltFlags::QUIET;
                config.quiet = true;
            }
            OptionAction::AllowRecursion => config.allow_recursion = true,
            OptionAction::VolIcon => {
                check_bounded("volicon", value, MAXPATHLEN - 1)?;
                parsed
                    .passthrough
                    .push(format!("-omodules=volicon,iconpath={value}"));
            }
            OptionAction::Ignored => debug!(token, "ignoring mount option"),
        }
    }

    parsed.config.finalize()?;
    Ok(parsed)
}

/// Splits comma-joined option strings into individual tokens.
///
/// Empty tokens (`a,,b`, trailing commas) are dropped.
pub fn split_options<I, S>(groups: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    groups
        .into_iter()
        .flat_map(|group| {
            group
                .as_ref()
                .split(',')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Strict base-10 conversion: digits only, no sign, no whitespace.
fn parse_u32(param: NumericParam, value: &str) -> Result<u32, OptionError> {
    let invalid = || OptionError::InvalidNumber {
        param: param.name(),
        value: value.to_string(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn bounded_text(param: TextParam, value: &str) -> Result<String, OptionError> {
    check_bounded(param.name(), value, param.max_len())?;
    Ok(value.to_string())
}

fn check_bounded(param: &'static str, value: &str, max: usize) -> Result<(), OptionError> {
    if value.contains('\0') {
        return Err(OptionError::InteriorNul { param });
    }
    if value.len() > max {
        return Err(OptionError::TooLong {
            param,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptionConflict;
    use crate::flags::StdMountFlags;
    use crate::params::{DEFAULT_BLOCKSIZE, MAX_DAEMON_TIMEOUT};
    use proptest::prelude::*;

    #[test]
    fn test_empty_option_list_gives_defaults() {
        let parsed = parse_options(Vec::<String>::new()).unwrap();
        assert_eq!(parsed.config, MountConfig::default());
        assert!(parsed.passthrough.is_empty());
    }

    #[test]
    fn test_scenario_options() {
        let parsed = parse_options(["ro", "allow_other", "blocksize=4096"]).unwrap();
        let config = parsed.config;
        assert!(config.std_flags.contains(StdMountFlags::RDONLY));
        assert!(config.alt_flags.contains(AltFlags::ALLOW_OTHER));
        assert!(config.alt_flags.contains(AltFlags::BLOCKSIZE));
        assert_eq!(config.blocksize, 4096);
    }

    #[test]
    fn test_unknown_token_named_in_error() {
        let err = parse_options(["allow_other", "frobnicate"]).unwrap_err();
        assert_eq!(err, OptionError::Unknown("frobnicate".to_string()));
    }

    #[test]
    fn test_text_with_nul_is_error() {
        let err = parse_options(["volname=a\0b"]).unwrap_err();
        assert_eq!(err, OptionError::InteriorNul { param: "volname" });

        let err = parse_options(["ro", "volicon=/tmp/\0x.icns"]).unwrap_err();
        assert_eq!(err, OptionError::InteriorNul { param: "volicon" });
    }

    #[test]
    fn test_numeric_must_be_decimal() {
        for bad in ["", "0x10", "-1", "+5", " 5", "12abc", "99999999999"] {
            let token = format!("iosize={bad}");
            let err = parse_options([token.as_str()]).unwrap_err();
            assert!(
                matches!(err, OptionError::InvalidNumber { param: "iosize", .. }),
                "{token}: {err:?}"
            );
        }
    }

    #[test]
    fn test_text_overflow_is_error() {
        let name = "x".repeat(16);
        let token = format!("fstypename={name}");
        let err = parse_options([token.as_str()]).unwrap_err();
        assert_eq!(
            err,
            OptionError::TooLong {
                param: "fstypename",
                len: 16,
                max: 15
            }
        );

        let ok = format!("fstypename={}", &name[..15]);
        let parsed = parse_options([ok.as_str()]).unwrap();
        assert_eq!(parsed.config.fstypename.as_deref(), Some(&name[..15]));
    }

    #[test]
    fn test_volicon_is_forwarded() {
        let parsed = parse_options(["volicon=/tmp/icon.icns"]).unwrap();
        assert_eq!(
            parsed.passthrough,
            vec!["-omodules=volicon,iconpath=/tmp/icon.icns".to_string()]
        );
        assert_eq!(parsed.config, MountConfig::default());
    }

    #[test]
    fn test_subtype_ignored() {
        let parsed = parse_options(["subtype=sshfs"]).unwrap();
        assert_eq!(parsed.config, MountConfig::default());
    }

    #[test]
    fn test_quiet_and_allow_recursion() {
        let parsed = parse_options(["quiet", "allow_recursion"]).unwrap();
        assert!(parsed.config.quiet);
        assert!(parsed.config.alt_flags.contains(AltFlags::QUIET));
        assert!(parsed.config.allow_recursion);
    }

    #[test]
    fn test_conflict_reported_after_all_tokens() {
        // An unknown token after the conflict still wins: tokens are consumed
        // before invariants are checked.
        let err = parse_options(["allow_other", "allow_root", "bogus"]).unwrap_err();
        assert_eq!(err, OptionError::Unknown("bogus".to_string()));

        let err = parse_options(["allow_root", "allow_other"]).unwrap_err();
        assert_eq!(err, OptionError::Conflict(OptionConflict::AllowOtherAllowRoot));
    }

    #[test]
    fn test_last_value_wins() {
        let parsed = parse_options(["blocksize=512", "blocksize=1024"]).unwrap();
        assert_eq!(parsed.config.blocksize, 1024);
    }

    #[test]
    fn test_daemon_timeout_clamped() {
        let parsed = parse_options(["daemon_timeout=99999"]).unwrap();
        assert_eq!(parsed.config.daemon_timeout, MAX_DAEMON_TIMEOUT);
        assert_eq!(parsed.config.blocksize, DEFAULT_BLOCKSIZE);
    }

    #[test]
    fn test_split_options() {
        assert_eq!(
            split_options(["ro,allow_other", "volname=A", ",,quiet,"]),
            vec!["ro", "allow_other", "volname=A", "quiet"]
        );
    }

    fn conflict_free_flag() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "ro",
            "sync",
            "noexec",
            "nosuid",
            "nodev",
            "local",
            "nobrowse",
            "noatime",
            "allow_other",
            "auto_xattr",
            "default_permissions",
            "direct_io",
            "jail_symlinks",
            "noappledouble",
            "noattrcache",
            "noubc",
            "noreadahead",
            "novncache",
            "use_ino",
            "auto_cache",
            "sparse",
            "quiet",
        ])
    }

    proptest! {
        #[test]
        fn prop_conflict_free_sets_every_flag(
            tokens in prop::collection::vec(conflict_free_flag(), 0..12)
        ) {
            let parsed = parse_options(&tokens).unwrap();
            let config = parsed.config;
            for token in &tokens {
                let (opt, _) = options::lookup(token).unwrap();
                match opt.action {
                    OptionAction::Standard(flag) => prop_assert!(config.std_flags.contains(flag)),
                    OptionAction::Protocol(flag) => prop_assert!(config.alt_flags.contains(flag)),
                    OptionAction::Quiet => prop_assert!(config.quiet),
                    _ => {}
                }
            }
        }

        #[test]
        fn prop_nolocalcaches_matches_constituents(
            extra in prop::collection::vec(conflict_free_flag(), 0..6)
        ) {
            let mut sugar = extra.clone();
            sugar.push("nolocalcaches");
            let mut spelled = extra;
            spelled.extend(["noattrcache", "noreadahead", "noubc", "novncache"]);
            prop_assert_eq!(parse_options(&sugar).unwrap(), parse_options(&spelled).unwrap());
        }

        #[test]
        fn prop_clamp_idempotent(daemon in any::<u32>(), init in any::<u32>()) {
            let first = parse_options([
                format!("daemon_timeout={daemon}"),
                format!("init_timeout={init}"),
            ]).unwrap().config;
            let second = parse_options([
                format!("daemon_timeout={}", first.daemon_timeout),
                format!("init_timeout={}", first.init_timeout),
            ]).unwrap().config;
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_any_conflict_pair_rejected(
            pair in prop::sample::select(vec![
                ("allow_other", "allow_root"),
                ("negative_vncache", "novncache"),
                ("nosyncwrites", "noubc"),
                ("nosyncwrites", "noreadahead"),
                ("default_permissions", "defer_permissions"),
                ("auto_xattr", "native_xattr"),
            ]),
            extra in prop::collection::vec(conflict_free_flag(), 0..6),
            swap in any::<bool>(),
        ) {
            let (a, b) = if swap { (pair.1, pair.0) } else { pair };
            let mut tokens = extra;
            tokens.push(a);
            tokens.push(b);
            let err = parse_options(&tokens).unwrap_err();
            prop_assert!(matches!(err, OptionError::Conflict(_)));
        }
    }
}
