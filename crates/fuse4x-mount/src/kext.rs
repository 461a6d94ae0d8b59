//! Kernel extension compatibility gate.
//!
//! Before anything is mounted, the loaded kernel extension must report
//! exactly the version this library was built for. The argument block is
//! not self-describing, so any difference is treated as incompatible.

use tracing::{debug, info};

use crate::error::KernelError;
use crate::notify::{self, Notification, Notifier};
use crate::params::MIN_OS_MAJOR;
use crate::platform::Platform;
use crate::settings::HostSettings;

/// Outcome of probing the kernel extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KextStatus {
    /// The extension is loaded and reports the expected version.
    Compatible {
        /// Reported version.
        version: String,
    },
    /// The running OS is older than the extension supports.
    IncompatibleOs {
        /// Kernel release, or why it could not be read.
        release: String,
    },
    /// The extension is not loaded and loading it failed.
    Missing {
        /// What failed.
        reason: String,
    },
    /// The extension reports another version.
    VersionMismatch {
        /// Reported version.
        kernel: String,
    },
}

/// Extracts the major number from a Darwin release string like `"11.4.2"`.
///
/// Returns `None` when the string has no `.` or the major part is not a
/// decimal number.
pub fn os_major(release: &str) -> Option<u32> {
    let (major, _) = release.split_once('.')?;
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    major.parse().ok()
}

/// Trims the reported sysctl value at its first NUL.
fn reported_version(raw: &[u8]) -> &[u8] {
    raw.iter()
        .position(|&b| b == 0)
        .map_or(raw, |end| &raw[..end])
}

/// Compares the version reported by the kernel with the expected one.
///
/// Both must have the same length and the same bytes; a reported value that
/// is a prefix of the expected one does not match.
pub fn versions_match(expected: &str, raw: &[u8]) -> bool {
    reported_version(raw) == expected.as_bytes()
}

/// Queries the kernel extension, running the loader helper once if it is not
/// loaded.
pub fn kext_status(platform: &dyn Platform, settings: &HostSettings) -> KextStatus {
    let release = match platform.os_release() {
        Ok(release) => release,
        Err(e) => {
            return KextStatus::IncompatibleOs {
                release: format!("uname failed: {e}"),
            };
        }
    };
    if os_major(&release).is_none_or(|major| major < MIN_OS_MAJOR) {
        return KextStatus::IncompatibleOs { release };
    }

    let raw = match platform.sysctl_string(&settings.version_sysctl) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(sysctl = %settings.version_sysctl, error = %e, "kernel extension not loaded");
            if let Err(reason) = run_loader(platform, settings) {
                return KextStatus::Missing { reason };
            }
            match platform.sysctl_string(&settings.version_sysctl) {
                Ok(raw) => raw,
                Err(e) => {
                    return KextStatus::Missing {
                        reason: format!("version query failed after loading: {e}"),
                    };
                }
            }
        }
    };

    let version = String::from_utf8_lossy(reported_version(&raw)).into_owned();
    if versions_match(&settings.expected_version, &raw) {
        KextStatus::Compatible { version }
    } else {
        KextStatus::VersionMismatch { kernel: version }
    }
}

fn run_loader(platform: &dyn Platform, settings: &HostSettings) -> Result<(), String> {
    info!(loader = %settings.loader.display(), "loading kernel extension");
    match platform.run_program(&settings.loader) {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(format!("{} exited with {status}", settings.loader.display())),
        Err(e) => Err(format!("failed to run {}: {e}", settings.loader.display())),
    }
}

/// Runs the compatibility gate.
///
/// Every failure is logged, announced on the notification bus and, unless
/// `quiet`, shown as an alert before it is returned.
pub fn check_kernel(
    platform: &dyn Platform,
    notifier: &dyn Notifier,
    settings: &HostSettings,
    quiet: bool,
) -> Result<String, KernelError> {
    let (event, err) = match kext_status(platform, settings) {
        KextStatus::Compatible { version } => {
            debug!(%version, "kernel extension compatible");
            return Ok(version);
        }
        KextStatus::IncompatibleOs { release } => {
            (Notification::OsTooOld, KernelError::OsTooOld { release })
        }
        KextStatus::Missing { reason } => {
            (Notification::KextNotLoaded, KernelError::Missing { reason })
        }
        KextStatus::VersionMismatch { kernel } => (
            Notification::VersionMismatch,
            KernelError::VersionMismatch {
                kernel,
                library: settings.expected_version.clone(),
            },
        ),
    };

    debug!(error = %err, "kernel extension check failed");
    notify::announce(notifier, event, None, quiet);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, RecordingNotifier};

    #[test]
    fn test_os_major() {
        assert_eq!(os_major("11.4.2"), Some(11));
        assert_eq!(os_major("9.8.0"), Some(9));
        assert_eq!(os_major("10"), None);
        assert_eq!(os_major("x.1"), None);
        assert_eq!(os_major(".1"), None);
    }

    #[test]
    fn test_versions_match() {
        assert!(versions_match("0.9.2", b"0.9.2\0"));
        assert!(versions_match("0.9.2", b"0.9.2"));
        assert!(!versions_match("0.9.2", b"0.9.1\0"));
        assert!(!versions_match("0.9.2", b"0.9\0"));
        assert!(!versions_match("0.9.2", b"0.9"));
        assert!(!versions_match("0.9.2", b"0.9.2.1\0"));
        assert!(!versions_match("0.9.2", b""));
    }

    #[test]
    fn test_compatible_without_loader() {
        let platform = FakePlatform::new();
        let status = kext_status(&platform, &HostSettings::default());
        assert_eq!(
            status,
            KextStatus::Compatible {
                version: "0.9.2".to_string()
            }
        );
        assert_eq!(platform.loader_runs(), 0);
    }

    #[test]
    fn test_old_os_rejected_before_query() {
        let platform = FakePlatform::new().os_release("9.8.0");
        let status = kext_status(&platform, &HostSettings::default());
        assert!(matches!(status, KextStatus::IncompatibleOs { .. }));
        assert_eq!(platform.sysctl_queries(), 0);
    }

    #[test]
    fn test_loader_runs_once_then_retries() {
        let platform = FakePlatform::new().kext_unloaded().loader_loads_kext(true);
        let status = kext_status(&platform, &HostSettings::default());
        assert!(matches!(status, KextStatus::Compatible { .. }));
        assert_eq!(platform.loader_runs(), 1);
        assert_eq!(platform.sysctl_queries(), 2);
    }

    #[test]
    fn test_loader_failure_is_missing() {
        let platform = FakePlatform::new().kext_unloaded().loader_loads_kext(false);
        let status = kext_status(&platform, &HostSettings::default());
        assert!(matches!(status, KextStatus::Missing { .. }));
        assert_eq!(platform.loader_runs(), 1);
        assert_eq!(platform.sysctl_queries(), 1);
    }

    #[test]
    fn test_mismatch_notifies() {
        let platform = FakePlatform::new().kext_version(b"0.8.0\0");
        let notifier = RecordingNotifier::new();
        let err = check_kernel(&platform, &notifier, &HostSettings::default(), false).unwrap_err();
        assert_eq!(
            err,
            KernelError::VersionMismatch {
                kernel: "0.8.0".to_string(),
                library: "0.9.2".to_string(),
            }
        );
        assert_eq!(notifier.posted().len(), 1);
        assert_eq!(notifier.posted()[0].name, Notification::VersionMismatch.name());
        assert_eq!(notifier.alerts().len(), 1);
    }

    #[test]
    fn test_each_failure_has_distinct_notification() {
        let cases = [
            FakePlatform::new().os_release("8.0.0"),
            FakePlatform::new().kext_unloaded().loader_loads_kext(false),
            FakePlatform::new().kext_version(b"1.0\0"),
        ];
        let mut names = Vec::new();
        for platform in &cases {
            let notifier = RecordingNotifier::new();
            check_kernel(platform, &notifier, &HostSettings::default(), true).unwrap_err();
            assert!(notifier.alerts().is_empty());
            names.push(notifier.posted()[0].name.clone());
        }
        names.dedup();
        assert_eq!(names.len(), 3);
    }
}
