//! Desktop notifications.
//!
//! The mount sequence reports its outcome on the host's distributed
//! notification bus and, unless `quiet` is set, with a modal alert. Both go
//! through the [`Notifier`] capability. Delivery is best effort: a notifier
//! never reports failure to its caller.

use std::path::Path;

use tracing::info;

/// Bundle identifier all notification names derive from.
pub const BUNDLE_IDENTIFIER: &str = "com.google.filesystems.libfuse";

/// Sender object attached to every notification.
pub const NOTIFICATION_OBJECT: &str = "com.google.filesystems.libfuse.unotifications";

/// User-info key carrying the mount point path.
pub const MOUNT_PATH_KEY: &str = "kFUSEMountPathKey";

/// Events posted on the notification bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// The running OS predates the supported releases.
    OsTooOld,
    /// The kernel extension could not be loaded.
    KextNotLoaded,
    /// The kernel extension speaks another protocol version.
    VersionMismatch,
    /// `mount(2)` failed.
    FailedToMount,
    /// `mount(2)` succeeded.
    Mounted,
}

impl Notification {
    /// Bus name of the event.
    pub fn name(self) -> &'static str {
        match self {
            Self::OsTooOld => "com.google.filesystems.libfuse.osistooold",
            Self::KextNotLoaded => "com.google.filesystems.libfuse.invalidkext",
            Self::VersionMismatch => "com.google.filesystems.libfuse.versionmismatch",
            Self::FailedToMount => "com.google.filesystems.libfuse.failedtomount",
            Self::Mounted => "com.google.filesystems.libfuse.mounted",
        }
    }

    /// Title and message of the modal alert shown for this event, if any.
    pub fn alert(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::OsTooOld => Some((
                "Operating System Too Old",
                "The installed fuse4x version is too new for the operating system. \
                 Please downgrade your fuse4x installation to one that is compatible \
                 with the currently running operating system.",
            )),
            Self::KextNotLoaded => Some((
                "Fuse4x kernel extension error",
                "The fuse4x kernel extension was not loaded.",
            )),
            Self::VersionMismatch => Some((
                "Fuse4x runtime version mismatch",
                "The fuse4x library version this program is using is incompatible \
                 with the loaded fuse4x kernel extension.",
            )),
            Self::FailedToMount => Some((
                "Fuse4x failed to mount",
                "The fuse4x failed to mount path.",
            )),
            Self::Mounted => None,
        }
    }
}

/// Narrow capability for reporting outcomes to the desktop.
pub trait Notifier: Send + Sync {
    /// Posts `name` from `object` with a string-keyed payload.
    fn post(&self, name: &str, object: &str, user_info: &[(&str, &str)]);

    /// Shows a modal alert with an OK button.
    fn display_notice(&self, title: &str, message: &str);
}

/// Posts `event`, preceded by its alert unless `quiet`.
///
/// `mountpoint`, when given, is attached under [`MOUNT_PATH_KEY`].
pub fn announce(
    notifier: &dyn Notifier,
    event: Notification,
    mountpoint: Option<&Path>,
    quiet: bool,
) {
    if !quiet && let Some((title, message)) = event.alert() {
        notifier.display_notice(title, message);
    }
    match mountpoint {
        Some(path) => {
            let path = path.to_string_lossy();
            notifier.post(event.name(), NOTIFICATION_OBJECT, &[(MOUNT_PATH_KEY, path.as_ref())]);
        }
        None => notifier.post(event.name(), NOTIFICATION_OBJECT, &[]),
    }
}

/// Discards everything. Suitable for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn post(&self, _name: &str, _object: &str, _user_info: &[(&str, &str)]) {}

    fn display_notice(&self, _title: &str, _message: &str) {}
}

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post(&self, name: &str, object: &str, user_info: &[(&str, &str)]) {
        info!(name, object, ?user_info, "notification");
    }

    fn display_notice(&self, title: &str, message: &str) {
        info!(title, message, "alert");
    }
}

/// The host's notification bus.
///
/// On macOS this posts to the distributed notification center and shows
/// CoreFoundation alerts; elsewhere it behaves like [`LogNotifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNotifier;

impl Notifier for SystemNotifier {
    #[cfg(target_os = "macos")]
    fn post(&self, name: &str, object: &str, user_info: &[(&str, &str)]) {
        crate::sys::darwin::post_distributed(name, object, user_info);
    }

    #[cfg(not(target_os = "macos"))]
    fn post(&self, name: &str, object: &str, user_info: &[(&str, &str)]) {
        LogNotifier.post(name, object, user_info);
    }

    #[cfg(target_os = "macos")]
    fn display_notice(&self, title: &str, message: &str) {
        crate::sys::darwin::display_notice(title, message);
    }

    #[cfg(not(target_os = "macos"))]
    fn display_notice(&self, title: &str, message: &str) {
        LogNotifier.display_notice(title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Posted, RecordingNotifier};

    #[test]
    fn test_names_share_bundle_prefix() {
        for event in [
            Notification::OsTooOld,
            Notification::KextNotLoaded,
            Notification::VersionMismatch,
            Notification::FailedToMount,
            Notification::Mounted,
        ] {
            assert!(event.name().starts_with(BUNDLE_IDENTIFIER), "{event:?}");
        }
        assert!(NOTIFICATION_OBJECT.starts_with(BUNDLE_IDENTIFIER));
    }

    #[test]
    fn test_announce_with_mountpoint() {
        let notifier = RecordingNotifier::new();
        announce(
            &notifier,
            Notification::FailedToMount,
            Some(Path::new("/Volumes/x")),
            false,
        );
        assert_eq!(notifier.alerts().len(), 1);
        assert_eq!(
            notifier.posted(),
            vec![Posted {
                name: Notification::FailedToMount.name().to_string(),
                object: NOTIFICATION_OBJECT.to_string(),
                user_info: vec![(MOUNT_PATH_KEY.to_string(), "/Volumes/x".to_string())],
            }]
        );
    }

    #[test]
    fn test_quiet_suppresses_alert_only() {
        let notifier = RecordingNotifier::new();
        announce(&notifier, Notification::VersionMismatch, None, true);
        assert!(notifier.alerts().is_empty());
        assert_eq!(notifier.posted().len(), 1);
        assert!(notifier.posted()[0].user_info.is_empty());
    }

    #[test]
    fn test_mounted_has_no_alert() {
        let notifier = RecordingNotifier::new();
        announce(&notifier, Notification::Mounted, Some(Path::new("/mnt")), false);
        assert!(notifier.alerts().is_empty());
    }
}
