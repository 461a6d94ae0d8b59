//! The mount sequence.
//!
//! [`Mounter::mount`] runs the stages in order (parse, validate the mount
//! point, check the kernel extension, acquire a device, call `mount(2)`).
//! Each stage must succeed before the next starts, and the first failure
//! ends the sequence. Nothing outside the process is modified before the
//! final `mount(2)` call, so there is nothing to roll back.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::args::{MOUNT_ARGS_VERSION, MountArgs};
use crate::config::MountConfig;
use crate::device::{self, Device};
use crate::error::{MountError, MountResult};
use crate::kext;
use crate::mountpoint;
use crate::notify::{self, Notification, Notifier};
use crate::parser;
use crate::platform::Platform;
use crate::settings::HostSettings;

/// Name used in default volume names when the program name is unknown.
const FALLBACK_PROGRAM_NAME: &str = "fuse4x";

/// Default `fsname` for a volume on device `index`.
pub fn default_fsname(program: &str, index: u32) -> String {
    format!("{program}@fuse{index}")
}

/// Default `volname` for a volume on device `index`.
pub fn default_volname(program: &str, index: u32) -> String {
    format!("fuse4x volume {index} ({program})")
}

/// File name of the running executable.
pub fn program_name() -> String {
    env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map_or_else(
            || FALLBACK_PROGRAM_NAME.to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

/// A successfully mounted volume.
#[derive(Debug)]
pub struct MountedVolume {
    /// Canonical mount point.
    pub mountpoint: PathBuf,
    /// Device the volume is attached to. Requests from the kernel arrive on
    /// its descriptor.
    pub device: Device,
    /// Configuration the volume was mounted with.
    pub config: MountConfig,
    /// Arguments for helper modules of the high-level library.
    pub passthrough: Vec<String>,
    /// Version reported by the kernel extension.
    pub kernel_version: String,
}

/// Runs mount and unmount requests against a host.
pub struct Mounter<'a> {
    platform: &'a dyn Platform,
    notifier: &'a dyn Notifier,
    settings: HostSettings,
    program: String,
}

impl<'a> Mounter<'a> {
    /// Creates a mounter with production settings and the running program's
    /// name.
    pub fn new(platform: &'a dyn Platform, notifier: &'a dyn Notifier) -> Self {
        Self {
            platform,
            notifier,
            settings: HostSettings::default(),
            program: program_name(),
        }
    }

    /// Replaces the host settings.
    #[must_use]
    pub fn settings(mut self, settings: HostSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the program name used in default volume names.
    #[must_use]
    pub fn program(mut self, name: impl Into<String>) -> Self {
        self.program = name.into();
        self
    }

    /// Host settings in use.
    pub fn host_settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Runs the full mount sequence for `mountpoint` with individual option
    /// tokens.
    #[instrument(level = "debug", skip_all, fields(mountpoint = %mountpoint.display()))]
    pub fn mount<I, S>(&self, mountpoint: &Path, options: I) -> MountResult<MountedVolume>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parser::parse_options(options)
            .inspect_err(|e| debug!(error = %e, "option parsing failed"))?;
        let config = parsed.config;
        debug!(?config, "parsed mount options");

        let mountpoint = mountpoint::validate_mountpoint(
            mountpoint,
            config.allow_recursion,
            &self.settings.fs_type,
            self.platform,
        )
        .inspect_err(|e| debug!(error = %e, "mount point rejected"))?;

        let kernel_version =
            kext::check_kernel(self.platform, self.notifier, &self.settings, config.quiet)?;

        let device = device::acquire_device(self.platform, &self.settings)
            .inspect_err(|e| debug!(error = %e, "no device acquired"))?;

        self.invoke(&config, &mountpoint, &device)?;

        Ok(MountedVolume {
            mountpoint,
            device,
            config,
            passthrough: parsed.passthrough,
            kernel_version,
        })
    }

    /// Builds the argument block and issues `mount(2)`, announcing the
    /// outcome.
    pub fn invoke(
        &self,
        config: &MountConfig,
        mountpoint: &Path,
        device: &Device,
    ) -> MountResult<()> {
        // An empty name counts as not given.
        let fsname = non_empty(config.fsname.as_deref()).map_or_else(
            || default_fsname(&self.program, device.index()),
            str::to_string,
        );
        let volname = non_empty(config.volname.as_deref()).map_or_else(
            || default_volname(&self.program, device.index()),
            str::to_string,
        );
        let args = MountArgs::new(
            config,
            mountpoint.to_string_lossy().into_owned(),
            fsname,
            volname,
            device.rdev(),
        );
        debug!(layout = MOUNT_ARGS_VERSION, ?args, "issuing mount");

        match self
            .platform
            .mount(&self.settings.fs_type, mountpoint, config.std_flags, &args)
        {
            Ok(()) => {
                info!(
                    mountpoint = %mountpoint.display(),
                    device = device.index(),
                    "mounted"
                );
                notify::announce(
                    self.notifier,
                    Notification::Mounted,
                    Some(mountpoint),
                    config.quiet,
                );
                Ok(())
            }
            Err(source) => {
                let err = MountError::MountSyscall {
                    device: device.path().to_path_buf(),
                    mountpoint: mountpoint.to_path_buf(),
                    source,
                };
                debug!(error = %err, "mount(2) failed");
                notify::announce(
                    self.notifier,
                    Notification::FailedToMount,
                    Some(mountpoint),
                    config.quiet,
                );
                Err(err)
            }
        }
    }

    /// Closes `device`, if still held, and unmounts `mountpoint`.
    #[instrument(
        level = "debug",
        skip_all,
        fields(mountpoint = %mountpoint.display(), force = force)
    )]
    pub fn unmount(
        &self,
        mountpoint: &Path,
        device: Option<Device>,
        force: bool,
    ) -> MountResult<()> {
        drop(device);
        self.platform
            .unmount(mountpoint, force)
            .map_err(|source| MountError::Unmount {
                mountpoint: mountpoint.to_path_buf(),
                source,
            })?;
        info!(mountpoint = %mountpoint.display(), force, "unmounted");
        Ok(())
    }

    /// Unmounts a volume mounted by this process.
    pub fn unmount_volume(&self, volume: MountedVolume, force: bool) -> MountResult<()> {
        self.unmount(&volume.mountpoint, Some(volume.device), force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{AltFlags, StdMountFlags};
    use crate::testing::{FakePlatform, RecordingNotifier};
    use tempfile::TempDir;

    #[test]
    fn test_default_names() {
        assert_eq!(default_fsname("sshfs", 2), "sshfs@fuse2");
        assert_eq!(default_volname("sshfs", 2), "fuse4x volume 2 (sshfs)");
    }

    #[test]
    fn test_program_name_not_empty() {
        assert!(!program_name().is_empty());
    }

    #[test]
    fn test_mount_uses_defaults_and_explicit_names() {
        let temp = TempDir::new().unwrap();
        let platform = FakePlatform::new().busy_devices(0..1);
        let notifier = RecordingNotifier::new();
        let mounter = Mounter::new(&platform, &notifier)
            .settings(platform.settings())
            .program("demo");

        let volume = mounter.mount(temp.path(), ["volname=Data", "local"]).unwrap();
        assert_eq!(volume.device.index(), 1);

        let calls = platform.mounts();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.fs_type, "fuse4x");
        assert!(call.flags.contains(StdMountFlags::LOCAL));
        assert!(call.args.altflags.contains(AltFlags::LOCALVOL));
        assert_eq!(call.args.fsname, "demo@fuse1");
        assert_eq!(call.args.volname, "Data");
        assert_eq!(call.args.rdev, FakePlatform::rdev_for(1));
        assert_eq!(call.args.mntpath, volume.mountpoint.to_string_lossy());

        assert_eq!(notifier.posted().len(), 1);
        assert_eq!(notifier.posted()[0].name, Notification::Mounted.name());
    }

    #[test]
    fn test_empty_names_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let platform = FakePlatform::new();
        let notifier = RecordingNotifier::new();
        let mounter = Mounter::new(&platform, &notifier)
            .settings(platform.settings())
            .program("demo");

        mounter.mount(temp.path(), ["fsname=", "volname="]).unwrap();

        let calls = platform.mounts();
        assert_eq!(calls[0].args.fsname, "demo@fuse0");
        assert_eq!(calls[0].args.volname, "fuse4x volume 0 (demo)");
    }

    #[test]
    fn test_mount_syscall_failure_notifies() {
        let temp = TempDir::new().unwrap();
        let platform = FakePlatform::new().fail_mount(libc::EPERM);
        let notifier = RecordingNotifier::new();
        let mounter = Mounter::new(&platform, &notifier).settings(platform.settings());

        let err = mounter.mount(temp.path(), ["quiet"]).unwrap_err();
        assert!(matches!(err, MountError::MountSyscall { .. }));
        assert_eq!(notifier.posted()[0].name, Notification::FailedToMount.name());
        assert!(notifier.alerts().is_empty());
    }

    #[test]
    fn test_unmount_closes_and_forces() {
        let temp = TempDir::new().unwrap();
        let platform = FakePlatform::new();
        let notifier = RecordingNotifier::new();
        let mounter = Mounter::new(&platform, &notifier).settings(platform.settings());

        let volume = mounter.mount(temp.path(), Vec::<String>::new()).unwrap();
        let mountpoint = volume.mountpoint.clone();
        mounter.unmount_volume(volume, true).unwrap();
        assert_eq!(platform.unmounts(), vec![(mountpoint, true)]);
    }

    #[test]
    fn test_unmount_failure() {
        let platform = FakePlatform::new().fail_unmount(libc::EBUSY);
        let notifier = RecordingNotifier::new();
        let mounter = Mounter::new(&platform, &notifier);
        let err = mounter
            .unmount(Path::new("/Volumes/busy"), None, false)
            .unwrap_err();
        assert!(matches!(err, MountError::Unmount { .. }));
    }
}
