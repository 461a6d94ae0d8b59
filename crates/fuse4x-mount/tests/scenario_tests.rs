//! End-to-end mount sequences against a scripted host.

use fuse4x_mount::testing::{FakePlatform, RecordingNotifier};
use fuse4x_mount::{
    AltFlags, ErrorCategory, MountError, Mounter, MountpointError, Notification, OptionConflict,
    StdMountFlags, offsets,
};
use tempfile::TempDir;

fn mounter<'a>(platform: &'a FakePlatform, notifier: &'a RecordingNotifier) -> Mounter<'a> {
    Mounter::new(platform, notifier)
        .settings(platform.settings())
        .program("scenario")
}

#[test]
fn test_readonly_allow_other_mount() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new();
    let notifier = RecordingNotifier::new();

    let volume = mounter(&platform, &notifier)
        .mount(temp.path(), ["ro", "allow_other", "blocksize=4096"])
        .unwrap();

    assert!(volume.config.std_flags.contains(StdMountFlags::RDONLY));
    assert!(volume.config.alt_flags.contains(AltFlags::ALLOW_OTHER));
    assert!(volume.config.alt_flags.contains(AltFlags::BLOCKSIZE));
    assert_eq!(volume.config.blocksize, 4096);
    assert_eq!(volume.device.index(), 0);

    let calls = platform.mounts();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, volume.mountpoint);
    assert_eq!(calls[0].args.rdev, FakePlatform::rdev_for(0));
    assert_eq!(calls[0].args.fsname, "scenario@fuse0");

    let block = calls[0].args.encode();
    let blocksize = u32::from_ne_bytes(
        block[offsets::BLOCKSIZE..offsets::BLOCKSIZE + 4]
            .try_into()
            .unwrap(),
    );
    assert_eq!(blocksize, 4096);

    let posted = notifier.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].name, Notification::Mounted.name());
    assert_eq!(
        posted[0].user_info,
        vec![(
            "kFUSEMountPathKey".to_string(),
            volume.mountpoint.to_string_lossy().into_owned()
        )]
    );
}

#[test]
fn test_conflicting_options_touch_nothing() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new();
    let notifier = RecordingNotifier::new();

    let err = mounter(&platform, &notifier)
        .mount(temp.path(), ["allow_other", "allow_root"])
        .unwrap_err();

    assert!(matches!(
        err,
        MountError::OptionConflict(OptionConflict::AllowOtherAllowRoot)
    ));
    assert_eq!(err.category(), ErrorCategory::OptionConflict);
    assert_eq!(platform.device_opens(), 0);
    assert!(platform.mounts().is_empty());
    assert!(notifier.posted().is_empty());
}

#[test]
fn test_missing_mountpoint_skips_kernel_query() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new();
    let notifier = RecordingNotifier::new();

    let err = mounter(&platform, &notifier)
        .mount(&temp.path().join("absent"), ["ro"])
        .unwrap_err();

    assert!(matches!(
        err,
        MountError::Mountpoint(MountpointError::Missing { .. })
    ));
    assert_eq!(platform.sysctl_queries(), 0);
    assert_eq!(platform.loader_runs(), 0);
    assert_eq!(platform.device_opens(), 0);
}

#[test]
fn test_exhausted_devices_after_gates_pass() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new().busy_devices(0..24);
    let notifier = RecordingNotifier::new();

    let err = mounter(&platform, &notifier)
        .mount(temp.path(), Vec::<&str>::new())
        .unwrap_err();

    assert!(matches!(err, MountError::DeviceExhausted { count: 24 }));
    assert_eq!(err.category(), ErrorCategory::Device);
    assert_eq!(platform.sysctl_queries(), 1);
    assert_eq!(platform.device_opens(), 24);
    assert!(platform.mounts().is_empty());
}

#[test]
fn test_recursive_mount_refused_unless_allowed() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new().fstype("fuse4x");
    let notifier = RecordingNotifier::new();

    let err = mounter(&platform, &notifier)
        .mount(temp.path(), ["ro"])
        .unwrap_err();
    assert!(matches!(
        err,
        MountError::Mountpoint(MountpointError::Recursive(_))
    ));

    mounter(&platform, &notifier)
        .mount(temp.path(), ["ro", "allow_recursion"])
        .unwrap();
    assert_eq!(platform.mounts().len(), 1);
}

#[test]
fn test_kernel_loaded_on_demand() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new().kext_unloaded().loader_loads_kext(true);
    let notifier = RecordingNotifier::new();

    let volume = mounter(&platform, &notifier)
        .mount(temp.path(), ["nolocalcaches"])
        .unwrap();

    assert_eq!(volume.kernel_version, "0.9.2");
    assert_eq!(platform.loader_runs(), 1);
    assert!(volume.config.alt_flags.contains(AltFlags::NO_LOCALCACHES));
}

#[test]
fn test_kernel_mismatch_stops_before_devices() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new().kext_version(b"0.9.1\0");
    let notifier = RecordingNotifier::new();

    let err = mounter(&platform, &notifier)
        .mount(temp.path(), ["ro"])
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::KernelIncompatible);
    assert_eq!(platform.device_opens(), 0);
    assert_eq!(notifier.posted()[0].name, Notification::VersionMismatch.name());
    assert_eq!(notifier.alerts().len(), 1);
}

#[test]
fn test_volicon_passed_through() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new();
    let notifier = RecordingNotifier::new();

    let volume = mounter(&platform, &notifier)
        .mount(temp.path(), ["volicon=/tmp/icon.icns", "subtype=demo"])
        .unwrap();

    assert_eq!(
        volume.passthrough,
        vec!["-omodules=volicon,iconpath=/tmp/icon.icns".to_string()]
    );
}
