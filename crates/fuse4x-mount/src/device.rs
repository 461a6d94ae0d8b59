//! Device arbitration.
//!
//! The kernel extension exposes a fixed pool of `/dev/fuse4x<n>` nodes, each
//! of which can be opened by one process at a time. Opening a node is the
//! whole arbitration protocol: the first node that opens is ours.

use std::fs::File;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::MountError;
use crate::params::{CUSTOM_FSID_DEVICE_MAJOR, MINOR_MASK};
use crate::platform::Platform;
use crate::settings::HostSettings;

/// Major number of a Darwin `dev_t`.
pub fn major(rdev: u32) -> u32 {
    (rdev >> 24) & 0xff
}

/// Minor number of a Darwin `dev_t`.
pub fn minor(rdev: u32) -> u32 {
    rdev & MINOR_MASK
}

/// Builds a Darwin `dev_t`.
pub fn makedev(major: u32, minor: u32) -> u32 {
    ((major & 0xff) << 24) | (minor & MINOR_MASK)
}

/// Device number the kernel reports for a volume mounted with `fsid=`.
pub fn custom_fsid_device(fsid: u32) -> u32 {
    makedev(CUSTOM_FSID_DEVICE_MAJOR, fsid)
}

/// An opened device node, exclusively owned until mounted.
#[derive(Debug)]
pub struct Device {
    index: u32,
    path: PathBuf,
    rdev: u32,
    file: File,
}

impl Device {
    /// Position in the device pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Path of the node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device number, as stored in the kernel argument block.
    pub fn rdev(&self) -> u32 {
        self.rdev
    }

    /// Device major number.
    pub fn major(&self) -> u32 {
        major(self.rdev)
    }

    /// Device minor number.
    pub fn minor(&self) -> u32 {
        minor(self.rdev)
    }

    /// Releases the descriptor to the caller.
    pub fn into_fd(self) -> OwnedFd {
        self.file.into()
    }
}

impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Device {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Opens the first available device node, trying indices in ascending order.
pub fn acquire_device(
    platform: &dyn Platform,
    settings: &HostSettings,
) -> Result<Device, MountError> {
    for index in 0..settings.device_count {
        let path = settings.device_path(index);
        match platform.open_device(&path) {
            Ok(file) => {
                let rdev = platform
                    .device_rdev(&path, &file)
                    .map_err(|source| MountError::DeviceStat {
                        path: path.clone(),
                        source,
                    })? as u32;
                debug!(device = index, path = %path.display(), rdev, "opened device");
                return Ok(Device {
                    index,
                    path,
                    rdev,
                    file,
                });
            }
            Err(e) => trace!(device = index, error = %e, "device unavailable"),
        }
    }
    Err(MountError::DeviceExhausted {
        count: settings.device_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;

    #[test]
    fn test_dev_t_encoding() {
        let dev = makedev(0x23, 5);
        assert_eq!(dev, 0x2300_0005);
        assert_eq!(major(dev), 0x23);
        assert_eq!(minor(dev), 5);
        assert_eq!(major(custom_fsid_device(0x12_3456)), 255);
        assert_eq!(minor(custom_fsid_device(0x12_3456)), 0x12_3456);
    }

    #[test]
    fn test_first_free_device_wins() {
        let platform = FakePlatform::new().busy_devices(0..3);
        let settings = platform.settings();
        let device = acquire_device(&platform, &settings).unwrap();
        assert_eq!(device.index(), 3);
        assert_eq!(device.path(), settings.device_path(3));
        assert_eq!(platform.device_opens(), 4);
    }

    #[test]
    fn test_exhausted_pool_reports_count() {
        let platform = FakePlatform::new().busy_devices(0..24);
        let settings = platform.settings();
        let err = acquire_device(&platform, &settings).unwrap_err();
        assert!(matches!(err, MountError::DeviceExhausted { count: 24 }));
    }

    #[test]
    fn test_device_carries_rdev() {
        let platform = FakePlatform::new();
        let settings = platform.settings();
        let device = acquire_device(&platform, &settings).unwrap();
        assert_eq!(device.index(), 0);
        assert_eq!(device.rdev(), FakePlatform::rdev_for(0));
        assert_eq!(device.minor(), 0);
    }

    #[test]
    fn test_fstat_failure_aborts() {
        let platform = FakePlatform::new().fail_rdev();
        let settings = platform.settings();
        let err = acquire_device(&platform, &settings).unwrap_err();
        assert!(matches!(err, MountError::DeviceStat { .. }));
        assert_eq!(platform.device_opens(), 1);
    }
}
