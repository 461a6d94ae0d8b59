//! Test doubles for the host seam.
//!
//! [`FakePlatform`] scripts every system call the mount sequence makes and
//! records what was asked of it; [`RecordingNotifier`] captures
//! notifications and alerts. Together they let the whole sequence run
//! without the kernel extension.
//!
//! # Usage
//!
//! ```
//! use fuse4x_mount::testing::{FakePlatform, RecordingNotifier};
//! use fuse4x_mount::Mounter;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let platform = FakePlatform::new().busy_devices(0..2);
//! let notifier = RecordingNotifier::new();
//! let mounter = Mounter::new(&platform, &notifier).settings(platform.settings());
//!
//! let volume = mounter.mount(dir.path(), ["ro"]).unwrap();
//! assert_eq!(volume.device.index(), 2);
//! assert_eq!(platform.mounts().len(), 1);
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use parking_lot::Mutex;

use crate::args::MountArgs;
use crate::device::makedev;
use crate::flags::StdMountFlags;
use crate::notify::Notifier;
use crate::platform::Platform;
use crate::settings::HostSettings;

/// Major number of the fake device nodes.
pub const FAKE_DEVICE_MAJOR: u32 = 0x23;

/// One recorded `mount(2)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCall {
    pub fs_type: String,
    pub target: PathBuf,
    pub flags: StdMountFlags,
    pub args: MountArgs,
}

#[derive(Debug)]
struct FakeState {
    os_release: String,
    kext_version: Option<Vec<u8>>,
    loader_loads_kext: bool,
    fstype: String,
    busy: BTreeSet<u32>,
    fail_rdev: bool,
    mount_errno: Option<i32>,
    unmount_errno: Option<i32>,
    sysctl_queries: usize,
    loader_runs: usize,
    device_opens: usize,
    mounts: Vec<MountCall>,
    unmounts: Vec<(PathBuf, bool)>,
}

/// A scriptable [`Platform`].
///
/// By default the OS is supported, the kernel extension is loaded with the
/// expected version, every device is free, the mount point lives on `apfs`
/// and every call succeeds. Device nodes are backed by `/dev/null`.
#[derive(Debug)]
pub struct FakePlatform {
    settings: HostSettings,
    state: Mutex<FakeState>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    /// A host on which mounting succeeds.
    pub fn new() -> Self {
        let settings = HostSettings::default();
        let mut version = settings.expected_version.clone().into_bytes();
        version.push(0);
        Self {
            settings,
            state: Mutex::new(FakeState {
                os_release: "11.4.2".to_string(),
                kext_version: Some(version),
                loader_loads_kext: true,
                fstype: "apfs".to_string(),
                busy: BTreeSet::new(),
                fail_rdev: false,
                mount_errno: None,
                unmount_errno: None,
                sysctl_queries: 0,
                loader_runs: 0,
                device_opens: 0,
                mounts: Vec::new(),
                unmounts: Vec::new(),
            }),
        }
    }

    /// Device number reported for device `index`.
    pub fn rdev_for(index: u32) -> u32 {
        makedev(FAKE_DEVICE_MAJOR, index)
    }

    /// Settings matching this host; pass them to the code under test.
    pub fn settings(&self) -> HostSettings {
        self.settings.clone()
    }

    /// Sets the kernel release string.
    #[must_use]
    pub fn os_release(mut self, release: &str) -> Self {
        self.state.get_mut().os_release = release.to_string();
        self
    }

    /// Sets the raw sysctl value reported by the kernel extension.
    #[must_use]
    pub fn kext_version(mut self, raw: &[u8]) -> Self {
        self.state.get_mut().kext_version = Some(raw.to_vec());
        self
    }

    /// Makes the version query fail until the loader succeeds.
    #[must_use]
    pub fn kext_unloaded(mut self) -> Self {
        self.state.get_mut().kext_version = None;
        self
    }

    /// Whether running the loader loads the expected version.
    #[must_use]
    pub fn loader_loads_kext(mut self, loads: bool) -> Self {
        self.state.get_mut().loader_loads_kext = loads;
        self
    }

    /// Type of the filesystem containing every path.
    #[must_use]
    pub fn fstype(mut self, fstype: &str) -> Self {
        self.state.get_mut().fstype = fstype.to_string();
        self
    }

    /// Marks devices as held by another process.
    #[must_use]
    pub fn busy_devices(mut self, indices: impl IntoIterator<Item = u32>) -> Self {
        self.state.get_mut().busy.extend(indices);
        self
    }

    /// Sets the size of the device pool.
    #[must_use]
    pub fn device_count(mut self, count: u32) -> Self {
        self.settings.device_count = count;
        self
    }

    /// Makes reading a device number fail.
    #[must_use]
    pub fn fail_rdev(mut self) -> Self {
        self.state.get_mut().fail_rdev = true;
        self
    }

    /// Makes `mount(2)` fail with `errno`.
    #[must_use]
    pub fn fail_mount(mut self, errno: i32) -> Self {
        self.state.get_mut().mount_errno = Some(errno);
        self
    }

    /// Makes `unmount(2)` fail with `errno`.
    #[must_use]
    pub fn fail_unmount(mut self, errno: i32) -> Self {
        self.state.get_mut().unmount_errno = Some(errno);
        self
    }

    /// Number of version queries made.
    pub fn sysctl_queries(&self) -> usize {
        self.state.lock().sysctl_queries
    }

    /// Number of times the loader helper ran.
    pub fn loader_runs(&self) -> usize {
        self.state.lock().loader_runs
    }

    /// Number of device open attempts.
    pub fn device_opens(&self) -> usize {
        self.state.lock().device_opens
    }

    /// Recorded `mount(2)` calls.
    pub fn mounts(&self) -> Vec<MountCall> {
        self.state.lock().mounts.clone()
    }

    /// Recorded `unmount(2)` calls.
    pub fn unmounts(&self) -> Vec<(PathBuf, bool)> {
        self.state.lock().unmounts.clone()
    }

    fn device_index(&self, path: &Path) -> Option<u32> {
        (0..self.settings.device_count).find(|&i| self.settings.device_path(i) == path)
    }
}

impl Platform for FakePlatform {
    fn os_release(&self) -> io::Result<String> {
        Ok(self.state.lock().os_release.clone())
    }

    fn sysctl_string(&self, name: &str) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.sysctl_queries += 1;
        if name != self.settings.version_sysctl {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        state
            .kext_version
            .clone()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }

    fn run_program(&self, _program: &Path) -> io::Result<ExitStatus> {
        let mut state = self.state.lock();
        state.loader_runs += 1;
        if state.loader_loads_kext {
            let mut version = self.settings.expected_version.clone().into_bytes();
            version.push(0);
            state.kext_version = Some(version);
            Ok(ExitStatus::from_raw(0))
        } else {
            // Wait status for exit code 1.
            Ok(ExitStatus::from_raw(1 << 8))
        }
    }

    fn open_device(&self, path: &Path) -> io::Result<File> {
        let mut state = self.state.lock();
        state.device_opens += 1;
        let index = self
            .device_index(path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        if !state.busy.insert(index) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        File::options().read(true).write(true).open("/dev/null")
    }

    fn device_rdev(&self, path: &Path, _file: &File) -> io::Result<u64> {
        if self.state.lock().fail_rdev {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        let index = self
            .device_index(path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        Ok(u64::from(Self::rdev_for(index)))
    }

    fn fstype_name(&self, _path: &Path) -> io::Result<String> {
        Ok(self.state.lock().fstype.clone())
    }

    fn mount(
        &self,
        fs_type: &str,
        target: &Path,
        flags: StdMountFlags,
        args: &MountArgs,
    ) -> io::Result<()> {
        let mut state = self.state.lock();
        state.mounts.push(MountCall {
            fs_type: fs_type.to_string(),
            target: target.to_path_buf(),
            flags,
            args: args.clone(),
        });
        match state.mount_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }

    fn unmount(&self, target: &Path, force: bool) -> io::Result<()> {
        let mut state = self.state.lock();
        state.unmounts.push((target.to_path_buf(), force));
        match state.unmount_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}

/// A posted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted {
    pub name: String,
    pub object: String,
    pub user_info: Vec<(String, String)>,
}

/// A [`Notifier`] that records everything.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Posted>>,
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications in posting order.
    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().clone()
    }

    /// Alerts as `(title, message)` pairs.
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, name: &str, object: &str, user_info: &[(&str, &str)]) {
        self.posted.lock().push(Posted {
            name: name.to_string(),
            object: object.to_string(),
            user_info: user_info
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
    }

    fn display_notice(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .push((title.to_string(), message.to_string()));
    }
}
