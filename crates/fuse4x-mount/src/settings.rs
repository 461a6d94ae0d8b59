//! Host resource locations.
//!
//! Everything the negotiation sequence touches outside the process (device
//! nodes, the loader helper, the version sysctl) is named here so tests and
//! packagers can relocate it.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::params::{
    DEVICE_BASENAME, DEVICE_DIR, FS_TYPE, KEXT_VERSION, LOAD_PROGRAM, NDEVICES,
    SYSCTL_VERSION_NUMBER,
};

/// Environment variable overriding [`HostSettings::device_dir`].
pub const ENV_DEVICE_DIR: &str = "FUSE4X_DEVICE_DIR";
/// Environment variable overriding [`HostSettings::loader`].
pub const ENV_LOADER: &str = "FUSE4X_LOADER";
/// Environment variable overriding [`HostSettings::device_count`].
pub const ENV_DEVICE_COUNT: &str = "FUSE4X_DEVICE_COUNT";

/// Host locations and identifiers used during mounting.
///
/// `Default` yields the production values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Directory holding the device nodes.
    pub device_dir: PathBuf,
    /// Device node file name prefix.
    pub device_basename: String,
    /// Size of the device pool.
    pub device_count: u32,
    /// Kernel extension loader helper.
    pub loader: PathBuf,
    /// sysctl reporting the kernel extension version.
    pub version_sysctl: String,
    /// Filesystem type tag passed to `mount(2)`.
    pub fs_type: String,
    /// Kernel extension version this library requires.
    pub expected_version: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEVICE_DIR),
            device_basename: DEVICE_BASENAME.to_string(),
            device_count: NDEVICES,
            loader: PathBuf::from(LOAD_PROGRAM),
            version_sysctl: SYSCTL_VERSION_NUMBER.to_string(),
            fs_type: FS_TYPE.to_string(),
            expected_version: KEXT_VERSION.to_string(),
        }
    }
}

impl HostSettings {
    /// Production values overlaid with `FUSE4X_*` environment overrides.
    ///
    /// An unparsable `FUSE4X_DEVICE_COUNT` is logged and ignored.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(dir) = env::var_os(ENV_DEVICE_DIR) {
            settings.device_dir = PathBuf::from(dir);
        }
        if let Some(loader) = env::var_os(ENV_LOADER) {
            settings.loader = PathBuf::from(loader);
        }
        if let Ok(count) = env::var(ENV_DEVICE_COUNT) {
            match count.parse() {
                Ok(n) => settings.device_count = n,
                Err(e) => warn!(value = %count, error = %e, "ignoring {ENV_DEVICE_COUNT}"),
            }
        }
        settings
    }

    /// Sets the device directory.
    #[must_use]
    pub fn device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    /// Sets the device pool size.
    #[must_use]
    pub fn device_count(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    /// Sets the loader helper path.
    #[must_use]
    pub fn loader(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader = path.into();
        self
    }

    /// Sets the expected kernel extension version.
    #[must_use]
    pub fn expected_version(mut self, version: impl Into<String>) -> Self {
        self.expected_version = version.into();
        self
    }

    /// Path of device node `index`, e.g. `/dev/fuse4x3`.
    pub fn device_path(&self, index: u32) -> PathBuf {
        self.device_dir
            .join(format!("{}{index}", self.device_basename))
    }
}
