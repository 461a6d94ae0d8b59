//! Mount negotiation for fuse4x volumes.
//!
//! A user-space filesystem daemon calls [`Mounter::mount`] once at startup.
//! The sequence turns textual mount options into a validated
//! [`MountConfig`], checks the mount point, verifies that the fuse4x kernel
//! extension is loaded at a compatible version, claims one of the
//! `/dev/fuse4x<n>` device nodes, and finally calls `mount(2)` with the
//! binary argument block the kernel expects ([`MountArgs`]). The returned
//! [`MountedVolume`] owns the device descriptor the daemon reads requests
//! from.
//!
//! # Components
//!
//! - [`options`] and [`parser`] - The option vocabulary and the dispatcher
//!   over it
//! - [`MountConfig`] - Defaults, conflict rules and numeric range checks
//! - [`kext`] - Kernel extension version gate and loader fallback
//! - [`device`] - Device pool arbitration
//! - [`MountArgs`] - The fixed-layout kernel argument block
//! - [`notify`] - Outcome notifications and alerts
//! - [`Platform`] - The host system call seam
//!
//! # Example
//!
//! ```no_run
//! use fuse4x_mount::{Mounter, SystemNotifier, SystemPlatform};
//! use std::path::Path;
//!
//! let mounter = Mounter::new(&SystemPlatform, &SystemNotifier);
//! let volume = mounter.mount(Path::new("/Volumes/demo"), ["volname=Demo", "local"])?;
//! println!("mounted on device {}", volume.device.index());
//! mounter.unmount_volume(volume, false)?;
//! # Ok::<(), fuse4x_mount::MountError>(())
//! ```

#![warn(clippy::all)]

mod args;
mod config;
pub mod device;
mod error;
mod flags;
pub mod kext;
mod mount;
mod mountpoint;
pub mod notify;
pub mod options;
pub mod params;
pub mod parser;
mod platform;
mod settings;
pub mod signal;
mod sys;

pub use args::{MOUNT_ARGS_SIZE, MOUNT_ARGS_VERSION, MountArgs, offsets};
pub use config::{MountConfig, clamp_daemon_timeout, clamp_init_timeout};
pub use device::{Device, acquire_device};
pub use error::{
    ErrorCategory, KernelError, MountError, MountResult, MountpointError, OptionConflict,
    OptionError,
};
pub use flags::{AltFlags, StdMountFlags};
pub use kext::{KextStatus, check_kernel};
pub use mount::{MountedVolume, Mounter, default_fsname, default_volname, program_name};
pub use mountpoint::{is_own_fstype, validate_mountpoint};
pub use notify::{LogNotifier, NoopNotifier, Notification, Notifier, SystemNotifier};
pub use parser::{ParsedOptions, parse_options, split_options};
pub use platform::{Platform, SystemPlatform};
pub use settings::{ENV_DEVICE_COUNT, ENV_DEVICE_DIR, ENV_LOADER, HostSettings};
pub use signal::ShutdownSignals;

/// Scriptable host and notifier doubles.
///
/// Used by this crate's tests, by the command-line tool's tests and by
/// daemons that want to exercise their startup path without the kernel
/// extension.
pub mod testing;
