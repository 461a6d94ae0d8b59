//! Host operating system seam.
//!
//! Every system call the negotiation sequence makes goes through
//! [`Platform`], so the sequence itself is plain logic that runs against
//! [`SystemPlatform`] in production and against
//! [`FakePlatform`](crate::testing::FakePlatform) in tests.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::args::MountArgs;
use crate::flags::StdMountFlags;

/// System calls used by the mount sequence.
pub trait Platform: Send + Sync {
    /// Kernel release string, e.g. `"11.4.2"` (`uname -r`).
    fn os_release(&self) -> io::Result<String>;

    /// Raw value of the named sysctl.
    ///
    /// Fails with `NotFound` when the kernel extension is not loaded.
    fn sysctl_string(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Runs `program` with no arguments and waits for it to exit.
    fn run_program(&self, program: &Path) -> io::Result<ExitStatus>;

    /// Opens a device node read/write.
    fn open_device(&self, path: &Path) -> io::Result<File>;

    /// `st_rdev` of an opened device node.
    fn device_rdev(&self, path: &Path, file: &File) -> io::Result<u64>;

    /// Type name of the filesystem containing `path`.
    fn fstype_name(&self, path: &Path) -> io::Result<String>;

    /// Issues `mount(2)`.
    fn mount(
        &self,
        fs_type: &str,
        target: &Path,
        flags: StdMountFlags,
        args: &MountArgs,
    ) -> io::Result<()>;

    /// Issues `unmount(2)`, with `MNT_FORCE` when `force` is set.
    fn unmount(&self, target: &Path, force: bool) -> io::Result<()>;
}

/// The real host.
///
/// Mounting is only possible on macOS; elsewhere the calls that need the
/// kernel extension fail with [`io::ErrorKind::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

impl Platform for SystemPlatform {
    fn os_release(&self) -> io::Result<String> {
        let uts = nix::sys::utsname::uname()?;
        Ok(uts.release().to_string_lossy().into_owned())
    }

    #[cfg(target_os = "macos")]
    fn sysctl_string(&self, name: &str) -> io::Result<Vec<u8>> {
        crate::sys::darwin::sysctl_string(name)
    }

    #[cfg(not(target_os = "macos"))]
    fn sysctl_string(&self, name: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("sysctl {name} is only available on macOS"),
        ))
    }

    fn run_program(&self, program: &Path) -> io::Result<ExitStatus> {
        debug!(program = %program.display(), "running helper");
        Command::new(program).status()
    }

    fn open_device(&self, path: &Path) -> io::Result<File> {
        File::options().read(true).write(true).open(path)
    }

    fn device_rdev(&self, _path: &Path, file: &File) -> io::Result<u64> {
        use std::os::unix::fs::MetadataExt;

        Ok(file.metadata()?.rdev())
    }

    #[cfg(target_os = "macos")]
    fn fstype_name(&self, path: &Path) -> io::Result<String> {
        let stat = nix::sys::statfs::statfs(path)?;
        Ok(stat.filesystem_type_name().to_string())
    }

    #[cfg(target_os = "linux")]
    fn fstype_name(&self, path: &Path) -> io::Result<String> {
        let mounts = std::fs::read_to_string("/proc/mounts")?;
        containing_fstype(&mounts, path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mount entry covers {}", path.display()),
            )
        })
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn fstype_name(&self, path: &Path) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot determine filesystem type of {}", path.display()),
        ))
    }

    #[cfg(target_os = "macos")]
    fn mount(
        &self,
        fs_type: &str,
        target: &Path,
        flags: StdMountFlags,
        args: &MountArgs,
    ) -> io::Result<()> {
        crate::sys::darwin::mount(fs_type, target, flags, &args.encode())
    }

    #[cfg(not(target_os = "macos"))]
    fn mount(
        &self,
        fs_type: &str,
        target: &Path,
        _flags: StdMountFlags,
        _args: &MountArgs,
    ) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!(
                "{fs_type} volumes can only be mounted on macOS (target {})",
                target.display()
            ),
        ))
    }

    #[cfg(target_os = "macos")]
    fn unmount(&self, target: &Path, force: bool) -> io::Result<()> {
        crate::sys::darwin::unmount(target, force)
    }

    #[cfg(not(target_os = "macos"))]
    fn unmount(&self, target: &Path, force: bool) -> io::Result<()> {
        let mut cmd = Command::new("umount");
        if force {
            cmd.arg("-f");
        }
        let output = cmd.arg(target).output()?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(io::Error::other(format!(
            "umount {} failed: {}",
            target.display(),
            stderr.trim()
        )))
    }
}

/// Finds the type of the mount whose mount point is the longest prefix of
/// `path` in `/proc/mounts` format.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn containing_fstype(mounts: &str, path: &Path) -> Option<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let _source = parts.next()?;
            let mountpoint = unescape_mount_path(parts.next()?);
            let fstype = parts.next()?;
            Some((mountpoint, fstype))
        })
        .filter(|(mountpoint, _)| path.starts_with(mountpoint))
        .max_by_key(|(mountpoint, _)| mountpoint.len())
        .map(|(_, fstype)| fstype.to_string())
}

/// Decodes the octal escapes (`\040` for space) used in `/proc/mounts`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape_mount_path(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(code) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
