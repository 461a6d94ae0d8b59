//! Constants shared with the fuse4x kernel extension.
//!
//! These values are part of the user/kernel contract: the kernel side is
//! compiled against the same numbers, so changing any of them requires a
//! matching kernel extension release.

/// Filesystem type tag passed to `mount(2)`.
pub const FS_TYPE: &str = "fuse4x";

/// Kernel extension version this library speaks.
///
/// Compared byte-for-byte against the value reported by the kernel.
pub const KEXT_VERSION: &str = "0.9.2";

/// sysctl holding the loaded kernel extension's version string.
pub const SYSCTL_VERSION_NUMBER: &str = "vfs.generic.fuse4x.version.number";

/// Helper that loads the kernel extension. Invoked with no arguments.
pub const LOAD_PROGRAM: &str = "/Library/Extensions/fuse4x.kext/Support/load_fuse4x";

/// Directory holding the device nodes.
pub const DEVICE_DIR: &str = "/dev";

/// Device node prefix; `/dev/fuse4x0` is the first device.
pub const DEVICE_BASENAME: &str = "fuse4x";

/// Number of `/dev/fuse4x<n>` nodes created by the kernel extension.
pub const NDEVICES: u32 = 24;

/// Lowest Darwin major release the kernel extension supports (Mac OS X 10.6).
pub const MIN_OS_MAJOR: u32 = 10;

/// `MAXPATHLEN` on Darwin, including the terminating NUL.
pub const MAXPATHLEN: usize = 1024;

/// `MFSTYPENAMELEN` on Darwin, including the terminating NUL.
pub const MFSTYPENAMELEN: usize = 16;

/// Page size assumed by the kernel extension for I/O bounds.
pub const PAGE_SIZE: u32 = 4096;

/// Default block size of the virtual storage device.
pub const DEFAULT_BLOCKSIZE: u32 = 4096;
/// Smallest accepted block size.
pub const MIN_BLOCKSIZE: u32 = 1;
/// Largest accepted block size (`MAXPHYS`).
pub const MAX_BLOCKSIZE: u32 = 128 * 1024;

const MAX_IO_PAGES: u32 = 8192;

/// Smallest accepted I/O size.
pub const MIN_IOSIZE: u32 = PAGE_SIZE;
/// Largest accepted I/O size.
pub const MAX_IOSIZE: u32 = MAX_IO_PAGES * PAGE_SIZE;
/// Default I/O size. Must stay at least as large as the block size.
pub const DEFAULT_IOSIZE: u32 = MAX_IOSIZE;

/// Default upcall timeout, in seconds.
pub const DEFAULT_DAEMON_TIMEOUT: u32 = 60;
/// Lower clamp bound for `daemon_timeout=`.
pub const MIN_DAEMON_TIMEOUT: u32 = 0;
/// Upper clamp bound for `daemon_timeout=`.
pub const MAX_DAEMON_TIMEOUT: u32 = 600;

/// Default time the kernel waits for the daemon's init reply, in seconds.
pub const DEFAULT_INIT_TIMEOUT: u32 = 10;
/// Lower clamp bound for `init_timeout=`.
pub const MIN_INIT_TIMEOUT: u32 = 1;
/// Upper clamp bound for `init_timeout=`.
pub const MAX_INIT_TIMEOUT: u32 = 300;

/// Bits of the device minor number available for a custom `fsid=`.
pub const MINOR_MASK: u32 = 0x00FF_FFFF;

/// Device major number the kernel uses when a custom fsid is supplied.
pub const CUSTOM_FSID_DEVICE_MAJOR: u32 = 255;
