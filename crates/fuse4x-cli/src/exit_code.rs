//! Process exit codes.
//!
//! Each mount failure category has its own code so wrapper scripts can
//! react without parsing messages. Code 2 is left to clap for usage errors.

use fuse4x_mount::ErrorCategory;

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
pub const OPTION_INVALID: u8 = 3;
pub const OPTION_CONFLICT: u8 = 4;
pub const MOUNTPOINT_INVALID: u8 = 5;
pub const KERNEL_INCOMPATIBLE: u8 = 6;
pub const DEVICE_UNAVAILABLE: u8 = 7;
pub const MOUNT_FAILED: u8 = 8;
pub const UNMOUNT_FAILED: u8 = 9;
/// Matches `EX_NOPERM` from sysexits.h.
pub const PERMISSION_DENIED: u8 = 77;

/// Exit code for a mount failure category.
pub fn for_category(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::OptionSyntax => OPTION_INVALID,
        ErrorCategory::OptionConflict => OPTION_CONFLICT,
        ErrorCategory::Mountpoint => MOUNTPOINT_INVALID,
        ErrorCategory::KernelIncompatible => KERNEL_INCOMPATIBLE,
        ErrorCategory::Device => DEVICE_UNAVAILABLE,
        ErrorCategory::MountSyscall => MOUNT_FAILED,
        ErrorCategory::Unmount => UNMOUNT_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let categories = [
            ErrorCategory::OptionSyntax,
            ErrorCategory::OptionConflict,
            ErrorCategory::Mountpoint,
            ErrorCategory::KernelIncompatible,
            ErrorCategory::Device,
            ErrorCategory::MountSyscall,
            ErrorCategory::Unmount,
        ];
        let mut codes: Vec<u8> = categories.into_iter().map(for_category).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), categories.len());
        assert!(!codes.contains(&SUCCESS));
        assert!(!codes.contains(&GENERAL_ERROR));
        assert!(!codes.contains(&2));
    }
}
