#![deny(unsafe_code)]

mod commands;
mod exit_code;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fuse4x_mount::MountError;

use crate::commands::{check, mount, options, unmount};

/// Mount and unmount fuse4x volumes
#[derive(Parser)]
#[command(name = "fuse4x")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Mount read-only with a custom volume name, unmount on Ctrl-C
    fuse4x mount -o ro,volname=Backup /Volumes/backup

    # Check that the kernel extension is loaded and compatible
    fuse4x check

    # Force an unmount
    fuse4x unmount --force /Volumes/backup
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate a mount and hold the device until interrupted
    Mount(mount::Args),

    /// Unmount a fuse4x volume
    Unmount(unmount::Args),

    /// Check the kernel extension without mounting
    Check(check::Args),

    /// List recognized mount options
    Options(options::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Mount(args) => mount::execute(args, cli.quiet),
        Commands::Unmount(args) => unmount::execute(args),
        Commands::Check(args) => check::execute(args, cli.quiet),
        Commands::Options(args) => options::execute(args),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(mount_err) = cause.downcast_ref::<MountError>() {
            if let MountError::MountSyscall { source, .. } | MountError::Unmount { source, .. } =
                mount_err
                && source.kind() == io::ErrorKind::PermissionDenied
            {
                return exit_code::PERMISSION_DENIED;
            }
            return exit_code::for_category(mount_err.category());
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::PermissionDenied
        {
            return exit_code::PERMISSION_DENIED;
        }
    }
    exit_code::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use fuse4x_mount::parse_options;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_categorize_through_context() {
        let err = parse_options(["bogus"]).map_err(MountError::from).unwrap_err();
        let wrapped = Err::<(), _>(err).context("mounting /Volumes/x").unwrap_err();
        assert_eq!(categorize_error(&wrapped), exit_code::OPTION_INVALID);
    }

    #[test]
    fn test_categorize_conflict() {
        let err = parse_options(["allow_other", "allow_root"])
            .map_err(MountError::from)
            .unwrap_err();
        assert_eq!(
            categorize_error(&anyhow::Error::new(err)),
            exit_code::OPTION_CONFLICT
        );
    }

    #[test]
    fn test_categorize_permission_denied() {
        let err = MountError::MountSyscall {
            device: "/dev/fuse4x0".into(),
            mountpoint: "/Volumes/x".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(
            categorize_error(&anyhow::Error::new(err)),
            exit_code::PERMISSION_DENIED
        );
    }

    #[test]
    fn test_categorize_other() {
        assert_eq!(
            categorize_error(&anyhow::anyhow!("something else")),
            exit_code::GENERAL_ERROR
        );
    }
}
