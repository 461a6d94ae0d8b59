//! Mount command - negotiate a fuse4x mount and hold the device.
//!
//! The device descriptor stays open until SIGINT, SIGTERM or SIGHUP, then
//! the volume is unmounted. A second signal exits immediately.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{debug, info, instrument};

use fuse4x_mount::signal::signal_name;
use fuse4x_mount::{
    HostSettings, Mounter, ShutdownSignals, SystemNotifier, SystemPlatform, split_options,
};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory to mount on
    pub mountpoint: PathBuf,

    /// Mount options, comma-separated or repeated (e.g. -o ro,volname=Data)
    #[arg(short = 'o', value_name = "OPTIONS")]
    pub options: Vec<String>,

    /// Program name used in the default fsname and volname
    #[arg(long, value_name = "NAME")]
    pub program: Option<String>,

    /// Return right after mounting instead of waiting for a signal
    #[arg(long)]
    pub no_wait: bool,

    /// Force the unmount on shutdown even if the volume is busy
    #[arg(short, long)]
    pub force: bool,
}

#[instrument(
    level = "info",
    name = "cmd::mount",
    skip_all,
    fields(mountpoint = %args.mountpoint.display())
)]
pub fn execute(args: &Args, quiet: bool) -> Result<()> {
    let tokens = split_options(&args.options);
    debug!(?tokens, "mount options");

    let mut mounter =
        Mounter::new(&SystemPlatform, &SystemNotifier).settings(HostSettings::from_env());
    if let Some(program) = &args.program {
        mounter = mounter.program(program.clone());
    }

    // Installed before mounting so an early Ctrl-C still unmounts.
    let mut signals = if args.no_wait {
        None
    } else {
        Some(ShutdownSignals::install().context("Failed to install signal handlers")?)
    };

    let volume = mounter
        .mount(&args.mountpoint, &tokens)
        .with_context(|| format!("Failed to mount {}", args.mountpoint.display()))?;

    if !quiet {
        println!(
            "Mounted {} on {} (kernel extension {})",
            volume.device.path().display(),
            volume.mountpoint.display(),
            volume.kernel_version
        );
        if !volume.passthrough.is_empty() {
            println!("Helper module arguments: {}", volume.passthrough.join(" "));
        }
    }

    let Some(signals) = signals.as_mut() else {
        return Ok(());
    };

    let sig = signals.wait();
    info!(signal = signal_name(sig), "shutdown requested");

    let mountpoint = volume.mountpoint.clone();
    mounter
        .unmount_volume(volume, args.force)
        .with_context(|| format!("Failed to unmount {}", mountpoint.display()))?;

    if !quiet {
        println!("Unmounted {}", mountpoint.display());
    }
    Ok(())
}
