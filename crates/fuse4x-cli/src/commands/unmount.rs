//! Unmount command - unmount a fuse4x volume.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use fuse4x_mount::{HostSettings, Mounter, SystemNotifier, SystemPlatform};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory where the volume is mounted
    pub mountpoint: PathBuf,

    /// Force unmount even if the filesystem is busy
    #[arg(short, long)]
    pub force: bool,
}

#[instrument(
    level = "info",
    name = "cmd::unmount",
    skip_all,
    fields(mountpoint = %args.mountpoint.display(), force = args.force)
)]
pub fn execute(args: &Args) -> Result<()> {
    if !args.mountpoint.exists() {
        anyhow::bail!("Mountpoint does not exist: {}", args.mountpoint.display());
    }

    Mounter::new(&SystemPlatform, &SystemNotifier)
        .settings(HostSettings::from_env())
        .unmount(&args.mountpoint, None, args.force)
        .with_context(|| format!("Failed to unmount {}", args.mountpoint.display()))?;

    eprintln!("Unmounted {}", args.mountpoint.display());
    Ok(())
}
