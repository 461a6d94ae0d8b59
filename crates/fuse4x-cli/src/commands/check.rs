//! Check command - run the kernel extension compatibility gate alone.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use fuse4x_mount::{HostSettings, MountError, SystemNotifier, SystemPlatform, check_kernel};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Do not show alerts when the check fails
    #[arg(long)]
    pub no_alerts: bool,
}

#[instrument(level = "info", name = "cmd::check", skip_all)]
pub fn execute(args: &Args, quiet: bool) -> Result<()> {
    let settings = HostSettings::from_env();
    let version = check_kernel(
        &SystemPlatform,
        &SystemNotifier,
        &settings,
        args.no_alerts || quiet,
    )
    .map_err(MountError::from)?;

    if !quiet {
        println!("fuse4x kernel extension {version} is loaded and compatible");
    }
    Ok(())
}
