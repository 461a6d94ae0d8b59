//! Options command - list the mount option vocabulary, or validate a set of
//! options without mounting.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use fuse4x_mount::options::{MOUNT_OPTIONS, MountOption, OptionAction};
use fuse4x_mount::{MountConfig, MountError, parse_options, split_options};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Parse these options and print the resulting configuration instead of
    /// listing the vocabulary
    #[arg(short = 'o', long = "check", value_name = "OPTIONS")]
    pub check: Vec<String>,
}

#[instrument(level = "info", name = "cmd::options", skip_all)]
pub fn execute(args: &Args) -> Result<()> {
    if args.check.is_empty() {
        for option in MOUNT_OPTIONS {
            println!("{:<22} {}", option.to_string(), kind(option));
        }
        return Ok(());
    }

    let parsed = parse_options(split_options(&args.check)).map_err(MountError::from)?;
    print_config(&parsed.config);
    for arg in &parsed.passthrough {
        println!("{:<16} {arg}", "module");
    }
    Ok(())
}

fn kind(option: &MountOption) -> &'static str {
    match option.action {
        OptionAction::Standard(_) => "standard",
        OptionAction::Protocol(_) => "fuse4x",
        OptionAction::Numeric(_) => "number",
        OptionAction::Text(_) => "string",
        OptionAction::Quiet | OptionAction::AllowRecursion | OptionAction::VolIcon => "special",
        OptionAction::Ignored => "ignored",
    }
}

fn print_config(config: &MountConfig) {
    println!("{:<16} {:?}", "std_flags", config.std_flags);
    println!("{:<16} {:?}", "alt_flags", config.alt_flags);
    println!("{:<16} {}", "blocksize", config.blocksize);
    println!("{:<16} {}", "iosize", config.iosize);
    println!("{:<16} {}", "daemon_timeout", config.daemon_timeout);
    println!("{:<16} {}", "init_timeout", config.init_timeout);
    println!("{:<16} {:#x}", "fsid", config.fsid);
    println!("{:<16} {}", "fssubtype", config.fssubtype);
    for (key, value) in [
        ("fsname", &config.fsname),
        ("fstypename", &config.fstypename),
        ("volname", &config.volname),
    ] {
        if let Some(value) = value {
            println!("{key:<16} {value}");
        }
    }
    if config.allow_recursion {
        println!("{:<16} yes", "allow_recursion");
    }
}
