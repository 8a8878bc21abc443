use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context, Result};
use caps::{CapSet, Capability};
use clap::Parser;
use log::{debug, info};
use mntns::{mount, reconcile, DryRun, MountProfile, Namespace, ProfileLock};

#[derive(Parser, Debug)]
#[command(about = "Update a mount namespace to match a desired mount profile")]
struct Args {
    /// The mount profile the namespace should end up with
    #[arg(long)]
    desired: PathBuf,

    /// The mount profile describing the namespace as it is now
    ///
    /// It is rewritten with the resulting state after a successful update.
    #[arg(long)]
    current: PathBuf,

    /// Only log the commands that would be performed
    #[arg(long)]
    dry_run: bool,

    /// Perform the update in a fresh private mount namespace
    ///
    /// The namespace goes away with this process, so the current profile is
    /// left untouched. Useful to check that a profile applies cleanly.
    #[arg(long, conflicts_with = "dry_run")]
    unshare: bool,
}

fn main() -> Result<ExitCode> {
    // Initialize the application.
    env_logger::init();
    let args = Args::parse();

    // Held until the updated current profile is saved. A dry run changes
    // nothing and may lack the permission to create the lock file.
    let _lock = if args.dry_run {
        None
    } else {
        let lock = ProfileLock::acquire(&args.current)
            .with_context(|| format!("failed to lock current profile {:?}", args.current))?;
        Some(lock)
    };
    let desired = MountProfile::load(&args.desired)
        .with_context(|| format!("failed to load desired profile {:?}", args.desired))?;
    let current = MountProfile::load(&args.current)
        .with_context(|| format!("failed to load current profile {:?}", args.current))?;
    debug!(
        "reconciling {} current entries against {} desired entries",
        current.len(),
        desired.len()
    );

    if args.dry_run {
        reconcile(&desired, &current, &mut DryRun)?;
        return Ok(ExitCode::SUCCESS);
    }

    if !caps::has_cap(None, CapSet::Effective, Capability::CAP_SYS_ADMIN)? {
        bail!("changing the mount namespace requires CAP_SYS_ADMIN");
    }

    if args.unshare {
        mount::init_namespace()?;
        debug!("finished mount namespace setup");
    }

    let state = reconcile(&desired, &current, &mut Namespace)?;
    if args.unshare {
        return Ok(ExitCode::SUCCESS);
    }
    state
        .save(&args.current)
        .with_context(|| format!("failed to save current profile {:?}", args.current))?;
    info!("saved {} entries to {:?}", state.len(), args.current);

    Ok(ExitCode::SUCCESS)
}
