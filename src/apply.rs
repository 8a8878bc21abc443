//! Applies computed mount changes.

use log::{debug, error, info};
use thiserror::Error;

use crate::{
    change::{Change, Changes},
    entry::MountEntry,
    mount::{self, MountError},
    profile::MountProfile,
};

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("cannot apply `{command}`: {source}")]
    Failed {
        command: String,
        #[source]
        source: MountError,
    },
}

/// Something that can carry out mount changes.
pub trait Applier {
    fn mount(&mut self, entry: &MountEntry) -> Result<(), MountError>;
    fn unmount(&mut self, entry: &MountEntry) -> Result<(), MountError>;
}

/// Logs every change without touching the system.
#[derive(Debug, Default)]
pub struct DryRun;

impl Applier for DryRun {
    fn mount(&mut self, entry: &MountEntry) -> Result<(), MountError> {
        debug!("dry run, not mounting {:?}", entry.target());
        Ok(())
    }

    fn unmount(&mut self, entry: &MountEntry) -> Result<(), MountError> {
        debug!("dry run, not unmounting {:?}", entry.target());
        Ok(())
    }
}

/// Performs the changes in the mount namespace of the calling process.
#[derive(Debug, Default)]
pub struct Namespace;

impl Applier for Namespace {
    fn mount(&mut self, entry: &MountEntry) -> Result<(), MountError> {
        mount::mount_entry(entry)
    }

    fn unmount(&mut self, entry: &MountEntry) -> Result<(), MountError> {
        mount::unmount_entry(entry)
    }
}

/// Brings the mount namespace described by `current` in line with `desired`.
///
/// Every change is logged and applied before the next one is computed. The
/// first failure ends the session and no further change is attempted.
///
/// On success the namespace matches `desired`, which is returned as the new
/// current profile.
pub fn reconcile<A: Applier + ?Sized>(
    desired: &MountProfile,
    current: &MountProfile,
    applier: &mut A,
) -> Result<MountProfile, ApplyError> {
    for change in Changes::new(desired, current) {
        let command = change.to_string();
        info!("{command}");

        let result = match change {
            Change::Mount(entry) => applier.mount(entry),
            Change::Unmount(entry) => applier.unmount(entry),
            Change::None => Ok(()),
        };

        if let Err(source) = result {
            error!("aborting mount namespace update: {source}");
            return Err(ApplyError::Failed { command, source });
        }
    }

    debug!("mount namespace is up to date");
    Ok(desired.clone())
}
