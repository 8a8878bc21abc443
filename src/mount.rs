//! Implements functionality around `mount(2)` and `umount2(2)` system calls

use log::debug;
use nix::{
    mount::{self, MntFlags, MsFlags},
    sched::{self, CloneFlags},
};
use thiserror::Error;

use crate::entry::{MountEntry, NONE};

#[derive(Error, Debug)]
pub enum MountError {
    #[error("mount(2) or umount2(2) failed: {0}")]
    Internal(#[from] nix::errno::Errno),
}

/// Moves the calling process into a fresh, private mount namespace.
///
/// After `unshare(2)` this mounts `/` with [`MsFlags::MS_REC`] and
/// [`MsFlags::MS_PRIVATE`] so that all `mount(2)` and `umount(2)` operations
/// performed within the mount namespace do not propagate into other namespace
/// in case that there is a shared subtree somewhere within the file system.
pub fn init_namespace() -> Result<(), MountError> {
    sched::unshare(CloneFlags::CLONE_NEWNS)?;
    debug!("unshared the mount namespace");

    mount::mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )?;
    debug!("mounted `/` with `MsFlags::MS_PRIVATE`");

    Ok(())
}

/// Returns `true` if `entry` only changes the propagation of `source`.
fn is_propagation_change(entry: &MountEntry) -> bool {
    entry.target() == NONE
        && entry.flags().intersects(
            MsFlags::MS_SHARED | MsFlags::MS_SLAVE | MsFlags::MS_PRIVATE | MsFlags::MS_UNBINDABLE,
        )
}

/// Returns the data string handed to the kernel.
///
/// `defaults` and `rw` only exist for `mount(8)` and are dropped.
fn kernel_data(entry: &MountEntry) -> String {
    entry
        .data()
        .split(',')
        .filter(|token| !matches!(*token, "" | "defaults" | "rw"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Performs the mount described by `entry`.
pub fn mount_entry(entry: &MountEntry) -> Result<(), MountError> {
    if is_propagation_change(entry) {
        mount::mount(
            None::<&str>,
            entry.source(),
            None::<&str>,
            entry.flags(),
            None::<&str>,
        )?;
    } else {
        let data = kernel_data(entry);
        mount::mount(
            Some(entry.source()),
            entry.target(),
            entry.fs_type(),
            entry.flags(),
            Some(data.as_str()).filter(|data| !data.is_empty()),
        )?;
    }
    debug!("mounted {:?} at {:?}", entry.source(), entry.target());

    Ok(())
}

/// The entry that undoes the propagation change described by `entry`.
///
/// Propagation changes have nothing to unmount. They are undone by making
/// `source` private again, recursively if the change was recursive.
pub fn revert_propagation(entry: &MountEntry) -> Option<MountEntry> {
    if !is_propagation_change(entry) {
        return None;
    }
    let flags = MsFlags::MS_PRIVATE | (entry.flags() & MsFlags::MS_REC);
    Some(MountEntry::new(entry.source(), NONE).with_flags(flags))
}

/// The `umount2(2)` flags used to undo `entry`.
///
/// Symbolic links are never followed. Recursive bind mounts are detached
/// since their target carries a whole tree of mounts.
pub fn unmount_flags(entry: &MountEntry) -> MntFlags {
    let mut flags = MntFlags::UMOUNT_NOFOLLOW;
    if entry.flags().contains(MsFlags::MS_BIND | MsFlags::MS_REC) {
        flags |= MntFlags::MNT_DETACH;
    }
    flags
}

/// Undoes the mount described by `entry`.
pub fn unmount_entry(entry: &MountEntry) -> Result<(), MountError> {
    if let Some(private) = revert_propagation(entry) {
        mount_entry(&private)?;
        debug!("reverted {:?} to private propagation", entry.source());
        return Ok(());
    }

    mount::umount2(entry.target(), unmount_flags(entry))?;
    debug!("unmounted {:?}", entry.target());

    Ok(())
}
