//! Keeps a mount namespace in sync with a desired mount profile.
//!
//! Given the desired and the current [`MountProfile`], [`Changes`] yields
//! the mount and unmount operations that take the namespace from one to the
//! other. [`reconcile`] drives that computation through an [`Applier`].

pub mod apply;
pub mod change;
pub mod cmd;
pub mod entry;
pub mod mount;
pub mod opts;
pub mod profile;

pub use apply::{reconcile, Applier, ApplyError, DryRun, Namespace};
pub use change::{step, Change, Changes, Cursor};
pub use entry::MountEntry;
pub use profile::{MountProfile, ProfileError, ProfileLock};
