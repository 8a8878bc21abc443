//! Computes the mount changes that turn the current profile into the
//! desired one.
//!
//! The computation is purely positional. Both profiles are walked front to
//! back in lock step: identical entries at the same position are left
//! alone, a differing current entry is unmounted, and desired entries are
//! only mounted once the current profile is exhausted.

use std::fmt;

use crate::{cmd, entry::MountEntry, mount};

/// A single step towards the desired profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change<'a> {
    /// Nothing is left to do. No further steps may be requested.
    None,
    /// The entry must be mounted.
    Mount(&'a MountEntry),
    /// The entry must be unmounted.
    Unmount(&'a MountEntry),
}

impl<'a> Change<'a> {
    /// The entry affected by this change, if any.
    pub fn entry(&self) -> Option<&'a MountEntry> {
        match *self {
            Change::None => None,
            Change::Mount(entry) | Change::Unmount(entry) => Some(entry),
        }
    }
}

impl fmt::Display for Change<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::None => f.write_str("none"),
            Change::Mount(entry) => f.write_str(&cmd::mount_cmd(
                entry.source(),
                entry.target(),
                entry.fs_type(),
                entry.flags(),
                Some(entry.data()),
            )),
            Change::Unmount(entry) => match mount::revert_propagation(entry) {
                Some(private) => fmt::Display::fmt(&Change::Mount(&private), f),
                None => f.write_str(&cmd::umount_cmd(
                    entry.target(),
                    mount::unmount_flags(entry),
                )),
            },
        }
    }
}

/// A position within one profile.
///
/// Cursors are consumed by [`step`], which hands back their successors, so a
/// superseded cursor cannot be used again.
#[derive(Debug, PartialEq, Eq)]
pub struct Cursor(usize);

impl Cursor {
    /// A cursor pointing at the first entry of a profile.
    pub fn start() -> Self {
        Cursor(0)
    }

    fn head<'a>(&self, profile: &'a [MountEntry], name: &str) -> Option<&'a MountEntry> {
        assert!(
            self.0 <= profile.len(),
            "cannot compute required mount changes, {name} cursor {} is outside of a profile with {} entries",
            self.0,
            profile.len(),
        );
        profile.get(self.0)
    }

    fn advance(self) -> Self {
        Cursor(self.0 + 1)
    }
}

/// Computes the next change required to go from `current` to `desired`.
///
/// Returns the change along with the cursors to use for the following call.
/// Entries identical in both profiles at the same position are skipped
/// without producing a change.
///
/// # Panics
///
/// Panics if a cursor does not belong to the profile it is passed with.
pub fn step<'a>(
    desired: &'a [MountEntry],
    current: &'a [MountEntry],
    mut d: Cursor,
    mut c: Cursor,
) -> (Change<'a>, Cursor, Cursor) {
    loop {
        match (d.head(desired, "desired"), c.head(current, "current")) {
            (None, None) => return (Change::None, d, c),
            (Some(want), None) => return (Change::Mount(want), d.advance(), c),
            (None, Some(have)) => return (Change::Unmount(have), d, c.advance()),
            (Some(want), Some(have)) if have.equivalent(want) => {
                d = d.advance();
                c = c.advance();
            }
            // Clear the stage first. Either the heads eventually line up
            // again or the current profile runs out and the mounts follow.
            (Some(_), Some(have)) => return (Change::Unmount(have), d, c.advance()),
        }
    }
}

/// Iterator over the changes required to go from `current` to `desired`.
///
/// Yields only [`Change::Mount`] and [`Change::Unmount`] and is exhausted
/// once [`step`] reports [`Change::None`]. At most
/// `desired.len() + current.len()` changes are produced.
#[derive(Debug)]
pub struct Changes<'a> {
    desired: &'a [MountEntry],
    current: &'a [MountEntry],
    cursors: Option<(Cursor, Cursor)>,
}

impl<'a> Changes<'a> {
    pub fn new(desired: &'a [MountEntry], current: &'a [MountEntry]) -> Self {
        Self {
            desired,
            current,
            cursors: Some((Cursor::start(), Cursor::start())),
        }
    }
}

impl<'a> Iterator for Changes<'a> {
    type Item = Change<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (d, c) = self.cursors.take()?;
        match step(self.desired, self.current, d, c) {
            (Change::None, _, _) => None,
            (change, d, c) => {
                self.cursors = Some((d, c));
                Some(change)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.cursors {
            Some((d, c)) => {
                let left = (self.desired.len() - d.0) + (self.current.len() - c.0);
                (0, Some(left))
            }
            None => (0, Some(0)),
        }
    }
}

impl std::iter::FusedIterator for Changes<'_> {}

#[cfg(test)]
mod tests {
    use nix::mount::MsFlags;

    use super::*;

    fn bind(source: &str, target: &str) -> MountEntry {
        MountEntry::new(source, target).with_flags(MsFlags::MS_BIND)
    }

    fn drain<'a>(desired: &'a [MountEntry], current: &'a [MountEntry]) -> Vec<Change<'a>> {
        let mut changes = Vec::new();
        let (mut d, mut c) = (Cursor::start(), Cursor::start());
        loop {
            let (change, next_d, next_c) = step(desired, current, d, c);
            changes.push(change);
            if change == Change::None {
                return changes;
            }
            (d, c) = (next_d, next_c);
        }
    }

    #[test]
    fn identical_profiles() {
        let profile = [bind("/a", "/a"), bind("/b", "/b"), bind("/c", "/c")];
        assert_eq!(drain(&profile, &profile.clone()), vec![Change::None]);
    }

    #[test]
    fn empty_profiles() {
        assert_eq!(drain(&[], &[]), vec![Change::None]);
    }

    #[test]
    fn mount_everything() {
        let desired = [bind("/a", "/a"), bind("/b", "/b")];
        assert_eq!(
            drain(&desired, &[]),
            vec![
                Change::Mount(&desired[0]),
                Change::Mount(&desired[1]),
                Change::None
            ]
        );
    }

    #[test]
    fn unmount_everything() {
        let current = [bind("/x", "/x")];
        assert_eq!(
            drain(&[], &current),
            vec![Change::Unmount(&current[0]), Change::None]
        );
    }

    #[test]
    fn divergent_tail() {
        let desired = [bind("/a", "/a"), bind("/z", "/z")];
        let current = [bind("/a", "/a"), bind("/b", "/b")];
        assert_eq!(
            drain(&desired, &current),
            vec![
                Change::Unmount(&current[1]),
                Change::Mount(&desired[1]),
                Change::None
            ]
        );
    }

    #[test]
    fn matching_heads_after_unmount_are_kept() {
        let desired = [bind("/a", "/a"), bind("/c", "/c"), bind("/d", "/d")];
        let current = [bind("/a", "/a"), bind("/b", "/b"), bind("/c", "/c")];
        assert_eq!(
            drain(&desired, &current),
            vec![
                Change::Unmount(&current[1]),
                Change::Mount(&desired[2]),
                Change::None
            ]
        );
    }

    #[test]
    fn unmounts_precede_mounts_after_divergence() {
        let desired = [bind("/a", "/a"), bind("/x", "/x"), bind("/y", "/y")];
        let current = [bind("/a", "/a"), bind("/b", "/b"), bind("/c", "/c")];
        assert_eq!(
            drain(&desired, &current),
            vec![
                Change::Unmount(&current[1]),
                Change::Unmount(&current[2]),
                Change::Mount(&desired[1]),
                Change::Mount(&desired[2]),
                Change::None
            ]
        );
    }

    #[test]
    fn heads_realign_after_unmount() {
        let desired = [bind("/b", "/b")];
        let current = [bind("/a", "/a"), bind("/b", "/b")];
        assert_eq!(
            drain(&desired, &current),
            vec![Change::Unmount(&current[0]), Change::None]
        );
    }

    #[test]
    fn changes_iterator() {
        let desired = [bind("/a", "/a"), bind("/z", "/z")];
        let current = [bind("/a", "/a"), bind("/b", "/b")];
        let mut changes = Changes::new(&desired, &current);
        assert_eq!(changes.size_hint(), (0, Some(4)));
        assert_eq!(changes.next(), Some(Change::Unmount(&current[1])));
        assert_eq!(changes.next(), Some(Change::Mount(&desired[1])));
        assert_eq!(changes.next(), None);
        assert_eq!(changes.next(), None);
        assert_eq!(changes.size_hint(), (0, Some(0)));
    }

    #[test]
    fn display_renders_commands() {
        let entry = bind("/snap/foo/1/dir", "/usr/share/dir");
        assert_eq!(
            Change::Mount(&entry).to_string(),
            "mount --bind /snap/foo/1/dir /usr/share/dir"
        );
        assert_eq!(
            Change::Unmount(&entry).to_string(),
            "umount /usr/share/dir"
        );
        let rbind = entry.clone().with_flags(MsFlags::MS_BIND | MsFlags::MS_REC);
        assert_eq!(
            Change::Unmount(&rbind).to_string(),
            "umount --lazy /usr/share/dir"
        );
    }

    #[test]
    fn display_undoes_propagation_changes() {
        let shared = MountEntry::new("/place", "none").with_flags(MsFlags::MS_SHARED);
        assert_eq!(Change::Mount(&shared).to_string(), "mount --make-shared /place");
        assert_eq!(
            Change::Unmount(&shared).to_string(),
            "mount --make-private /place"
        );

        let rslave = shared.with_flags(MsFlags::MS_SLAVE | MsFlags::MS_REC);
        assert_eq!(
            Change::Unmount(&rslave).to_string(),
            "mount --make-rprivate /place"
        );
    }

    #[test]
    #[should_panic(expected = "desired cursor 3 is outside of a profile with 1 entries")]
    fn foreign_cursor() {
        let desired = [bind("/a", "/a")];
        let _ = step(&desired, &[], Cursor(3), Cursor::start());
    }
}
