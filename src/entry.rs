//! The [`MountEntry`] value type.

use nix::mount::MsFlags;

/// The sentinel used in place of a path or filesystem type that is absent.
pub const NONE: &str = "none";

/// Describes a single mount point.
///
/// Entries are immutable once built. Two entries compare equal iff their
/// source, target, filesystem type, flags and options data are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    source: String,
    target: String,
    fs_type: Option<String>,
    flags: MsFlags,
    data: String,
}

impl MountEntry {
    /// Creates an entry without a filesystem type, flags or data.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fs_type: None,
            flags: MsFlags::empty(),
            data: String::new(),
        }
    }

    /// Sets the filesystem type.
    ///
    /// The sentinel `none` is normalized to an absent type.
    pub fn with_fs_type(mut self, fs_type: impl Into<String>) -> Self {
        let fs_type = fs_type.into();
        self.fs_type = (fs_type != NONE && !fs_type.is_empty()).then_some(fs_type);
        self
    }

    /// Sets the mount flags.
    pub fn with_flags(mut self, flags: MsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the filesystem-specific mount data.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The filesystem type, or `None` when no type was specified.
    pub fn fs_type(&self) -> Option<&str> {
        self.fs_type.as_deref()
    }

    pub fn flags(&self) -> MsFlags {
        self.flags
    }

    /// Filesystem-specific data, empty when there is none.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns `true` if both entries describe the same mount.
    pub fn equivalent(&self, other: &Self) -> bool {
        self == other
    }
}
