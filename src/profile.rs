//! Mount profiles and their on-disk `fstab(5)` representation.
//!
//! A profile is an ordered list of [`MountEntry`] values. Each line of the
//! text form holds one entry as `source target fstype options freq passno`.
//! Whitespace, newlines, backslashes and `#` inside a field are escaped as
//! octal sequences (`\040`, `\011`, `\012`, `\134`, `\043`). An empty field
//! is written as `\000`.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::debug;
use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
    mount::MsFlags,
};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{
    entry::{MountEntry, NONE},
    opts,
};

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("cannot replace mount profile: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("cannot lock mount profile: {0}")]
    Lock(#[from] Errno),
}
/// An ordered sequence of mount entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountProfile {
    entries: Vec<MountEntry>,
}

impl MountProfile {
    pub fn new(entries: Vec<MountEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Parses the `fstab(5)` text form.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let entries = text
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(index, line)| {
                parse_entry(line).map_err(|reason| ProfileError::Parse {
                    line: index + 1,
                    reason,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { entries })
    }

    /// Reads the profile stored at `path`.
    ///
    /// A missing file is an empty profile.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let profile = Self::parse(&text)?;
                debug!("loaded {} entries from {:?}", profile.len(), path);
                Ok(profile)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no mount profile at {:?}", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the file at `path` with this profile.
    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(self.to_string().as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path)?;
        debug!("saved {} entries to {:?}", self.len(), path);

        Ok(())
    }
}

impl Deref for MountProfile {
    type Target = [MountEntry];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl From<Vec<MountEntry>> for MountProfile {
    fn from(entries: Vec<MountEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromStr for MountProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MountProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let options = [opts::flags_to_tokens(entry.flags()), entry.data().to_string()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                f,
                "{} {} {} {} 0 0",
                escape(entry.source()),
                escape(entry.target()),
                escape(entry.fs_type().unwrap_or(NONE)),
                if options.is_empty() { "defaults" } else { options.as_str() },
            )?;
        }
        Ok(())
    }
}

/// An exclusive lock serializing updates of one mount profile.
///
/// The lock is taken with `flock(2)` on a `.lock` file next to the profile
/// and released when the value is dropped.
pub struct ProfileLock {
    _file: Flock<File>,
}

impl ProfileLock {
    /// Blocks until no other process holds the lock for `profile`.
    pub fn acquire(profile: &Path) -> Result<Self, ProfileError> {
        let path = lock_path(profile);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| errno)?;
        debug!("locked {:?}", path);

        Ok(Self { _file: file })
    }
}

fn lock_path(profile: &Path) -> PathBuf {
    let mut path = profile.as_os_str().to_owned();
    path.push(".lock");
    PathBuf::from(path)
}

fn parse_entry(line: &str) -> Result<MountEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if !(4..=6).contains(&fields.len()) {
        return Err(format!("expected 4 to 6 fields, found {}", fields.len()));
    }
    for field in fields.iter().skip(4) {
        field
            .parse::<u32>()
            .map_err(|_| format!("cannot parse {field:?} as a number"))?;
    }

    // Anything that is not a flag stays in the data, `rw` included, so that
    // saving a loaded profile writes the options back as they were.
    let mut flags = MsFlags::empty();
    let mut data = Vec::new();
    if fields[3] != "defaults" {
        for token in fields[3].split(',').filter(|token| !token.is_empty()) {
            match opts::token_to_flags(token) {
                Some(bits) => flags |= bits,
                None => data.push(token),
            }
        }
    }

    Ok(MountEntry::new(unescape(fields[0])?, unescape(fields[1])?)
        .with_fs_type(unescape(fields[2])?)
        .with_flags(flags)
        .with_data(data.join(",")))
}

fn escape(field: &str) -> String {
    if field.is_empty() {
        return "\\000".to_string();
    }
    let mut escaped = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            ' ' => escaped.push_str("\\040"),
            '\t' => escaped.push_str("\\011"),
            '\n' => escaped.push_str("\\012"),
            '#' => escaped.push_str("\\043"),
            '\\' => escaped.push_str("\\134"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape(field: &str) -> Result<String, String> {
    let mut bytes = Vec::with_capacity(field.len());
    let mut rest = field.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        let is_octal = tail.len() >= 3 && tail[..3].iter().all(|d| (b'0'..=b'7').contains(d));
        if b == b'\\' && is_octal {
            let octal = std::str::from_utf8(&tail[..3]).map_err(|e| e.to_string())?;
            let value = u8::from_str_radix(octal, 8)
                .map_err(|_| format!("invalid escape sequence \\{octal}"))?;
            // `\000` marks an empty field.
            if value != 0 {
                bytes.push(value);
            }
            rest = &tail[3..];
        } else {
            bytes.push(b);
            rest = tail;
        }
    }
    String::from_utf8(bytes).map_err(|_| format!("{field:?} is not valid UTF-8"))
}
