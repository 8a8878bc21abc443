//! Conversion between [`MsFlags`] and textual mount options.

use nix::{libc::c_ulong, mount::MsFlags};

/// How the recursive bit interacts with an option.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Rec {
    /// `MS_REC` has no meaning for this option.
    Ignored,
    /// `MS_REC` turns `name` into `rname`.
    Prefixed,
}

/// Known options in the order in which they are rendered.
#[allow(deprecated)]
const OPTIONS: &[(MsFlags, &str, Rec)] = &[
    (MsFlags::MS_RDONLY, "ro", Rec::Ignored),
    (MsFlags::MS_NOSUID, "nosuid", Rec::Ignored),
    (MsFlags::MS_NODEV, "nodev", Rec::Ignored),
    (MsFlags::MS_NOEXEC, "noexec", Rec::Ignored),
    (MsFlags::MS_SYNCHRONOUS, "sync", Rec::Ignored),
    (MsFlags::MS_REMOUNT, "remount", Rec::Ignored),
    (MsFlags::MS_MANDLOCK, "mand", Rec::Ignored),
    (MsFlags::MS_DIRSYNC, "dirsync", Rec::Ignored),
    (MsFlags::MS_NOATIME, "noatime", Rec::Ignored),
    (MsFlags::MS_NODIRATIME, "nodiratime", Rec::Ignored),
    (MsFlags::MS_BIND, "bind", Rec::Prefixed),
    (MsFlags::MS_MOVE, "move", Rec::Ignored),
    (MsFlags::MS_SILENT, "silent", Rec::Ignored),
    (MsFlags::MS_POSIXACL, "acl", Rec::Ignored),
    (MsFlags::MS_UNBINDABLE, "unbindable", Rec::Prefixed),
    (MsFlags::MS_PRIVATE, "private", Rec::Prefixed),
    (MsFlags::MS_SLAVE, "slave", Rec::Prefixed),
    (MsFlags::MS_SHARED, "shared", Rec::Prefixed),
    (MsFlags::MS_RELATIME, "relatime", Rec::Ignored),
    (MsFlags::MS_KERNMOUNT, "kernmount", Rec::Ignored),
    (MsFlags::MS_I_VERSION, "iversion", Rec::Ignored),
    (MsFlags::MS_STRICTATIME, "strictatime", Rec::Ignored),
    (MsFlags::MS_LAZYTIME, "lazytime", Rec::Ignored),
    (MsFlags::MS_ACTIVE, "active", Rec::Ignored),
    (MsFlags::MS_NOUSER, "nouser", Rec::Ignored),
];

/// Renders `flags` as a comma separated list of mount options.
///
/// `MS_REC` never shows up on its own; it only adds the `r` prefix to
/// `bind`, `unbindable`, `private`, `slave` and `shared`. Bits without a
/// name, including a lone `MS_REC`, are appended as a single hexadecimal
/// token.
pub fn flags_to_tokens(flags: MsFlags) -> String {
    let recursive = flags.contains(MsFlags::MS_REC);
    let mut rest = flags;
    let mut tokens = Vec::new();

    for &(flag, name, rec) in OPTIONS {
        if !flags.contains(flag) {
            continue;
        }
        rest.remove(flag);
        if rec == Rec::Prefixed && recursive {
            rest.remove(MsFlags::MS_REC);
            tokens.push(format!("r{name}"));
        } else {
            tokens.push(name.to_string());
        }
    }

    if !rest.is_empty() {
        tokens.push(format!("{:#x}", rest.bits()));
    }

    tokens.join(",")
}

/// Parses a single mount option into the flags it stands for.
///
/// Returns `None` if `token` is not a mount flag, in which case it is
/// filesystem-specific data.
pub fn token_to_flags(token: &str) -> Option<MsFlags> {
    if let Some(hex) = token.strip_prefix("0x") {
        return c_ulong::from_str_radix(hex, 16)
            .ok()
            .map(MsFlags::from_bits_retain);
    }

    OPTIONS.iter().find_map(|&(flag, name, rec)| {
        if token == name {
            Some(flag)
        } else if rec == Rec::Prefixed && token.strip_prefix('r') == Some(name) {
            Some(flag | MsFlags::MS_REC)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flags() {
        assert_eq!(flags_to_tokens(MsFlags::empty()), "");
    }

    #[test]
    #[allow(deprecated)]
    fn single_flags() {
        let cases = [
            (MsFlags::MS_RDONLY, "ro"),
            (MsFlags::MS_NOSUID, "nosuid"),
            (MsFlags::MS_NODEV, "nodev"),
            (MsFlags::MS_NOEXEC, "noexec"),
            (MsFlags::MS_SYNCHRONOUS, "sync"),
            (MsFlags::MS_REMOUNT, "remount"),
            (MsFlags::MS_MANDLOCK, "mand"),
            (MsFlags::MS_DIRSYNC, "dirsync"),
            (MsFlags::MS_NOATIME, "noatime"),
            (MsFlags::MS_NODIRATIME, "nodiratime"),
            (MsFlags::MS_BIND, "bind"),
            (MsFlags::MS_MOVE, "move"),
            (MsFlags::MS_SILENT, "silent"),
            (MsFlags::MS_POSIXACL, "acl"),
            (MsFlags::MS_UNBINDABLE, "unbindable"),
            (MsFlags::MS_PRIVATE, "private"),
            (MsFlags::MS_SLAVE, "slave"),
            (MsFlags::MS_SHARED, "shared"),
            (MsFlags::MS_RELATIME, "relatime"),
            (MsFlags::MS_KERNMOUNT, "kernmount"),
            (MsFlags::MS_I_VERSION, "iversion"),
            (MsFlags::MS_STRICTATIME, "strictatime"),
            (MsFlags::MS_LAZYTIME, "lazytime"),
            (MsFlags::MS_ACTIVE, "active"),
            (MsFlags::MS_NOUSER, "nouser"),
        ];
        for (flags, expected) in cases {
            assert_eq!(flags_to_tokens(flags), expected);
        }
    }

    #[test]
    fn recursive_prefix() {
        let rec = MsFlags::MS_REC;
        assert_eq!(flags_to_tokens(rec | MsFlags::MS_BIND), "rbind");
        assert_eq!(flags_to_tokens(rec | MsFlags::MS_UNBINDABLE), "runbindable");
        assert_eq!(flags_to_tokens(rec | MsFlags::MS_PRIVATE), "rprivate");
        assert_eq!(flags_to_tokens(rec | MsFlags::MS_SLAVE), "rslave");
        assert_eq!(flags_to_tokens(rec | MsFlags::MS_SHARED), "rshared");
    }

    #[test]
    fn lone_recursive_bit_is_unknown() {
        assert_eq!(flags_to_tokens(MsFlags::MS_REC), "0x4000");
        assert_eq!(
            flags_to_tokens(MsFlags::MS_REC | MsFlags::MS_RDONLY),
            "ro,0x4000"
        );
    }

    #[test]
    fn unknown_bits() {
        assert_eq!(flags_to_tokens(MsFlags::from_bits_retain(0x300)), "0x300");
        assert_eq!(
            flags_to_tokens(MsFlags::from_bits_retain(0x300) | MsFlags::MS_NOEXEC),
            "noexec,0x300"
        );
    }

    #[test]
    fn composition_follows_table_order() {
        let flags = MsFlags::MS_BIND | MsFlags::MS_NOEXEC | MsFlags::MS_RDONLY;
        assert_eq!(flags_to_tokens(flags), "ro,noexec,bind");
    }

    #[test]
    fn parse_tokens() {
        assert_eq!(token_to_flags("ro"), Some(MsFlags::MS_RDONLY));
        assert_eq!(
            token_to_flags("rbind"),
            Some(MsFlags::MS_BIND | MsFlags::MS_REC)
        );
        assert_eq!(
            token_to_flags("rshared"),
            Some(MsFlags::MS_SHARED | MsFlags::MS_REC)
        );
        assert_eq!(
            token_to_flags("0x300"),
            Some(MsFlags::from_bits_retain(0x300))
        );
        assert_eq!(token_to_flags("rnoexec"), None);
        assert_eq!(token_to_flags("mode=0755"), None);
        assert_eq!(token_to_flags("0xzz"), None);
    }
}
