//! Renders mount operations as the equivalent `mount(8)` and `umount(8)`
//! command lines.
//!
//! The output is meant for operators reading logs; nothing executes it.

use nix::mount::{MntFlags, MsFlags};

use crate::{entry::NONE, opts};

/// Propagation changes, in the order `mount(8)` documents them.
const PROPAGATION: &[(MsFlags, &str)] = &[
    (MsFlags::MS_SHARED, "shared"),
    (MsFlags::MS_SLAVE, "slave"),
    (MsFlags::MS_PRIVATE, "private"),
    (MsFlags::MS_UNBINDABLE, "unbindable"),
];

/// Returns the command line equivalent to
/// `mount(source, target, fs_type, flags, data)`.
pub fn mount_cmd(
    source: &str,
    target: &str,
    fs_type: Option<&str>,
    flags: MsFlags,
    data: Option<&str>,
) -> String {
    let recursive = if flags.contains(MsFlags::MS_REC) { "r" } else { "" };
    let fs_type = fs_type.filter(|t| !t.is_empty() && *t != NONE);

    if flags.contains(MsFlags::MS_MOVE) {
        return format!("mount --move {source} {target}");
    }

    if target == NONE {
        let mut modes = PROPAGATION.iter().filter(|(flag, _)| flags.contains(*flag));
        if let (Some((_, mode)), None) = (modes.next(), modes.next()) {
            return format!("mount --make-{recursive}{mode} {source}");
        }
    }

    if flags.contains(MsFlags::MS_BIND) && fs_type.is_none() {
        return format!("mount --{recursive}bind {source} {target}");
    }

    let mut cmd = String::from("mount");
    if let Some(fs_type) = fs_type {
        cmd.push_str(" -t ");
        cmd.push_str(fs_type);
    }

    let options = [opts::flags_to_tokens(flags), data.unwrap_or_default().to_string()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if !options.is_empty() {
        cmd.push_str(" -o ");
        cmd.push_str(&options);
    }

    format!("{cmd} {source} {target}")
}

/// Returns the command line equivalent to `umount2(target, flags)`.
///
/// `MNT_EXPIRE` and `UMOUNT_NOFOLLOW` have no command line spelling.
pub fn umount_cmd(target: &str, flags: MntFlags) -> String {
    let mut cmd = String::from("umount");
    if flags.contains(MntFlags::MNT_FORCE) {
        cmd.push_str(" --force");
    }
    if flags.contains(MntFlags::MNT_DETACH) {
        cmd.push_str(" --lazy");
    }
    format!("{cmd} {target}")
}
