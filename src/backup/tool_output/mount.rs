/// How a device currently sits on a mount point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountStatus {
    NotMounted,
    MountedReadWrite,
    /// Mounted, but writes would fail until it is remounted read-write.
    MountedReadOnly,
}

/// Looks up `device` on `destination` in the listing printed by `mount`
/// without arguments, rows shaped `<dev> on <dir> type <fs> (<opts>)`.
/// `mount` prints directories without a trailing slash.
pub fn parse_mount_status(device: &str, destination: &str, output: &str) -> MountStatus {
    let destination = match destination.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    output
        .lines()
        .find_map(|line| {
            let rest = line.strip_prefix(device)?.strip_prefix(" on ")?;
            let rest = rest.strip_prefix(destination)?.strip_prefix(" type ")?;
            let (_fs_type, options) = rest.split_once(' ')?;
            let options = options.trim().strip_prefix('(')?.strip_suffix(')')?;
            Some(if options.split(',').any(|o| o == "ro") {
                MountStatus::MountedReadOnly
            } else {
                MountStatus::MountedReadWrite
            })
        })
        .unwrap_or(MountStatus::NotMounted)
}
