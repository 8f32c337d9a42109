use std::collections::BTreeSet;
use std::path::Path;

use telemon_types::DiskUsage;
use tracing::{debug, warn};

use crate::error::{read_file, Result};
use crate::paths::HostPaths;

/// A mounted block-device partition from `/proc/mounts`.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

/// Usage of every mounted physical partition. A partition whose `statvfs`
/// fails is skipped; an unreadable mount table yields an empty list.
pub fn collect(paths: &HostPaths) -> Vec<DiskUsage> {
    let partitions = match read_partitions(paths) {
        Ok(partitions) => partitions,
        Err(e) => {
            warn!("mount table unavailable, disks section is empty: {e}");
            return Vec::new();
        }
    };

    partitions
        .into_iter()
        .filter_map(|partition| match usage(&partition) {
            Ok(usage) => Some(usage),
            Err(e) => {
                debug!("skipping {}: {e}", partition.mountpoint);
                None
            }
        })
        .collect()
}

pub fn read_partitions(paths: &HostPaths) -> Result<Vec<Partition>> {
    let contents = read_file(paths.proc("mounts"))?;
    Ok(parse_mounts(&contents))
}

/// Keeps `/dev/*` mounts only, first mount per mountpoint wins.
pub fn parse_mounts(contents: &str) -> Vec<Partition> {
    let mut seen = BTreeSet::new();
    let mut partitions = Vec::new();

    for line in contents.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 || !parts[0].starts_with("/dev/") {
            continue;
        }
        let mountpoint = unescape_mount_path(parts[1]);
        if !seen.insert(mountpoint.clone()) {
            continue;
        }
        partitions.push(Partition {
            device: parts[0].to_string(),
            mountpoint,
            fstype: parts[2].to_string(),
        });
    }

    partitions
}

/// `/proc/mounts` escapes spaces, tabs, newlines and backslashes as octal.
fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

fn usage(partition: &Partition) -> Result<DiskUsage> {
    let stat = nix::sys::statvfs::statvfs(Path::new(&partition.mountpoint))?;

    let fragmentSize = stat.fragment_size() as u64;
    let totalBytes = stat.blocks() as u64 * fragmentSize;
    let freeBytes = stat.blocks_free() as u64 * fragmentSize;
    let availableBytes = stat.blocks_available() as u64 * fragmentSize;
    let usedBytes = totalBytes.saturating_sub(freeBytes);

    Ok(DiskUsage {
        device: partition.device.clone(),
        mountpoint: partition.mountpoint.clone(),
        fstype: partition.fstype.clone(),
        percent: usage_percent(usedBytes, availableBytes),
        total: totalBytes,
        free: availableBytes,
        used: usedBytes,
    })
}

/// Used share of the space available to unprivileged users, so reserved
/// blocks do not count as free.
fn usage_percent(used: u64, available: u64) -> f64 {
    let denominator = used + available;
    if denominator == 0 {
        return 0.0;
    }
    ((used as f64 / denominator as f64) * 1000.0).round() / 10.0
}
