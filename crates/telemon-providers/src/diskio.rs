//! Disk I/O counters from `/proc/diskstats`.

use std::collections::BTreeSet;

use telemon_types::{DiskCounters, DiskIoTotals};
use tracing::{debug, warn};

use crate::error::{read_file, ProviderError, Result};
use crate::paths::HostPaths;

const SECTOR_SIZE: u64 = 512;

/// Parses `/proc/diskstats` and sums the rows accepted by `include`.
///
/// Fields: major minor name reads_completed reads_merged sectors_read
/// time_reading writes_completed writes_merged sectors_written time_writing ...
pub fn parse_diskstats(contents: &str, include: impl Fn(&str) -> bool) -> DiskIoTotals {
    let mut totals = DiskIoTotals::default();

    for line in contents.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 11 || !include(parts[2]) {
            continue;
        }

        let field = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
        totals.read_count += field(3);
        totals.read_bytes += field(5) * SECTOR_SIZE;
        totals.read_time += field(6);
        totals.write_count += field(7);
        totals.write_bytes += field(9) * SECTOR_SIZE;
        totals.write_time += field(10);
    }

    totals
}

/// Names under `/sys/block`, i.e. whole disks without their partitions.
fn whole_disks(paths: &HostPaths) -> Option<BTreeSet<String>> {
    let entries = std::fs::read_dir(paths.sys("block")).ok()?;
    let names: BTreeSet<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Reads the disk totals, counting each whole disk once.
///
/// Partitions would double count their parent disk, so only `/sys/block`
/// names are summed. When sysfs is not readable every row is used.
pub fn read_totals(paths: &HostPaths) -> Result<DiskIoTotals> {
    let contents = read_file(paths.proc("diskstats"))?;
    if contents.trim().is_empty() {
        return Err(ProviderError::Unavailable("/proc/diskstats".into()));
    }

    let totals = match whole_disks(paths) {
        Some(disks) => parse_diskstats(&contents, |name| disks.contains(name)),
        None => {
            debug!("/sys/block unreadable, summing every diskstats row");
            parse_diskstats(&contents, |_| true)
        }
    };
    Ok(totals)
}

pub fn counters(totals: &DiskIoTotals) -> DiskCounters {
    DiskCounters {
        read_bytes: totals.read_bytes,
        write_bytes: totals.write_bytes,
        read_count: totals.read_count,
        write_count: totals.write_count,
    }
}

/// Totals for the response's `disk_io_totals` section.
pub fn collect_totals(paths: &HostPaths) -> Option<DiskIoTotals> {
    match read_totals(paths) {
        Ok(totals) => Some(totals),
        Err(e) => {
            warn!("disk I/O totals unavailable: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISKSTATS: &str = "\
 259       0 nvme0n1 1000 10 20000 300 500 5 8000 150 0 400 450 0 0 0 0
 259       1 nvme0n1p1 900 10 18000 280 450 5 7000 140 0 380 420 0 0 0 0
   8       0 sda 10 0 100 5 20 0 400 9 0 12 14 0 0 0 0
   7       0 loop0 1 0 2 0 0 0 0 0 0 0 0
";

    #[test]
    fn test_parse_diskstats_filters_partitions() {
        let disks = ["nvme0n1", "sda"];
        let totals = parse_diskstats(DISKSTATS, |name| disks.contains(&name));
        assert_eq!(totals.read_count, 1010);
        assert_eq!(totals.write_count, 520);
        assert_eq!(totals.read_bytes, (20000 + 100) * 512);
        assert_eq!(totals.write_bytes, (8000 + 400) * 512);
        assert_eq!(totals.read_time, 305);
        assert_eq!(totals.write_time, 159);
    }

    #[test]
    fn test_parse_diskstats_skips_short_lines() {
        let totals = parse_diskstats("8 0 sda 1 2\n", |_| true);
        assert_eq!(totals, DiskIoTotals::default());
    }

    #[test]
    fn test_read_totals_uses_sys_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proc")).unwrap();
        std::fs::create_dir_all(dir.path().join("sys/block/sda")).unwrap();
        std::fs::write(dir.path().join("proc/diskstats"), DISKSTATS).unwrap();

        let totals = read_totals(&HostPaths::under(dir.path())).unwrap();
        assert_eq!(totals.read_count, 10);
        assert_eq!(counters(&totals).write_bytes, 400 * 512);
    }

    #[test]
    fn test_read_totals_without_sysfs_sums_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proc")).unwrap();
        std::fs::write(dir.path().join("proc/diskstats"), DISKSTATS).unwrap();

        let totals = read_totals(&HostPaths::under(dir.path())).unwrap();
        assert_eq!(totals.read_count, 1000 + 900 + 10 + 1);
    }

    #[test]
    fn test_collect_totals_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(collect_totals(&HostPaths::under(dir.path())), None);
    }
}
