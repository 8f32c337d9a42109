use telemon_types::MemoryMetrics;
use tracing::{debug, warn};

use crate::error::{read_file_async, ProviderError, Result};
use crate::paths::HostPaths;

const KB_TO_BYTES: u64 = 1024;

pub async fn collect(paths: &HostPaths) -> Option<MemoryMetrics> {
    match read_proc_meminfo(paths).await {
        Ok(mut metrics) => {
            metrics.page_faults = read_page_faults(paths).await;
            Some(metrics)
        }
        Err(e) => {
            warn!("/proc/meminfo unavailable, memory section is null: {e}");
            None
        }
    }
}

async fn read_proc_meminfo(paths: &HostPaths) -> Result<MemoryMetrics> {
    let contents = read_file_async(paths.proc("meminfo")).await?;
    parse_meminfo(&contents)
}

pub fn parse_meminfo(contents: &str) -> Result<MemoryMetrics> {
    let mut memTotalKb: Option<u64> = None;
    let mut memAvailableKb: Option<u64> = None;
    let mut memFreeKb: u64 = 0;
    let mut swapTotalKb: u64 = 0;
    let mut swapFreeKb: u64 = 0;

    for line in contents.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let valueKb = parts[1].parse::<u64>().unwrap_or(0);

        match parts[0] {
            "MemTotal:" => memTotalKb = Some(valueKb),
            "MemAvailable:" => memAvailableKb = Some(valueKb),
            "MemFree:" => memFreeKb = valueKb,
            "SwapTotal:" => swapTotalKb = valueKb,
            "SwapFree:" => swapFreeKb = valueKb,
            _ => {}
        }
    }

    let totalKb = memTotalKb
        .filter(|kb| *kb > 0)
        .ok_or_else(|| ProviderError::parse("/proc/meminfo", "missing MemTotal"))?;
    // Kernels before 3.14 lack MemAvailable.
    let availableKb = memAvailableKb.unwrap_or(memFreeKb).min(totalKb);

    let totalBytes = totalKb * KB_TO_BYTES;
    let availableBytes = availableKb * KB_TO_BYTES;
    let swapTotalBytes = swapTotalKb * KB_TO_BYTES;
    let swapUsedBytes = swapTotalBytes.saturating_sub(swapFreeKb * KB_TO_BYTES);

    Ok(MemoryMetrics {
        virtual_percent: percent(totalBytes - availableBytes, totalBytes),
        virtual_total: totalBytes,
        virtual_available: availableBytes,
        swap_percent: percent(swapUsedBytes, swapTotalBytes),
        swap_total: swapTotalBytes,
        page_faults: None,
    })
}

async fn read_page_faults(paths: &HostPaths) -> Option<u64> {
    match read_file_async(paths.proc("vmstat")).await {
        Ok(contents) => parse_vmstat_pgfault(&contents),
        Err(e) => {
            debug!("page fault counter unavailable: {e}");
            None
        }
    }
}

/// Cumulative page faults since boot (`pgfault` in `/proc/vmstat`).
pub fn parse_vmstat_pgfault(contents: &str) -> Option<u64> {
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once(' ')?;
        if key != "pgfault" {
            return None;
        }
        value.trim().parse().ok()
    })
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 1000.0).round() / 10.0
}
