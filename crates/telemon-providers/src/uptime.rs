use chrono::{DateTime, Local, Utc};
use tracing::warn;

use crate::error::{read_file_async, ProviderError, Result};
use crate::paths::HostPaths;

/// Boot time as a local ISO-8601 timestamp, `None` when unknown.
pub async fn boot_time(paths: &HostPaths) -> Option<String> {
    match read_boot_epoch(paths).await {
        Ok(epoch) => format_local(epoch),
        Err(e) => {
            warn!("boot time unavailable: {e}");
            None
        }
    }
}

async fn read_boot_epoch(paths: &HostPaths) -> Result<i64> {
    if let Ok(stat) = read_file_async(paths.proc("stat")).await {
        if let Some(btime) = parse_btime(&stat) {
            return Ok(btime);
        }
    }

    let contents = read_file_async(paths.proc("uptime")).await?;
    let uptimeSeconds = parse_uptime(&contents)?;
    Ok(Utc::now().timestamp() - uptimeSeconds as i64)
}

/// `btime` line of `/proc/stat`: boot time in seconds since the epoch.
pub fn parse_btime(stat: &str) -> Option<i64> {
    stat.lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|value| value.trim().parse().ok())
}

pub fn parse_uptime(contents: &str) -> Result<f64> {
    let firstField = contents
        .split_whitespace()
        .next()
        .ok_or_else(|| ProviderError::parse("/proc/uptime", "empty"))?;

    firstField
        .parse::<f64>()
        .map_err(|e| ProviderError::parse("/proc/uptime", e.to_string()))
}

pub fn format_local(epoch: i64) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp(epoch, 0)?;
    Some(
        utc.with_timezone(&Local)
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
    )
}

/// Current UTC time with microseconds and no offset suffix.
pub fn utc_timestamp() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
