//! Battery state from `/sys/class/power_supply`.

use std::path::{Path, PathBuf};

use telemon_types::BatteryStatus;
use tracing::debug;

use crate::error::{read_file_async, ProviderError, Result};
use crate::paths::HostPaths;

pub async fn collect(paths: &HostPaths) -> BatteryStatus {
    match read_battery(paths).await {
        Ok(Some(status)) => status,
        Ok(None) => BatteryStatus::absent(),
        Err(e) => {
            debug!("battery unavailable: {e}");
            BatteryStatus::absent()
        }
    }
}

async fn read_attr(dir: &Path, name: &str) -> Option<String> {
    read_file_async(dir.join(name))
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

async fn read_number(dir: &Path, name: &str) -> Option<u64> {
    read_attr(dir, name).await?.parse().ok()
}

async fn supplies(paths: &HostPaths) -> Result<Vec<PathBuf>> {
    let root = paths.sys("class/power_supply");
    let mut entries = tokio::fs::read_dir(&root)
        .await
        .map_err(|source| ProviderError::Io {
            path: root.clone(),
            source,
        })?;

    let mut dirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        dirs.push(entry.path());
    }
    dirs.sort();
    Ok(dirs)
}

async fn read_battery(paths: &HostPaths) -> Result<Option<BatteryStatus>> {
    let dirs = supplies(paths).await?;

    let mut battery: Option<PathBuf> = None;
    let mut mainsOnline: Option<bool> = None;
    for dir in dirs {
        match read_attr(&dir, "type").await.as_deref() {
            Some("Battery") if battery.is_none() => battery = Some(dir),
            Some("Mains") => {
                if let Some(online) = read_number(&dir, "online").await {
                    mainsOnline = Some(mainsOnline.unwrap_or(false) || online == 1);
                }
            }
            _ => {}
        }
    }

    let Some(dir) = battery else {
        return Ok(None);
    };

    let readings = BatteryReadings {
        capacity: read_number(&dir, "capacity").await,
        status: read_attr(&dir, "status").await,
        energy_now: read_number(&dir, "energy_now").await,
        energy_full: read_number(&dir, "energy_full").await,
        power_now: read_number(&dir, "power_now").await,
        charge_now: read_number(&dir, "charge_now").await,
        charge_full: read_number(&dir, "charge_full").await,
        current_now: read_number(&dir, "current_now").await,
        mains_online: mainsOnline,
    };
    Ok(Some(readings.status()))
}

/// Raw sysfs attributes of one battery. Energy is in µWh and power in µW;
/// charge is in µAh and current in µA.
#[derive(Clone, Debug, Default)]
pub struct BatteryReadings {
    pub capacity: Option<u64>,
    pub status: Option<String>,
    pub energy_now: Option<u64>,
    pub energy_full: Option<u64>,
    pub power_now: Option<u64>,
    pub charge_now: Option<u64>,
    pub charge_full: Option<u64>,
    pub current_now: Option<u64>,
    pub mains_online: Option<bool>,
}

impl BatteryReadings {
    pub fn status(&self) -> BatteryStatus {
        let percent = self.capacity.map(|c| c.min(100) as f64).or_else(|| {
            let (now, full) = match (self.energy_now, self.energy_full) {
                (Some(now), Some(full)) => (now, full),
                _ => (self.charge_now?, self.charge_full?),
            };
            (full > 0).then(|| (now as f64 / full as f64 * 100.0).min(100.0))
        });

        let powerPlugged = match self.status.as_deref() {
            Some("Charging") | Some("Full") => Some(true),
            Some("Discharging") => Some(false),
            _ => self.mains_online,
        };

        // Time left is only meaningful while running on battery.
        let secsleft = if powerPlugged == Some(false) {
            self.seconds_left()
        } else {
            None
        };

        BatteryStatus {
            present: true,
            percent,
            secsleft,
            power_plugged: powerPlugged,
        }
    }

    fn seconds_left(&self) -> Option<u64> {
        let (remaining, drain) = match (self.energy_now, self.power_now) {
            (Some(energy), Some(power)) => (energy, power),
            _ => (self.charge_now?, self.current_now?),
        };
        if drain == 0 {
            return None;
        }
        Some((remaining as f64 / drain as f64 * 3600.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discharging_battery_reports_time_left() {
        let readings = BatteryReadings {
            capacity: Some(80),
            status: Some("Discharging".into()),
            energy_now: Some(40_000_000),
            power_now: Some(10_000_000),
            ..Default::default()
        };
        let status = readings.status();
        assert!(status.present);
        assert_eq!(status.percent, Some(80.0));
        assert_eq!(status.power_plugged, Some(false));
        assert_eq!(status.secsleft, Some(4 * 3600));
    }

    #[test]
    fn test_charging_battery_has_no_time_left() {
        let readings = BatteryReadings {
            status: Some("Charging".into()),
            charge_now: Some(1_500_000),
            charge_full: Some(3_000_000),
            current_now: Some(500_000),
            ..Default::default()
        };
        let status = readings.status();
        assert_eq!(status.percent, Some(50.0));
        assert_eq!(status.power_plugged, Some(true));
        assert_eq!(status.secsleft, None);
    }

    #[test]
    fn test_unknown_status_falls_back_to_mains() {
        let readings = BatteryReadings {
            capacity: Some(100),
            status: Some("Unknown".into()),
            mains_online: Some(true),
            ..Default::default()
        };
        assert_eq!(readings.status().power_plugged, Some(true));
    }

    #[test]
    fn test_zero_drain_has_no_time_left() {
        let readings = BatteryReadings {
            status: Some("Discharging".into()),
            energy_now: Some(1),
            power_now: Some(0),
            ..Default::default()
        };
        assert_eq!(readings.status().secsleft, None);
    }

    fn write_supply(root: &Path, name: &str, attrs: &[(&str, &str)]) {
        let dir = root.join("sys/class/power_supply").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            std::fs::write(dir.join(attr), format!("{value}\n")).unwrap();
        }
    }

    #[tokio::test]
    async fn test_collect_from_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("type", "Mains"), ("online", "0")]);
        write_supply(
            dir.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("capacity", "55"),
                ("status", "Discharging"),
                ("energy_now", "20000000"),
                ("power_now", "5000000"),
            ],
        );

        let status = collect(&HostPaths::under(dir.path())).await;
        assert!(status.present);
        assert_eq!(status.percent, Some(55.0));
        assert_eq!(status.secsleft, Some(4 * 3600));
        assert_eq!(status.power_plugged, Some(false));
    }

    #[tokio::test]
    async fn test_collect_without_battery() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("type", "Mains"), ("online", "1")]);
        assert_eq!(
            collect(&HostPaths::under(dir.path())).await,
            BatteryStatus::absent()
        );

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(
            collect(&HostPaths::under(empty.path())).await,
            BatteryStatus::absent()
        );
    }
}
