//! Blocking procfs, sysfs and syscall reads, taken together on the blocking
//! pool so a stuck filesystem never parks a runtime worker.

use telemon_types::{DiskIoTotals, DiskUsage, InterfaceDetail, NetIoTotals, SystemInfo};
use tracing::warn;

use crate::cpu::{self, CpuTopology};
use crate::paths::HostPaths;
use crate::{disk, diskio, interfaces, network, system};

#[derive(Clone, Debug, Default)]
pub struct HostReadings {
    pub topology: CpuTopology,
    pub disks: Vec<DiskUsage>,
    pub network_totals: Option<NetIoTotals>,
    pub disk_io_totals: Option<DiskIoTotals>,
    pub system_info: SystemInfo,
    pub interfaces: Vec<InterfaceDetail>,
    pub connections_count: Option<u64>,
}

pub fn read_blocking(paths: &HostPaths) -> HostReadings {
    let addresses = interfaces::collect_addresses();

    HostReadings {
        topology: cpu::topology(paths),
        // statvfs can hang on a dead network mount.
        disks: disk::collect(paths),
        network_totals: network::collect_totals(paths),
        disk_io_totals: diskio::collect_totals(paths),
        system_info: system::collect(paths, interfaces::ip_addresses(&addresses)),
        interfaces: interfaces::collect(paths, &addresses),
        connections_count: network::connections_count(paths),
    }
}

pub async fn read(paths: HostPaths) -> HostReadings {
    match tokio::task::spawn_blocking(move || read_blocking(&paths)).await {
        Ok(readings) => readings,
        Err(e) => {
            warn!("host readings task failed: {e}");
            HostReadings::default()
        }
    }
}
