use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::counters::{DiskIoRates, InterfaceRates, NetRates};

/// Full response for one telemetry poll.
///
/// Every field is always present; sections whose subsystem could not be read
/// are `null` or empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySnapshot {
    pub cpu: CpuMetrics,
    pub memory: Option<MemoryMetrics>,
    pub disks: Vec<DiskUsage>,
    pub network_totals: Option<NetIoTotals>,
    pub network_speeds: NetRates,
    pub per_nic_speeds: BTreeMap<String, InterfaceRates>,
    pub disk_io_speeds: DiskIoRates,
    pub disk_io_totals: Option<DiskIoTotals>,
    pub gpu: Vec<GpuInfo>,
    pub system_info: SystemInfo,
    pub interfaces: Vec<InterfaceDetail>,
    pub battery: BatteryStatus,
    pub top_processes_cpu: Vec<ProcessEntry>,
    pub top_processes_mem: Vec<ProcessEntry>,
    pub page_faults_total: Option<u64>,
    pub uptime_boot_time: Option<String>,
    pub timestamp: String,
    pub connections_count: Option<u64>,
    pub message: Option<String>,
}

/// How the per-core CPU percentages were obtained.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CpuSampling {
    #[default]
    Measured,
    /// Synthetic placeholder values substituted because the measured reading
    /// was all zero or could not be taken. Not real telemetry.
    Fallback,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CpuMetrics {
    pub cpu_percent: f64,
    pub cpu_count_logical: usize,
    pub cpu_count_physical: Option<usize>,
    pub per_cpu: Vec<f64>,
    pub load_avg: Option<LoadAverage>,
    pub sampling: CpuSampling,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadAverage {
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "5")]
    pub five: f64,
    #[serde(rename = "15")]
    pub fifteen: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryMetrics {
    pub virtual_percent: f64,
    pub virtual_total: u64,
    pub virtual_available: u64,
    pub swap_percent: f64,
    pub swap_total: u64,
    pub page_faults: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub percent: f64,
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetIoTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskIoTotals {
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Milliseconds spent reading.
    pub read_time: u64,
    /// Milliseconds spent writing.
    pub write_time: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GpuInfo {
    pub id: u32,
    pub name: String,
    pub load: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_free: u64,
    pub memory_util_percent: f64,
    pub temperature: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub hostname: String,
    pub ip_addresses: Vec<IpAddressEntry>,
    pub system: String,
    pub platform: String,
    pub processor: String,
    pub architecture: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            hostname: "unknown".into(),
            ip_addresses: Vec::new(),
            system: String::new(),
            platform: String::new(),
            processor: String::new(),
            architecture: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IpAddressEntry {
    pub iface: String,
    pub address: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InterfaceDetail {
    pub iface: String,
    pub ips: Vec<String>,
    pub mac: Option<String>,
    pub is_up: Option<bool>,
    /// Link speed in Mb/s.
    pub speed: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BatteryStatus {
    pub present: bool,
    pub percent: Option<f64>,
    pub secsleft: Option<u64>,
    pub power_plugged: Option<bool>,
}

impl BatteryStatus {
    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub username: Option<String>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub cmdline: Vec<String>,
    pub page_faults: Option<u64>,
}
