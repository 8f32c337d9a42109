use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate network byte counters, summed over every interface.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InterfaceCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
}

/// One set of cumulative counter readings taken at a single instant.
///
/// `timestamp` is wall-clock seconds. The aggregate network and disk parts are
/// optional because each is read independently and may be unavailable for a
/// given poll; a failed per-interface read leaves the map empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSample {
    pub timestamp: f64,
    pub net_total: Option<NetTotals>,
    pub net_per_interface: BTreeMap<String, InterfaceCounters>,
    pub disk_total: Option<DiskCounters>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetRates {
    pub bytes_sent_per_sec: f64,
    pub bytes_recv_per_sec: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InterfaceRates {
    pub bytes_sent_per_sec: f64,
    pub bytes_recv_per_sec: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskIoRates {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_count: Option<u64>,
    pub write_count: Option<u64>,
}

/// Per-second rates derived from two successive [`RawSample`]s.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RateResult {
    pub net: NetRates,
    pub per_interface: BTreeMap<String, InterfaceRates>,
    pub disk: DiskIoRates,
}
