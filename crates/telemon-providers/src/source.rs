//! Cumulative counter source feeding the rate engine.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use telemon_types::{DiskCounters, InterfaceCounters, NetTotals, RawSample};
use tracing::debug;

use crate::error::Result;
use crate::paths::HostPaths;
use crate::{diskio, network};

/// Supplies the cumulative counters the rate engine turns into rates.
///
/// Each read may fail on its own; a failure only makes that value unavailable
/// for the current poll.
pub trait CounterSource: Send + Sync {
    fn read_network_totals(&self) -> Result<NetTotals>;

    fn read_network_per_interface(&self) -> Result<BTreeMap<String, InterfaceCounters>>;

    fn read_disk_io(&self) -> Result<DiskCounters>;

    /// Wall-clock seconds.
    fn now(&self) -> f64;

    /// Takes one [`RawSample`], degrading failed reads to absent values.
    fn sample(&self) -> RawSample {
        let timestamp = self.now();

        let net_total = self
            .read_network_totals()
            .inspect_err(|e| debug!("network totals unavailable for this poll: {e}"))
            .ok();
        let net_per_interface = self
            .read_network_per_interface()
            .inspect_err(|e| debug!("per-interface counters unavailable for this poll: {e}"))
            .unwrap_or_default();
        let disk_total = self
            .read_disk_io()
            .inspect_err(|e| debug!("disk counters unavailable for this poll: {e}"))
            .ok();

        RawSample {
            timestamp,
            net_total,
            net_per_interface,
            disk_total,
        }
    }
}

/// Reads counters from procfs.
#[derive(Clone, Debug, Default)]
pub struct ProcCounterSource {
    paths: HostPaths,
}

impl ProcCounterSource {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

fn byte_totals(interfaces: &BTreeMap<String, network::NetDevCounters>) -> NetTotals {
    network::byte_totals(&network::sum_totals(interfaces))
}

fn per_interface(
    interfaces: BTreeMap<String, network::NetDevCounters>,
) -> BTreeMap<String, InterfaceCounters> {
    interfaces
        .into_iter()
        .map(|(name, c)| (name, c.interface_counters()))
        .collect()
}

impl CounterSource for ProcCounterSource {
    fn read_network_totals(&self) -> Result<NetTotals> {
        Ok(byte_totals(&network::read_net_dev(&self.paths)?))
    }

    fn read_network_per_interface(&self) -> Result<BTreeMap<String, InterfaceCounters>> {
        Ok(per_interface(network::read_net_dev(&self.paths)?))
    }

    fn read_disk_io(&self) -> Result<DiskCounters> {
        let totals = diskio::read_totals(&self.paths)?;
        Ok(diskio::counters(&totals))
    }

    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Reads `/proc/net/dev` once so the aggregate and per-interface counters
    /// describe the same instant.
    fn sample(&self) -> RawSample {
        let timestamp = self.now();

        let (net_total, net_per_interface) = match network::read_net_dev(&self.paths) {
            Ok(interfaces) => (Some(byte_totals(&interfaces)), per_interface(interfaces)),
            Err(e) => {
                debug!("network counters unavailable for this poll: {e}");
                (None, BTreeMap::new())
            }
        };
        let disk_total = self
            .read_disk_io()
            .inspect_err(|e| debug!("disk counters unavailable for this poll: {e}"))
            .ok();

        RawSample {
            timestamp,
            net_total,
            net_per_interface,
            disk_total,
        }
    }
}
