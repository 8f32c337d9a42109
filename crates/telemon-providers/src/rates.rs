//! Rate engine: turns successive counter samples into per-second rates.
//!
//! The only state kept between polls is the previous [`RawSample`], owned by
//! a [`SnapshotStore`]. A poll holds the store's lock for the whole
//! sample-compute-write sequence, so two concurrent polls never interleave,
//! never observe a half-replaced sample, and install samples in the order
//! they were taken.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use telemon_types::{DiskIoRates, InterfaceRates, NetRates, RateResult, RawSample};
use tracing::debug;

use crate::source::CounterSource;

/// Floor applied to the elapsed time between two samples, in seconds.
pub const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Holds exactly one previous sample.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    previous: Mutex<Option<RawSample>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the previous sample, `None` before the first poll.
    pub fn get(&self) -> Option<RawSample> {
        self.lock().clone()
    }

    pub fn set(&self, sample: RawSample) {
        *self.lock() = Some(sample);
    }

    /// Runs `f` against the previous sample, then installs `current` in its
    /// place. Both happen under a single lock acquisition.
    pub fn exchange<R>(
        &self,
        current: RawSample,
        f: impl FnOnce(Option<&RawSample>, &RawSample) -> R,
    ) -> R {
        self.exchange_with(|| current, f)
    }

    /// Like [`exchange`](Self::exchange), but takes the current sample while
    /// holding the lock. Concurrent callers are serialized from sampling
    /// onwards, so the stored sample never goes back in time.
    pub fn exchange_with<R>(
        &self,
        take: impl FnOnce() -> RawSample,
        f: impl FnOnce(Option<&RawSample>, &RawSample) -> R,
    ) -> R {
        let mut guard = self.lock();
        let current = take();
        let result = f(guard.as_ref(), &current);
        *guard = Some(current);
        result
    }

    // A panic inside `exchange` leaves the old sample intact, so a poisoned
    // lock still guards a whole sample.
    fn lock(&self) -> MutexGuard<'_, Option<RawSample>> {
        self.previous.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Computes rates against the stored sample and replaces it.
#[derive(Debug, Default)]
pub struct RateEngine {
    store: SnapshotStore,
}

impl RateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn compute(&self, current: RawSample) -> RateResult {
        self.store.exchange(current, rates_against)
    }

    /// Samples `source` and computes rates in one critical section.
    pub fn poll(&self, source: &dyn CounterSource) -> RateResult {
        self.store.exchange_with(|| source.sample(), rates_against)
    }
}

fn rates_against(previous: Option<&RawSample>, current: &RawSample) -> RateResult {
    if previous.is_none() {
        debug!("no previous sample, reporting zero rates");
    }
    compute_rates(previous, current)
}

/// Pure rate computation between two samples.
///
/// Without a previous sample every rate is zero. Counter decreases are not
/// detected: a reset yields a negative rate. A value missing from either side
/// yields a zero rate for that metric.
pub fn compute_rates(previous: Option<&RawSample>, current: &RawSample) -> RateResult {
    let Some(previous) = previous else {
        return cold_start(current);
    };

    let elapsed = (current.timestamp - previous.timestamp).max(MIN_ELAPSED_SECS);

    let net = match (current.net_total, previous.net_total) {
        (Some(now), Some(before)) => NetRates {
            bytes_sent_per_sec: per_second(now.bytes_sent, before.bytes_sent, elapsed),
            bytes_recv_per_sec: per_second(now.bytes_recv, before.bytes_recv, elapsed),
        },
        _ => NetRates::default(),
    };

    let per_interface = current
        .net_per_interface
        .iter()
        .map(|(name, now)| {
            let rates = match previous.net_per_interface.get(name) {
                Some(before) => InterfaceRates {
                    bytes_sent_per_sec: per_second(now.bytes_sent, before.bytes_sent, elapsed),
                    bytes_recv_per_sec: per_second(now.bytes_recv, before.bytes_recv, elapsed),
                    packets_sent: now.packets_sent,
                    packets_recv: now.packets_recv,
                },
                None => idle_interface(now.packets_sent, now.packets_recv),
            };
            (name.clone(), rates)
        })
        .collect();

    let disk = match (current.disk_total, previous.disk_total) {
        (Some(now), Some(before)) => DiskIoRates {
            read_bytes_per_sec: per_second(now.read_bytes, before.read_bytes, elapsed),
            write_bytes_per_sec: per_second(now.write_bytes, before.write_bytes, elapsed),
            read_count: Some(now.read_count),
            write_count: Some(now.write_count),
        },
        _ => idle_disk(current),
    };

    RateResult {
        net,
        per_interface,
        disk,
    }
}

fn cold_start(current: &RawSample) -> RateResult {
    let per_interface: BTreeMap<String, InterfaceRates> = current
        .net_per_interface
        .iter()
        .map(|(name, c)| (name.clone(), idle_interface(c.packets_sent, c.packets_recv)))
        .collect();

    RateResult {
        net: NetRates::default(),
        per_interface,
        disk: idle_disk(current),
    }
}

fn idle_interface(packets_sent: u64, packets_recv: u64) -> InterfaceRates {
    InterfaceRates {
        bytes_sent_per_sec: 0.0,
        bytes_recv_per_sec: 0.0,
        packets_sent,
        packets_recv,
    }
}

fn idle_disk(current: &RawSample) -> DiskIoRates {
    DiskIoRates {
        read_bytes_per_sec: 0.0,
        write_bytes_per_sec: 0.0,
        read_count: current.disk_total.map(|d| d.read_count),
        write_count: current.disk_total.map(|d| d.write_count),
    }
}

fn per_second(now: u64, before: u64, elapsed: f64) -> f64 {
    (now as f64 - before as f64) / elapsed
}
