//! One full telemetry poll.

use std::sync::Arc;
use std::time::Duration;

use telemon_types::{RateResult, TelemetrySnapshot};
use tracing::{debug, warn};

use crate::paths::HostPaths;
use crate::rates::RateEngine;
use crate::source::{CounterSource, ProcCounterSource};
use crate::{battery, cpu, gpu, host, memory, processes, sampling, uptime};

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub paths: HostPaths,
    /// Length of the blocking CPU sampling window.
    pub cpu_sample: Duration,
    pub top_processes: usize,
    pub nvidia_smi: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            paths: HostPaths::default(),
            cpu_sample: Duration::from_millis(500),
            top_processes: 8,
            nvidia_smi: "nvidia-smi".into(),
        }
    }
}

/// Assembles snapshots. Owns the rate engine, and with it the only state
/// carried between polls.
pub struct Collector {
    config: CollectorConfig,
    source: Arc<dyn CounterSource>,
    engine: Arc<RateEngine>,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        let source = Arc::new(ProcCounterSource::new(config.paths.clone()));
        Self::with_source(config, source)
    }

    pub fn with_source(config: CollectorConfig, source: Arc<dyn CounterSource>) -> Self {
        Self {
            config,
            source,
            engine: Arc::new(RateEngine::new()),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn engine(&self) -> &RateEngine {
        &self.engine
    }

    /// Samples the counter source and runs it through the rate engine.
    /// Blocks on file reads.
    pub fn poll_rates(&self) -> RateResult {
        self.engine.poll(self.source.as_ref())
    }

    async fn rates(&self) -> RateResult {
        let engine = Arc::clone(&self.engine);
        let source = Arc::clone(&self.source);
        match tokio::task::spawn_blocking(move || engine.poll(source.as_ref())).await {
            Ok(rates) => rates,
            Err(e) => {
                warn!("rate poll task failed: {e}");
                RateResult::default()
            }
        }
    }

    pub async fn collect(&self) -> TelemetrySnapshot {
        let paths = &self.config.paths;

        let (
            window,
            hostReadings,
            rates,
            memoryResult,
            loadAvg,
            batteryResult,
            gpuResult,
            bootTime,
        ) = tokio::join!(
            sampling::run(paths.clone(), self.config.cpu_sample),
            host::read(paths.clone()),
            self.rates(),
            memory::collect(paths),
            cpu::load_average(paths),
            battery::collect(paths),
            gpu::collect(&self.config.nvidia_smi),
            uptime::boot_time(paths),
        );

        let cpuMetrics = cpu::build_metrics(
            window
                .cpu
                .as_ref()
                .map(|(before, after)| (before.as_slice(), after.as_slice())),
            &hostReadings.topology,
            loadAvg,
        );

        let processEntries =
            processes::build_entries(window.processes, window.total_memory, &window.page_faults);
        debug!("ranked {} processes", processEntries.len());

        TelemetrySnapshot {
            cpu: cpuMetrics,
            memory: memoryResult,
            disks: hostReadings.disks,
            network_totals: hostReadings.network_totals,
            network_speeds: rates.net,
            per_nic_speeds: rates.per_interface,
            disk_io_speeds: rates.disk,
            disk_io_totals: hostReadings.disk_io_totals,
            gpu: gpuResult,
            system_info: hostReadings.system_info,
            interfaces: hostReadings.interfaces,
            battery: batteryResult,
            top_processes_cpu: processes::top_by_cpu(&processEntries, self.config.top_processes),
            top_processes_mem: processes::top_by_memory(
                &processEntries,
                self.config.top_processes,
            ),
            page_faults_total: processes::page_faults_total(&processEntries),
            uptime_boot_time: bootTime,
            timestamp: uptime::utc_timestamp(),
            connections_count: hostReadings.connections_count,
            message: None,
        }
    }
}
