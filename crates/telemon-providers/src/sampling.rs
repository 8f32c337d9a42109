//! Fixed-length CPU sampling window.
//!
//! CPU and per-process percentages need two readings some time apart. The
//! window is a plain blocking sleep on the blocking pool; once started it
//! always runs to completion.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::cpu::{self, CpuTimes};
use crate::paths::HostPaths;
use crate::processes::{self, ProcessSample, ProcessTable};

#[derive(Clone, Debug, Default)]
pub struct WindowSample {
    /// Per-core times at the start and end of the window, `None` when
    /// `/proc/stat` could not be read at either end.
    pub cpu: Option<(Vec<CpuTimes>, Vec<CpuTimes>)>,
    /// Processes alive at the end of the window.
    pub processes: Vec<ProcessSample>,
    pub total_memory: u64,
    /// Fault counters by pid, for processes whose stat file was readable.
    pub page_faults: HashMap<u32, u64>,
}

/// Blocking body of the window.
pub fn sample_blocking(paths: &HostPaths, window: Duration) -> WindowSample {
    let table = ProcessTable::open();
    let cpuBefore = cpu::read_cpu_times(paths);

    std::thread::sleep(window);

    let cpuAfter = cpu::read_cpu_times(paths);
    let (processes, totalMemory) = table.close();

    let cpu = match (cpuBefore, cpuAfter) {
        (Ok(before), Ok(after)) => Some((before, after)),
        (Err(e), _) | (_, Err(e)) => {
            warn!("CPU times unavailable: {e}");
            None
        }
    };

    let pageFaults = processes
        .iter()
        .filter_map(|p| Some((p.pid, processes::read_page_faults(paths, p.pid)?)))
        .collect();

    WindowSample {
        cpu,
        processes,
        total_memory: totalMemory,
        page_faults: pageFaults,
    }
}

pub async fn run(paths: HostPaths, window: Duration) -> WindowSample {
    match tokio::task::spawn_blocking(move || sample_blocking(&paths, window)).await {
        Ok(sample) => sample,
        Err(e) => {
            warn!("sampling window task failed: {e}");
            WindowSample::default()
        }
    }
}
