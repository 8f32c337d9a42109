use std::collections::BTreeSet;

use rand::Rng;
use telemon_types::{CpuMetrics, CpuSampling, LoadAverage};
use tracing::warn;

use crate::error::{read_file, read_file_async, ProviderError, Result};
use crate::paths::HostPaths;

/// Cumulative jiffies for one logical CPU, from a `cpuN` line of `/proc/stat`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Parses the per-core `cpuN` lines of `/proc/stat`, skipping the aggregate.
///
/// Idle time includes iowait. Guest time is already counted in user time, so
/// only the first eight columns make up the total.
pub fn parse_proc_stat(contents: &str) -> Vec<CpuTimes> {
    contents
        .lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .filter_map(|line| {
            let values: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .take(8)
                .filter_map(|s| s.parse().ok())
                .collect();
            if values.len() < 4 {
                return None;
            }
            let iowait = values.get(4).copied().unwrap_or(0);
            Some(CpuTimes {
                idle: values[3] + iowait,
                total: values.iter().sum(),
            })
        })
        .collect()
}

pub fn read_cpu_times(paths: &HostPaths) -> Result<Vec<CpuTimes>> {
    let contents = read_file(paths.proc("stat"))?;
    let times = parse_proc_stat(&contents);
    if times.is_empty() {
        return Err(ProviderError::parse("/proc/stat", "no per-cpu lines"));
    }
    Ok(times)
}

/// Busy percentage of each core between two readings, rounded to 0.1.
pub fn per_cpu_percent(before: &[CpuTimes], after: &[CpuTimes]) -> Vec<f64> {
    before
        .iter()
        .zip(after)
        .map(|(b, a)| {
            let totalDelta = a.total.saturating_sub(b.total);
            let idleDelta = a.idle.saturating_sub(b.idle);
            if totalDelta == 0 {
                return 0.0;
            }
            let busy = 100.0 * (1.0 - idleDelta as f64 / totalDelta as f64);
            round1(busy.clamp(0.0, 100.0))
        })
        .collect()
}

/// Synthetic per-core readings used when measurement yields nothing usable.
///
/// Values are drawn uniformly from 6..=10 percent. They only keep dashboards
/// from showing a dead machine and must not be read as telemetry; the
/// snapshot tags them with [`CpuSampling::Fallback`].
pub fn fallback_per_cpu(logicalCount: usize) -> Vec<f64> {
    let mut rng = rand::rng();
    (0..logicalCount.max(1))
        .map(|_| rng.random_range(6..=10) as f64)
        .collect()
}

/// Assembles the CPU section from a sampling window.
pub fn build_metrics(
    window: Option<(&[CpuTimes], &[CpuTimes])>,
    topology: &CpuTopology,
    loadAvg: Option<LoadAverage>,
) -> CpuMetrics {
    let measured = window.map(|(before, after)| per_cpu_percent(before, after));

    let (perCpu, sampling) = match measured {
        Some(values) if values.iter().any(|v| *v > 0.0) => (values, CpuSampling::Measured),
        Some(_) => {
            warn!("CPU reading was all zero, using fallback sampling");
            (fallback_per_cpu(topology.logical), CpuSampling::Fallback)
        }
        None => {
            warn!("CPU sampling failed, using fallback sampling");
            (fallback_per_cpu(topology.logical), CpuSampling::Fallback)
        }
    };

    let cpuPercent = round1(perCpu.iter().sum::<f64>() / perCpu.len() as f64);

    CpuMetrics {
        cpu_percent: cpuPercent,
        cpu_count_logical: topology.logical,
        cpu_count_physical: topology.physical,
        per_cpu: perCpu,
        load_avg: loadAvg,
        sampling,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuTopology {
    pub logical: usize,
    pub physical: Option<usize>,
}

/// What the scheduler reports, with no physical core count.
impl Default for CpuTopology {
    fn default() -> Self {
        Self {
            logical: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            physical: None,
        }
    }
}

/// Counts logical processors and distinct (physical id, core id) pairs.
pub fn parse_cpuinfo(contents: &str) -> (usize, Option<usize>) {
    let mut logical = 0;
    let mut cores = BTreeSet::new();
    let mut physicalId: Option<String> = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "processor" => {
                logical += 1;
                physicalId = None;
            }
            "physical id" => physicalId = Some(value.trim().to_string()),
            "core id" => {
                let package = physicalId.clone().unwrap_or_default();
                cores.insert((package, value.trim().to_string()));
            }
            _ => {}
        }
    }

    let physical = if cores.is_empty() {
        None
    } else {
        Some(cores.len())
    };
    (logical, physical)
}

/// First `model name` entry of `/proc/cpuinfo`.
pub fn parse_model_name(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "model name").then(|| value.trim().to_string())
    })
}

pub fn topology(paths: &HostPaths) -> CpuTopology {
    match read_file(paths.proc("cpuinfo")) {
        Ok(contents) => {
            let (logical, physical) = parse_cpuinfo(&contents);
            CpuTopology {
                logical: if logical > 0 {
                    logical
                } else {
                    CpuTopology::default().logical
                },
                physical,
            }
        }
        Err(e) => {
            warn!("cpu topology unavailable: {e}");
            CpuTopology::default()
        }
    }
}

pub fn parse_loadavg(contents: &str) -> Result<LoadAverage> {
    let fields: Vec<&str> = contents.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(ProviderError::parse("/proc/loadavg", contents.trim()));
    }

    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| ProviderError::parse("/proc/loadavg", e.to_string()))
    };

    Ok(LoadAverage {
        one: parse(fields[0])?,
        five: parse(fields[1])?,
        fifteen: parse(fields[2])?,
    })
}

pub async fn load_average(paths: &HostPaths) -> Option<LoadAverage> {
    let result = async {
        let contents = read_file_async(paths.proc("loadavg")).await?;
        parse_loadavg(&contents)
    }
    .await;

    match result {
        Ok(load) => Some(load),
        Err(e) => {
            warn!("load average unavailable: {e}");
            None
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_BEFORE: &str = "\
cpu  200 0 100 1700 0 0 0 0 0 0
cpu0 100 0 50 850 0 0 0 0 0 0
cpu1 100 0 50 850 0 0 0 0 0 0
intr 12345
ctxt 999
btime 1700000000
";

    const STAT_AFTER: &str = "\
cpu  300 0 150 1850 0 0 0 0 0 0
cpu0 175 0 75 850 0 0 0 0 0 0
cpu1 100 0 50 950 50 0 0 0 0 0
";

    #[test]
    fn test_parse_proc_stat_skips_aggregate() {
        let times = parse_proc_stat(STAT_BEFORE);
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], CpuTimes { idle: 850, total: 1000 });
    }

    #[test]
    fn test_per_cpu_percent() {
        let before = parse_proc_stat(STAT_BEFORE);
        let after = parse_proc_stat(STAT_AFTER);
        // cpu0: 100 busy of 100; cpu1: 150 idle+iowait of 150.
        assert_eq!(per_cpu_percent(&before, &after), vec![100.0, 0.0]);
    }

    #[test]
    fn test_per_cpu_percent_without_progress_is_zero() {
        let times = parse_proc_stat(STAT_BEFORE);
        assert_eq!(per_cpu_percent(&times, &times), vec![0.0, 0.0]);
    }

    #[test]
    fn test_build_metrics_measured() {
        let before = parse_proc_stat(STAT_BEFORE);
        let after = parse_proc_stat(STAT_AFTER);
        let topology = CpuTopology {
            logical: 2,
            physical: Some(1),
        };
        let metrics = build_metrics(Some((before.as_slice(), after.as_slice())), &topology, None);
        assert_eq!(metrics.sampling, CpuSampling::Measured);
        assert_eq!(metrics.cpu_percent, 50.0);
        assert_eq!(metrics.per_cpu, vec![100.0, 0.0]);
        assert_eq!(metrics.cpu_count_physical, Some(1));
    }

    #[test]
    fn test_build_metrics_all_zero_uses_fallback() {
        let times = parse_proc_stat(STAT_BEFORE);
        let topology = CpuTopology {
            logical: 4,
            physical: None,
        };
        let metrics = build_metrics(Some((times.as_slice(), times.as_slice())), &topology, None);
        assert_eq!(metrics.sampling, CpuSampling::Fallback);
        assert_eq!(metrics.per_cpu.len(), 4);
        assert!(metrics.per_cpu.iter().all(|v| (6.0..=10.0).contains(v)));
        assert!((6.0..=10.0).contains(&metrics.cpu_percent));
    }

    #[test]
    fn test_build_metrics_without_window_uses_fallback() {
        let topology = CpuTopology {
            logical: 3,
            physical: None,
        };
        let metrics = build_metrics(None, &topology, None);
        assert_eq!(metrics.sampling, CpuSampling::Fallback);
        assert_eq!(metrics.per_cpu.len(), 3);
    }

    #[test]
    fn test_fallback_never_empty() {
        assert_eq!(fallback_per_cpu(0).len(), 1);
    }

    #[test]
    fn test_parse_cpuinfo() {
        let cpuinfo = "\
processor\t: 0
model name\t: Example CPU @ 3.00GHz
physical id\t: 0
core id\t\t: 0

processor\t: 1
model name\t: Example CPU @ 3.00GHz
physical id\t: 0
core id\t\t: 0

processor\t: 2
physical id\t: 0
core id\t\t: 1
";
        assert_eq!(parse_cpuinfo(cpuinfo), (3, Some(2)));
        assert_eq!(
            parse_model_name(cpuinfo).as_deref(),
            Some("Example CPU @ 3.00GHz")
        );
        assert_eq!(parse_cpuinfo("processor : 0\nprocessor : 1\n"), (2, None));
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.52 0.58 0.59 1/467 12345\n").unwrap();
        assert_eq!(load.one, 0.52);
        assert_eq!(load.five, 0.58);
        assert_eq!(load.fifteen, 0.59);
        assert!(parse_loadavg("0.5").is_err());
        assert!(parse_loadavg("a b c").is_err());
    }

    #[tokio::test]
    async fn test_load_average_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_average(&HostPaths::under(dir.path())).await, None);
    }
}
