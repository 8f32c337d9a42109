//! Process table and top-N ranking.

use std::collections::HashMap;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};
use telemon_types::ProcessEntry;
use tracing::debug;

use crate::paths::HostPaths;

/// One process as seen at the end of the sampling window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub username: Option<String>,
    /// Share of one core over the window, as reported by `sysinfo`.
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    pub cmdline: Vec<String>,
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_user(UpdateKind::OnlyIfNotSet)
        .with_cmd(UpdateKind::OnlyIfNotSet)
}

/// Process table handle kept across the sampling window. CPU usage is only
/// meaningful after the second refresh.
pub struct ProcessTable {
    system: System,
}

impl ProcessTable {
    /// First refresh, taken when the window opens.
    pub fn open() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        Self { system }
    }

    /// Second refresh, taken when the window closes. Processes that exited
    /// in between are dropped.
    pub fn close(mut self) -> (Vec<ProcessSample>, u64) {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        self.system.refresh_memory();

        let users = Users::new_with_refreshed_list();
        let samples = self
            .system
            .processes()
            .values()
            .filter(|proc| proc.thread_kind().is_none())
            .map(|proc| ProcessSample {
                pid: proc.pid().as_u32(),
                name: proc.name().to_string_lossy().into_owned(),
                username: proc
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_string()),
                cpu_usage: proc.cpu_usage(),
                memory_bytes: proc.memory(),
                cmdline: proc
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect();

        (samples, self.system.total_memory())
    }
}

/// Minor + major faults from `/proc/<pid>/stat`. The command name sits
/// between the first `(` and the last `)` and is not guaranteed to be UTF-8.
pub fn parse_stat_faults(raw: &[u8]) -> Option<u64> {
    let close = raw.iter().rposition(|b| *b == b')')?;
    let rest = String::from_utf8_lossy(&raw[close + 1..]);
    // Index 0 is field 3 (state) in proc(5) numbering.
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let minor = fields.get(7)?.parse::<u64>().ok()?;
    let major = fields.get(9)?.parse::<u64>().ok()?;
    Some(minor + major)
}

pub fn read_page_faults(paths: &HostPaths, pid: u32) -> Option<u64> {
    match std::fs::read(paths.proc(&format!("{pid}/stat"))) {
        Ok(raw) => parse_stat_faults(&raw),
        Err(e) => {
            debug!("no fault counters for pid {pid}: {e}");
            None
        }
    }
}

/// Builds response entries from the end-of-window samples.
pub fn build_entries(
    samples: Vec<ProcessSample>,
    totalMemory: u64,
    faults: &HashMap<u32, u64>,
) -> Vec<ProcessEntry> {
    samples
        .into_iter()
        .map(|sample| {
            let memoryPercent = if totalMemory > 0 {
                sample.memory_bytes as f64 / totalMemory as f64 * 100.0
            } else {
                0.0
            };

            ProcessEntry {
                pid: sample.pid,
                username: sample.username,
                name: sample.name,
                cpu_percent: (f64::from(sample.cpu_usage) * 10.0).round() / 10.0,
                memory_percent: memoryPercent,
                cmdline: sample.cmdline,
                page_faults: faults.get(&sample.pid).copied(),
            }
        })
        .collect()
}

/// Top `n` by combined CPU and memory share.
pub fn top_by_cpu(entries: &[ProcessEntry], n: usize) -> Vec<ProcessEntry> {
    top_by(entries, n, |p| p.cpu_percent + p.memory_percent)
}

pub fn top_by_memory(entries: &[ProcessEntry], n: usize) -> Vec<ProcessEntry> {
    top_by(entries, n, |p| p.memory_percent)
}

fn top_by(entries: &[ProcessEntry], n: usize, key: impl Fn(&ProcessEntry) -> f64) -> Vec<ProcessEntry> {
    let mut ranked: Vec<&ProcessEntry> = entries.iter().collect();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)).then(a.pid.cmp(&b.pid)));
    ranked.into_iter().take(n).cloned().collect()
}

/// Sum of per-process page faults, `None` when no process reported any.
pub fn page_faults_total(entries: &[ProcessEntry]) -> Option<u64> {
    entries
        .iter()
        .filter_map(|p| p.page_faults)
        .fold(None, |acc, faults| Some(acc.unwrap_or(0) + faults))
}
