use telemon_types::GpuInfo;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};

const GPU_QUERY: &str =
    "--query-gpu=index,name,utilization.gpu,memory.total,memory.used,memory.free,temperature.gpu";

/// Try to parse a numeric value from an nvidia-smi field.
/// Strips brackets, whitespace, and unit suffixes (e.g. "MiB", "W").
/// Returns None for N/A variants like "[N/A]", "N/A", "N/A MiB", etc.
fn parse_nvsmi_field<T: std::str::FromStr>(raw: &str) -> Option<T> {
    let s = raw.trim().trim_matches(|c| c == '[' || c == ']').trim();
    if s.eq_ignore_ascii_case("n/a") || s.is_empty() {
        return None;
    }
    let numeric = s.split_whitespace().next().unwrap_or(s);
    numeric.parse::<T>().ok()
}

/// Every GPU reported by `nvidia-smi`; empty when the tool is missing or
/// fails, which is the normal case on hosts without an NVIDIA GPU.
pub async fn collect(nvidiaSmi: &str) -> Vec<GpuInfo> {
    match collect_from_nvidia_smi(nvidiaSmi).await {
        Ok(gpus) => gpus,
        Err(e) => {
            debug!("no GPU data: {e}");
            Vec::new()
        }
    }
}

async fn collect_from_nvidia_smi(nvidiaSmi: &str) -> Result<Vec<GpuInfo>> {
    let gpuOutput = tokio::process::Command::new(nvidiaSmi)
        .args([GPU_QUERY, "--format=csv,noheader,nounits"])
        .output()
        .await
        .map_err(|e| ProviderError::Command {
            command: nvidiaSmi.to_string(),
            detail: e.to_string(),
        })?;

    if !gpuOutput.status.success() {
        return Err(ProviderError::Command {
            command: nvidiaSmi.to_string(),
            detail: format!("exited with status {}", gpuOutput.status),
        });
    }

    let gpuCsv = String::from_utf8_lossy(&gpuOutput.stdout);
    Ok(parse_gpu_csv(&gpuCsv))
}

/// Parses `nvidia-smi` CSV output, one GPU per line. Malformed lines are
/// skipped with a warning rather than failing the whole list.
pub fn parse_gpu_csv(csv: &str) -> Vec<GpuInfo> {
    csv.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let gpu = parse_gpu_line(line);
            if gpu.is_none() {
                warn!("unexpected nvidia-smi output format: {line}");
            }
            gpu
        })
        .collect()
}

fn parse_gpu_line(line: &str) -> Option<GpuInfo> {
    let gpuFields: Vec<&str> = line.split(',').map(str::trim).collect();
    if gpuFields.len() < 7 {
        return None;
    }

    let id = parse_nvsmi_field::<u32>(gpuFields[0])?;
    let memoryTotal = parse_nvsmi_field::<u64>(gpuFields[3]).unwrap_or(0);
    let memoryUsed = parse_nvsmi_field::<u64>(gpuFields[4]).unwrap_or(0);
    let memoryFree =
        parse_nvsmi_field::<u64>(gpuFields[5]).unwrap_or(memoryTotal.saturating_sub(memoryUsed));

    let memoryUtilPercent = if memoryTotal > 0 {
        round2(memoryUsed as f64 / memoryTotal as f64 * 100.0)
    } else {
        0.0
    };

    Some(GpuInfo {
        id,
        name: gpuFields[1].to_string(),
        load: round2(parse_nvsmi_field::<f64>(gpuFields[2]).unwrap_or(0.0)),
        memory_total: memoryTotal,
        memory_used: memoryUsed,
        memory_free: memoryFree,
        memory_util_percent: memoryUtilPercent,
        temperature: parse_nvsmi_field::<f64>(gpuFields[6]),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
