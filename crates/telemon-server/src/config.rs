use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use telemon_providers::{CollectorConfig, HostPaths};

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub collector: CollectorSection,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// API routes are open when unset.
    pub token: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CollectorSection {
    pub cpu_sample_ms: u64,
    pub top_processes: usize,
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    pub nvidia_smi: String,
}

impl Default for CollectorSection {
    fn default() -> Self {
        let paths = HostPaths::default();
        Self {
            cpu_sample_ms: 500,
            top_processes: 8,
            proc_root: paths.proc_root,
            sys_root: paths.sys_root,
            nvidia_smi: "nvidia-smi".into(),
        }
    }
}

impl CollectorSection {
    pub fn to_collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            paths: HostPaths {
                proc_root: self.proc_root.clone(),
                sys_root: self.sys_root.clone(),
            },
            cpu_sample: Duration::from_millis(self.cpu_sample_ms),
            top_processes: self.top_processes,
            nvidia_smi: self.nvidia_smi.clone(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Allows a dashboard served from another origin to poll the API.
    pub allow_any_origin: bool,
}

pub fn load(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to parse config {}: {e}, using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read config {}: {e}, using defaults", path.display());
            Config::default()
        }
    }
}
