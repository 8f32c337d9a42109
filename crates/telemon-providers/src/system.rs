use telemon_types::{IpAddressEntry, SystemInfo};
use tracing::warn;

use crate::cpu;
use crate::error::read_file;
use crate::paths::HostPaths;

pub fn collect(paths: &HostPaths, ipAddresses: Vec<IpAddressEntry>) -> SystemInfo {
    let hostname = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .or_else(|_| read_file(paths.proc("sys/kernel/hostname")).map(|s| s.trim().to_string()))
        .unwrap_or_else(|e| {
            warn!("hostname unavailable: {e}");
            "unknown".to_string()
        });

    let processor = read_file(paths.proc("cpuinfo"))
        .ok()
        .and_then(|contents| cpu::parse_model_name(&contents))
        .unwrap_or_default();

    let mut info = SystemInfo {
        hostname,
        ip_addresses: ipAddresses,
        processor,
        ..Default::default()
    };

    match nix::sys::utsname::uname() {
        Ok(uts) => {
            let sysname = uts.sysname().to_string_lossy().into_owned();
            let release = uts.release().to_string_lossy().into_owned();
            let machine = uts.machine().to_string_lossy().into_owned();
            info.platform = format_platform(&sysname, &release, &machine);
            info.system = sysname;
            info.architecture = machine;
        }
        Err(e) => warn!("uname failed, system fields left empty: {e}"),
    }

    info
}

/// `Linux-6.8.0-45-generic-x86_64` style platform string.
pub fn format_platform(sysname: &str, release: &str, machine: &str) -> String {
    [sysname, release, machine]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_platform() {
        assert_eq!(
            format_platform("Linux", "6.8.0-45-generic", "x86_64"),
            "Linux-6.8.0-45-generic-x86_64"
        );
        assert_eq!(format_platform("Linux", "", "aarch64"), "Linux-aarch64");
    }

    #[test]
    fn test_collect_reads_processor_from_cpuinfo() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proc")).unwrap();
        std::fs::write(
            dir.path().join("proc/cpuinfo"),
            "processor\t: 0\nmodel name\t: Test Processor 9000\n",
        )
        .unwrap();

        let entries = vec![IpAddressEntry {
            iface: "lo".into(),
            address: "127.0.0.1".into(),
        }];
        let info = collect(&HostPaths::under(dir.path()), entries.clone());
        assert_eq!(info.processor, "Test Processor 9000");
        assert_eq!(info.ip_addresses, entries);
        assert!(!info.hostname.is_empty());
    }
}
