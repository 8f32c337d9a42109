//! Network interface descriptors: addresses, MAC, link state and speed.

use std::collections::BTreeMap;

use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use telemon_types::{InterfaceDetail, IpAddressEntry};
use tracing::warn;

use crate::error::{read_file, Result};
use crate::paths::HostPaths;

/// One address entry as returned by `getifaddrs`, reduced to what the
/// response needs.
#[derive(Clone, Debug, PartialEq)]
pub enum AddressEntry {
    Ip { iface: String, address: String, up: bool },
    Link { iface: String, mac: String, up: bool },
    Other { iface: String, up: bool },
}

impl AddressEntry {
    fn iface(&self) -> &str {
        match self {
            Self::Ip { iface, .. } | Self::Link { iface, .. } | Self::Other { iface, .. } => iface,
        }
    }

    fn up(&self) -> bool {
        match self {
            Self::Ip { up, .. } | Self::Link { up, .. } | Self::Other { up, .. } => *up,
        }
    }
}

pub fn read_addresses() -> Result<Vec<AddressEntry>> {
    let mut entries = Vec::new();

    for ifaddr in getifaddrs()? {
        let iface = ifaddr.interface_name.clone();
        let up = ifaddr.flags.contains(InterfaceFlags::IFF_UP);
        let Some(address) = ifaddr.address else {
            entries.push(AddressEntry::Other { iface, up });
            continue;
        };

        let entry = if let Some(v4) = address.as_sockaddr_in() {
            AddressEntry::Ip {
                iface,
                address: v4.ip().to_string(),
                up,
            }
        } else if let Some(v6) = address.as_sockaddr_in6() {
            AddressEntry::Ip {
                iface,
                address: v6.ip().to_string(),
                up,
            }
        } else if let Some(mac) = address.as_link_addr().and_then(|link| link.addr()) {
            AddressEntry::Link {
                iface,
                mac: format_mac(&mac),
                up,
            }
        } else {
            AddressEntry::Other { iface, up }
        };
        entries.push(entry);
    }

    Ok(entries)
}

pub fn format_mac(bytes: &[u8; 6]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Groups address entries per interface, keeping first-seen address order.
pub fn build_details(
    entries: &[AddressEntry],
    speedOf: impl Fn(&str) -> Option<u64>,
) -> Vec<InterfaceDetail> {
    let mut details: BTreeMap<String, InterfaceDetail> = BTreeMap::new();

    for entry in entries {
        let detail = details
            .entry(entry.iface().to_string())
            .or_insert_with(|| InterfaceDetail {
                iface: entry.iface().to_string(),
                ..Default::default()
            });
        detail.is_up = Some(detail.is_up.unwrap_or(false) || entry.up());

        match entry {
            AddressEntry::Ip { address, .. } => detail.ips.push(address.clone()),
            AddressEntry::Link { mac, .. } => detail.mac = Some(mac.clone()),
            AddressEntry::Other { .. } => {}
        }
    }

    details
        .into_values()
        .map(|mut detail| {
            detail.speed = speedOf(&detail.iface);
            detail
        })
        .collect()
}

pub fn ip_addresses(entries: &[AddressEntry]) -> Vec<IpAddressEntry> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            AddressEntry::Ip { iface, address, .. } => Some(IpAddressEntry {
                iface: iface.clone(),
                address: address.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Link speed in Mb/s. Virtual and down interfaces report an error or -1.
pub fn link_speed(paths: &HostPaths, iface: &str) -> Option<u64> {
    let raw = read_file(paths.sys(&format!("class/net/{iface}/speed"))).ok()?;
    let speed: i64 = raw.trim().parse().ok()?;
    u64::try_from(speed).ok().filter(|s| *s > 0)
}

/// Interface addresses, or an empty list when `getifaddrs` fails.
pub fn collect_addresses() -> Vec<AddressEntry> {
    match read_addresses() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("interface addresses unavailable: {e}");
            Vec::new()
        }
    }
}

pub fn collect(paths: &HostPaths, entries: &[AddressEntry]) -> Vec<InterfaceDetail> {
    build_details(entries, |iface| link_speed(paths, iface))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<AddressEntry> {
        vec![
            AddressEntry::Link {
                iface: "eth0".into(),
                mac: "aa:bb:cc:dd:ee:ff".into(),
                up: true,
            },
            AddressEntry::Ip {
                iface: "eth0".into(),
                address: "192.168.1.10".into(),
                up: true,
            },
            AddressEntry::Ip {
                iface: "eth0".into(),
                address: "fe80::1".into(),
                up: true,
            },
            AddressEntry::Ip {
                iface: "lo".into(),
                address: "127.0.0.1".into(),
                up: true,
            },
            AddressEntry::Other {
                iface: "wg0".into(),
                up: false,
            },
        ]
    }

    #[test]
    fn test_build_details() {
        let details = build_details(&entries(), |iface| (iface == "eth0").then_some(1000));
        assert_eq!(details.len(), 3);

        let eth0 = &details[0];
        assert_eq!(eth0.iface, "eth0");
        assert_eq!(eth0.ips, vec!["192.168.1.10", "fe80::1"]);
        assert_eq!(eth0.mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(eth0.is_up, Some(true));
        assert_eq!(eth0.speed, Some(1000));

        let wg0 = &details[2];
        assert_eq!(wg0.iface, "wg0");
        assert!(wg0.ips.is_empty());
        assert_eq!(wg0.is_up, Some(false));
        assert_eq!(wg0.speed, None);
    }

    #[test]
    fn test_ip_addresses() {
        let ips = ip_addresses(&entries());
        assert_eq!(ips.len(), 3);
        assert_eq!(ips[2].iface, "lo");
        assert_eq!(ips[2].address, "127.0.0.1");
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac(&[0, 0x1b, 0x44, 0x11, 0x3a, 0xb7]), "00:1b:44:11:3a:b7");
    }

    #[test]
    fn test_link_speed() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::under(dir.path());
        for (iface, speed) in [("eth0", "1000\n"), ("veth0", "-1\n")] {
            let base = dir.path().join("sys/class/net").join(iface);
            std::fs::create_dir_all(&base).unwrap();
            std::fs::write(base.join("speed"), speed).unwrap();
        }
        assert_eq!(link_speed(&paths, "eth0"), Some(1000));
        assert_eq!(link_speed(&paths, "veth0"), None);
        assert_eq!(link_speed(&paths, "missing"), None);
    }
}
