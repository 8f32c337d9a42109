//! Network counters from `/proc/net/dev` and socket counts from `/proc/net/*`.

use std::collections::BTreeMap;

use telemon_types::{InterfaceCounters, NetIoTotals, NetTotals};
use tracing::{debug, warn};

use crate::error::{read_file, ProviderError, Result};
use crate::paths::HostPaths;

/// Full per-interface counters as reported by `/proc/net/dev`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetDevCounters {
    pub bytes_recv: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub dropin: u64,
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub errout: u64,
    pub dropout: u64,
}

impl NetDevCounters {
    pub fn interface_counters(&self) -> InterfaceCounters {
        InterfaceCounters {
            bytes_sent: self.bytes_sent,
            bytes_recv: self.bytes_recv,
            packets_sent: self.packets_sent,
            packets_recv: self.packets_recv,
        }
    }
}

/// Parses the contents of `/proc/net/dev`.
///
/// The first two lines are headers. Each following line is
/// `name: rx_bytes rx_packets rx_errs rx_drop fifo frame compressed multicast
/// tx_bytes tx_packets tx_errs tx_drop ...`. Malformed lines are skipped.
pub fn parse_net_dev(contents: &str) -> BTreeMap<String, NetDevCounters> {
    let mut interfaces = BTreeMap::new();

    for line in contents.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = rest
            .split_whitespace()
            .map(|s| s.parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .unwrap_or_default();
        if fields.len() < 12 {
            debug!("skipping malformed /proc/net/dev line: {line}");
            continue;
        }

        interfaces.insert(
            name.trim().to_string(),
            NetDevCounters {
                bytes_recv: fields[0],
                packets_recv: fields[1],
                errin: fields[2],
                dropin: fields[3],
                bytes_sent: fields[8],
                packets_sent: fields[9],
                errout: fields[10],
                dropout: fields[11],
            },
        );
    }

    interfaces
}

pub fn read_net_dev(paths: &HostPaths) -> Result<BTreeMap<String, NetDevCounters>> {
    let contents = read_file(paths.proc("net/dev"))?;
    let interfaces = parse_net_dev(&contents);
    if interfaces.is_empty() {
        return Err(ProviderError::parse("/proc/net/dev", "no interfaces listed"));
    }
    Ok(interfaces)
}

/// Sums every interface, loopback included.
pub fn sum_totals(interfaces: &BTreeMap<String, NetDevCounters>) -> NetIoTotals {
    interfaces
        .values()
        .fold(NetIoTotals::default(), |acc, c| NetIoTotals {
            bytes_sent: acc.bytes_sent + c.bytes_sent,
            bytes_recv: acc.bytes_recv + c.bytes_recv,
            packets_sent: acc.packets_sent + c.packets_sent,
            packets_recv: acc.packets_recv + c.packets_recv,
            errin: acc.errin + c.errin,
            errout: acc.errout + c.errout,
            dropin: acc.dropin + c.dropin,
            dropout: acc.dropout + c.dropout,
        })
}

pub fn byte_totals(totals: &NetIoTotals) -> NetTotals {
    NetTotals {
        bytes_sent: totals.bytes_sent,
        bytes_recv: totals.bytes_recv,
    }
}

/// Aggregate counters for the response's `network_totals` section.
pub fn collect_totals(paths: &HostPaths) -> Option<NetIoTotals> {
    match read_net_dev(paths) {
        Ok(interfaces) => Some(sum_totals(&interfaces)),
        Err(e) => {
            warn!("network totals unavailable: {e}");
            None
        }
    }
}

const SOCKET_TABLES: [&str; 4] = ["net/tcp", "net/tcp6", "net/udp", "net/udp6"];

/// Counts the rows of a `/proc/net/{tcp,udp}` table, excluding its header.
pub fn count_socket_rows(contents: &str) -> u64 {
    contents
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count() as u64
}

/// Number of inet sockets across TCP/UDP over IPv4 and IPv6.
///
/// A missing table (e.g. no IPv6) contributes nothing; `None` only when no
/// table could be read at all.
pub fn connections_count(paths: &HostPaths) -> Option<u64> {
    let mut total = 0u64;
    let mut anyRead = false;

    for table in SOCKET_TABLES {
        match read_file(paths.proc(table)) {
            Ok(contents) => {
                anyRead = true;
                total += count_socket_rows(&contents);
            }
            Err(e) => debug!("socket table skipped: {e}"),
        }
    }

    if anyRead {
        Some(total)
    } else {
        warn!("no socket tables readable, connection count unavailable");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
  eth0: 5000000    4000    1    2    0     0          0        12   250000    2100    3    4    0     0       0          0
wlan0:700 7 0 0 0 0 0 0 300 3 0 0 0 0 0 0
";

    #[test]
    fn test_parse_net_dev() {
        let interfaces = parse_net_dev(NET_DEV);
        assert_eq!(interfaces.len(), 3);

        let eth0 = interfaces["eth0"];
        assert_eq!(eth0.bytes_recv, 5_000_000);
        assert_eq!(eth0.packets_recv, 4000);
        assert_eq!(eth0.errin, 1);
        assert_eq!(eth0.dropin, 2);
        assert_eq!(eth0.bytes_sent, 250_000);
        assert_eq!(eth0.packets_sent, 2100);
        assert_eq!(eth0.errout, 3);
        assert_eq!(eth0.dropout, 4);

        assert_eq!(interfaces["wlan0"].bytes_recv, 700);
        assert_eq!(interfaces["wlan0"].bytes_sent, 300);
    }

    #[test]
    fn test_parse_net_dev_skips_garbage() {
        let contents = "header\nheader\n  bad: 1 2 3\n  eth0: x y z\n";
        assert!(parse_net_dev(contents).is_empty());
    }

    #[test]
    fn test_sum_totals() {
        let totals = sum_totals(&parse_net_dev(NET_DEV));
        assert_eq!(totals.bytes_recv, 1000 + 5_000_000 + 700);
        assert_eq!(totals.bytes_sent, 1000 + 250_000 + 300);
        assert_eq!(totals.packets_sent, 10 + 2100 + 3);
        assert_eq!(totals.errout, 3);
        assert_eq!(byte_totals(&totals).bytes_recv, totals.bytes_recv);
    }

    #[test]
    fn test_count_socket_rows() {
        let tcp = "  sl  local_address rem_address   st\n   0: 0100007F:0277 00000000:0000 0A\n   1: 00000000:0016 00000000:0000 0A\n\n";
        assert_eq!(count_socket_rows(tcp), 2);
        assert_eq!(count_socket_rows("  sl  local_address\n"), 0);
    }

    #[test]
    fn test_connections_count_tolerates_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::under(dir.path());
        assert_eq!(connections_count(&paths), None);

        std::fs::create_dir_all(dir.path().join("proc/net")).unwrap();
        std::fs::write(
            dir.path().join("proc/net/tcp"),
            "header\n 0: a b\n 1: c d\n",
        )
        .unwrap();
        assert_eq!(connections_count(&paths), Some(2));
    }
}
