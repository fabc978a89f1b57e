//! Interface address discovery from `/proc/net`.
//!
//! IPv4 addresses come from cross-referencing the kernel route table with
//! the `fib_trie` dump: a `/32 host LOCAL` trie leaf that falls inside a
//! route's destination network belongs to that route's interface. IPv6
//! addresses are listed directly in `/proc/net/if_inet6`.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::parser::ParseError;

/// An interface's IPv4 address with the netmask width of its route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Entry {
    pub iface: String,
    pub address: Ipv4Addr,
    pub prefix: u8,
}

/// An interface's IPv6 address with its prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Entry {
    pub iface: String,
    pub address: Ipv6Addr,
    pub prefix: u8,
}

struct RouteEntry {
    iface: String,
    dest: u32,
    mask: u32,
}

/// Route table rows with a non-zero mask. Destination and mask columns are
/// little-endian hex.
fn parse_route(content: &str) -> Result<Vec<RouteEntry>, ParseError> {
    const FILE: &str = "/proc/net/route";

    let mut routes = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if idx == 0 || line.trim().is_empty() {
            continue; // header
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 8 {
            return Err(ParseError::new(FILE, idx + 1, "short route entry"));
        }

        let hex = |i: usize, name: &str| -> Result<u32, ParseError> {
            u32::from_str_radix(parts[i], 16)
                .map_err(|_| ParseError::new(FILE, idx + 1, format!("invalid {name}")))
        };

        let dest = hex(1, "destination")?.swap_bytes();
        let mask = hex(7, "mask")?.swap_bytes();
        if mask == 0 {
            continue; // default route matches everything
        }

        routes.push(RouteEntry {
            iface: parts[0].to_string(),
            dest,
            mask,
        });
    }

    Ok(routes)
}

/// Local host addresses (`/32 host LOCAL` leaves) from a `fib_trie` dump.
fn parse_trie_local_hosts(content: &str) -> Vec<Ipv4Addr> {
    let mut hosts = Vec::new();
    let mut candidate: Option<Ipv4Addr> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("|--") {
            candidate = rest.trim().parse().ok();
        } else if trimmed.starts_with("+--") {
            candidate = None;
        } else if trimmed.starts_with("/32 host") && trimmed.contains("LOCAL") {
            if let Some(addr) = candidate.take() {
                if !hosts.contains(&addr) {
                    hosts.push(addr);
                }
            }
        }
    }

    hosts
}

/// Resolves per-interface IPv4 addresses from `/proc/net/fib_trie` and
/// `/proc/net/route`. The first local host address inside an interface's
/// routed network wins.
pub fn parse_fib_trie(trie: &str, route: &str) -> Result<Vec<Ipv4Entry>, ParseError> {
    let routes = parse_route(route)?;
    let hosts = parse_trie_local_hosts(trie);

    let mut entries: Vec<Ipv4Entry> = Vec::new();
    for r in &routes {
        if entries.iter().any(|e| e.iface == r.iface) {
            continue;
        }
        for addr in &hosts {
            if u32::from(*addr) & r.mask == r.dest {
                entries.push(Ipv4Entry {
                    iface: r.iface.clone(),
                    address: *addr,
                    prefix: r.mask.count_ones() as u8,
                });
                break;
            }
        }
    }

    Ok(entries)
}

/// Parses `/proc/net/if_inet6` content.
///
/// Layout per line: 32-digit hex address, ifindex, prefix length (hex),
/// scope, flags, interface name.
pub fn parse_if_inet6(content: &str) -> Result<Vec<Ipv6Entry>, ParseError> {
    const FILE: &str = "/proc/net/if_inet6";

    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(ParseError::new(FILE, idx + 1, "short if_inet6 entry"));
        }
        if parts[0].len() != 32 {
            return Err(ParseError::new(FILE, idx + 1, "malformed address"));
        }

        let raw = u128::from_str_radix(parts[0], 16)
            .map_err(|_| ParseError::new(FILE, idx + 1, "malformed address"))?;
        let prefix = u8::from_str_radix(parts[2], 16)
            .map_err(|_| ParseError::new(FILE, idx + 1, "invalid prefix length"))?;

        entries.push(Ipv6Entry {
            iface: parts[5].to_string(),
            address: Ipv6Addr::from(raw),
            prefix,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t0100A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0000A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
";

    const FIB_TRIE: &str = "\
Main:
  +-- 0.0.0.0/0 3 0 5
     |-- 127.0.0.0
        /8 host LOCAL
  +-- 192.168.0.0/24 2 0 2
     |-- 192.168.0.0
        /32 link BROADCAST
     |-- 192.168.0.5
        /32 host LOCAL
     |-- 192.168.0.255
        /32 link BROADCAST
";

    #[test]
    fn test_ipv4_cross_reference() {
        let entries = parse_fib_trie(FIB_TRIE, ROUTE).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].iface, "eth0");
        assert_eq!(entries[0].address, Ipv4Addr::new(192, 168, 0, 5));
        assert_eq!(entries[0].prefix, 24);
    }

    #[test]
    fn test_default_route_does_not_capture_hosts() {
        // Only the default route present: no network actually contains the
        // host address, so nothing resolves.
        let route = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t0100A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
";
        let entries = parse_fib_trie(FIB_TRIE, route).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_broadcast_leaves_are_ignored() {
        let trie = "\
  +-- 10.0.0.0/24 2 0 2
     |-- 10.0.0.255
        /32 link BROADCAST
";
        let route = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth1\t0000000A\t00000000\t0001\t0\t0\t0\t00FFFFFF\t0\t0\t0
";
        let entries = parse_fib_trie(trie, route).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_route_invalid_hex() {
        let route = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\tzzzz\t00000000\t0001\t0\t0\t0\t00FFFFFF\t0\t0\t0
";
        let err = parse_fib_trie(FIB_TRIE, route).unwrap_err();
        assert_eq!(err.file, "/proc/net/route");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parse_if_inet6() {
        let content = "\
00000000000000000000000000000001 01 80 10 80       lo
fe80000000000000025056fffeb70ced 02 40 20 80     eth0
";
        let entries = parse_if_inet6(content).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].iface, "lo");
        assert_eq!(entries[0].address, Ipv6Addr::LOCALHOST);
        assert_eq!(entries[0].prefix, 128);
        assert_eq!(entries[1].iface, "eth0");
        assert_eq!(entries[1].prefix, 64);
        assert_eq!(
            entries[1].address.to_string(),
            "fe80::250:56ff:feb7:ced"
        );
    }

    #[test]
    fn test_parse_if_inet6_malformed() {
        assert!(parse_if_inet6("nothexnothexnothexnothexnothexno 01 80 10 80 lo\n").is_err());
        assert!(parse_if_inet6("fe80 01 80 10 80 lo\n").is_err());
    }
}
