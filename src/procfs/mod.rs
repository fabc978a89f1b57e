//! Parsers for Linux `/proc` pseudo-files.
//!
//! Pure functions from file content to typed records; no I/O happens here.
//! The remote gateway fetches the bytes, these functions give them shape.

pub mod net;
pub mod parser;

pub use net::{Ipv4Entry, Ipv6Entry, parse_fib_trie, parse_if_inet6};
pub use parser::{
    CpuStat, CpuTicks, DiskStat, LoadAvg, MemInfo, MountEntry, ParseError, parse_cpu_count,
    parse_diskstats, parse_kernel_version, parse_loadavg, parse_meminfo, parse_mounts,
    parse_net_dev, parse_stat, parse_uptime,
};
