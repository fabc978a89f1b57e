//! Parsers for the flat `/proc` files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string
//! inputs; malformed content yields a [`ParseError`] naming file and line.

use std::time::Duration;

/// Error type for parsing failures, carrying the offending file and line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(file: impl Into<String>, line: usize, msg: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parse error in {} line {}: {}",
            self.file, self.line, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ============ /proc/stat ============

/// The ten cumulative tick counters of one `cpu` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTicks {
    /// Sum of all ten counters.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
            + self.guest
            + self.guest_nice
    }
}

/// Aggregate and per-core counters parsed from `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub all: CpuTicks,
    pub per_core: Vec<CpuTicks>,
}

/// Parses `/proc/stat` content.
///
/// Only the `cpu` / `cpuN` lines are consumed; the aggregate line is
/// mandatory, per-core lines are kept in index order.
pub fn parse_stat(content: &str) -> Result<CpuStat, ParseError> {
    const FILE: &str = "/proc/stat";

    let mut all = None;
    let mut per_core = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        if !label.starts_with("cpu") {
            continue;
        }

        let fields: Vec<&str> = parts.collect();
        if fields.len() < 4 {
            return Err(ParseError::new(
                FILE,
                idx + 1,
                format!("cpu line has {} fields, expected at least 4", fields.len()),
            ));
        }

        let tick = |i: usize| -> Result<u64, ParseError> {
            match fields.get(i) {
                None => Ok(0),
                Some(s) => s.parse().map_err(|_| {
                    ParseError::new(FILE, idx + 1, format!("invalid counter {:?}", s))
                }),
            }
        };

        let ticks = CpuTicks {
            user: tick(0)?,
            nice: tick(1)?,
            system: tick(2)?,
            idle: tick(3)?,
            iowait: tick(4)?,
            irq: tick(5)?,
            softirq: tick(6)?,
            steal: tick(7)?,
            guest: tick(8)?,
            guest_nice: tick(9)?,
        };

        if label == "cpu" {
            all = Some(ticks);
        } else {
            per_core.push(ticks);
        }
    }

    let Some(all) = all else {
        return Err(ParseError::new(FILE, 1, "missing aggregate cpu line"));
    };

    Ok(CpuStat { all, per_core })
}

// ============ /proc/meminfo ============

/// Memory figures from `/proc/meminfo`, in kilobytes as the kernel reports
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemInfo {
    /// Used memory in bytes, excluding buffers and page cache.
    pub fn used_bytes(&self) -> u64 {
        self.mem_total
            .saturating_sub(self.mem_free)
            .saturating_sub(self.buffers)
            .saturating_sub(self.cached)
            * 1024
    }

    pub fn total_bytes(&self) -> u64 {
        self.mem_total * 1024
    }

    /// Buffers plus page cache, in bytes.
    pub fn buf_cached_bytes(&self) -> u64 {
        (self.buffers + self.cached) * 1024
    }

    pub fn swap_used_bytes(&self) -> u64 {
        self.swap_total.saturating_sub(self.swap_free) * 1024
    }

    pub fn swap_total_bytes(&self) -> u64 {
        self.swap_total * 1024
    }
}

/// Parses `/proc/meminfo` content. `MemTotal` is mandatory.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    const FILE: &str = "/proc/meminfo";

    let mut info = MemInfo::default();
    let mut saw_total = false;

    for (idx, line) in content.lines().enumerate() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value: u64 = rest
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ParseError::new(FILE, idx + 1, format!("invalid value for {key}")))?;

        match key.trim() {
            "MemTotal" => {
                info.mem_total = value;
                saw_total = true;
            }
            "MemFree" => info.mem_free = value,
            "Buffers" => info.buffers = value,
            "Cached" => info.cached = value,
            "SwapTotal" => info.swap_total = value,
            "SwapFree" => info.swap_free = value,
            _ => {}
        }
    }

    if !saw_total {
        return Err(ParseError::new(FILE, 1, "missing MemTotal"));
    }

    Ok(info)
}

// ============ /proc/uptime ============

/// Parses `/proc/uptime` content into the total uptime duration.
pub fn parse_uptime(content: &str) -> Result<Duration, ParseError> {
    const FILE: &str = "/proc/uptime";

    let secs: f64 = content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new(FILE, 1, "missing total seconds"))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(ParseError::new(FILE, 1, "uptime out of range"));
    }

    Ok(Duration::from_secs_f64(secs))
}

// ============ /proc/loadavg ============

/// The 1/5/15 minute load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAvg {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    const FILE: &str = "/proc/loadavg";

    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new(FILE, 1, "expected three load averages"));
    }

    let load = |i: usize, name: &str| -> Result<f64, ParseError> {
        parts[i]
            .parse()
            .map_err(|_| ParseError::new(FILE, 1, format!("invalid {name}")))
    };

    Ok(LoadAvg {
        one: load(0, "1min average")?,
        five: load(1, "5min average")?,
        fifteen: load(2, "15min average")?,
    })
}

// ============ /proc/mounts ============

/// One mount table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
}

/// Parses `/proc/mounts` content. Lines with fewer than three fields are
/// rejected, the options columns are ignored.
pub fn parse_mounts(content: &str) -> Result<Vec<MountEntry>, ParseError> {
    const FILE: &str = "/proc/mounts";

    let mut mounts = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(ParseError::new(FILE, idx + 1, "short mount entry"));
        }
        mounts.push(MountEntry {
            device: parts[0].to_string(),
            mount_point: parts[1].to_string(),
            fs_type: parts[2].to_string(),
        });
    }

    Ok(mounts)
}

// ============ /proc/diskstats ============

/// Cumulative I/O counters for one block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskStat {
    pub name: String,
    pub read_ops: u64,
    pub read_sectors: u64,
    pub write_ops: u64,
    pub write_sectors: u64,
}

impl DiskStat {
    /// Sectors are fixed at 512 bytes in this file regardless of the device
    /// block size.
    pub fn read_bytes(&self) -> u64 {
        self.read_sectors * 512
    }

    pub fn write_bytes(&self) -> u64 {
        self.write_sectors * 512
    }
}

/// Parses `/proc/diskstats` content.
///
/// Layout: major minor name reads r_merged r_sectors r_time writes w_merged
/// w_sectors w_time ... (newer kernels append discard/flush columns).
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStat>, ParseError> {
    const FILE: &str = "/proc/diskstats";

    let mut disks = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 11 {
            return Err(ParseError::new(FILE, idx + 1, "short diskstats entry"));
        }

        let counter = |i: usize, name: &str| -> Result<u64, ParseError> {
            parts[i]
                .parse()
                .map_err(|_| ParseError::new(FILE, idx + 1, format!("invalid {name}")))
        };

        disks.push(DiskStat {
            name: parts[2].to_string(),
            read_ops: counter(3, "read ops")?,
            read_sectors: counter(5, "read sectors")?,
            write_ops: counter(7, "write ops")?,
            write_sectors: counter(9, "write sectors")?,
        });
    }

    Ok(disks)
}

// ============ /proc/net/dev ============

/// Cumulative traffic counters for one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetDevStat {
    pub iface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

/// Parses `/proc/net/dev` content, skipping the two header lines.
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStat>, ParseError> {
    const FILE: &str = "/proc/net/dev";

    let mut devices = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((iface, counters)) = line.split_once(':') else {
            return Err(ParseError::new(FILE, idx + 1, "missing interface separator"));
        };

        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            return Err(ParseError::new(FILE, idx + 1, "short interface entry"));
        }

        let counter = |i: usize, name: &str| -> Result<u64, ParseError> {
            values[i]
                .parse()
                .map_err(|_| ParseError::new(FILE, idx + 1, format!("invalid {name}")))
        };

        devices.push(NetDevStat {
            iface: iface.trim().to_string(),
            rx_bytes: counter(0, "rx bytes")?,
            rx_packets: counter(1, "rx packets")?,
            tx_bytes: counter(8, "tx bytes")?,
            tx_packets: counter(9, "tx packets")?,
        });
    }

    Ok(devices)
}

// ============ /proc/version ============

/// Parses `/proc/version`, yielding the first three whitespace-separated
/// tokens ("Linux version 6.1.0-13-amd64").
pub fn parse_kernel_version(content: &str) -> Result<String, ParseError> {
    let tokens: Vec<&str> = content.split_whitespace().take(3).collect();
    if tokens.len() < 3 {
        return Err(ParseError::new("/proc/version", 1, "kernel version not found"));
    }
    Ok(tokens.join(" "))
}

// ============ /proc/cpuinfo ============

/// Counts logical processors in `/proc/cpuinfo`.
pub fn parse_cpu_count(content: &str) -> usize {
    content
        .lines()
        .filter(|line| {
            line.split(':')
                .next()
                .map(|key| key.trim() == "processor")
                .unwrap_or(false)
        })
        .count()
}
