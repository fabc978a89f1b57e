//! Per-host sampling.
//!
//! Each connected host runs one periodic raw-counter pull (Task A): read
//! `/proc/stat`, `/proc/diskstats` and `/proc/net/dev` through the gateway,
//! append to the bounded series, derive the first-difference rates. The
//! read-through fact readers (Task B) live here too; the snapshot assembly
//! calls them on demand and caches nothing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::gateway::{ReadError, RemoteFs, read_string};
use crate::procfs::{
    self, CpuStat, LoadAvg, MemInfo, parse_cpu_count, parse_diskstats, parse_kernel_version,
    parse_loadavg, parse_meminfo, parse_mounts, parse_net_dev, parse_stat, parse_uptime,
};
use crate::rates::{RateStep, next_rate};
use crate::series::SampleSeries;
use crate::session::NodeSession;
use crate::transport::{FsUsage, Transport};

/// Filesystem types worth showing in disk snapshots; everything else is
/// kernel plumbing.
const FSTYPES: [&str; 13] = [
    "ext2", "ext3", "ext4", "btrfs", "xfs", "vfat", "ntfs", "exfat", "reiserfs", "jfs", "zfs",
    "udev", "tmpfs",
];

/// Canonical procfs locations on the remote, overridable per host.
#[derive(Debug, Clone)]
pub struct ProcPaths {
    pub proc_root: String,
    pub stat: String,
    pub cpuinfo: String,
    pub meminfo: String,
    pub uptime: String,
    pub loadavg: String,
    pub mounts: String,
    pub diskstats: String,
    pub version: String,
    pub net_dev: String,
    pub fib_trie: String,
    pub route: String,
    pub if_inet6: String,
}

impl Default for ProcPaths {
    fn default() -> Self {
        Self {
            proc_root: "/proc".into(),
            stat: "/proc/stat".into(),
            cpuinfo: "/proc/cpuinfo".into(),
            meminfo: "/proc/meminfo".into(),
            uptime: "/proc/uptime".into(),
            loadavg: "/proc/loadavg".into(),
            mounts: "/proc/mounts".into(),
            diskstats: "/proc/diskstats".into(),
            version: "/proc/version".into(),
            net_dev: "/proc/net/dev".into(),
            fib_trie: "/proc/net/fib_trie".into(),
            route: "/proc/net/route".into(),
            if_inet6: "/proc/net/if_inet6".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample records
// ---------------------------------------------------------------------------

/// One `/proc/stat` pull with its wall-clock second.
#[derive(Debug, Clone)]
pub struct CpuSample {
    pub stat: CpuStat,
    pub timestamp: i64,
}

/// Cumulative I/O counters for one block device, bytes already derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCounters {
    pub device: String,
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
}

/// Cumulative traffic counters for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetCounters {
    pub iface: String,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
}

/// Derived disk rate buffers, one slot per raw sample.
#[derive(Debug, Clone)]
pub struct DiskRates {
    pub read_bps: SampleSeries<u64>,
    pub write_bps: SampleSeries<u64>,
}

impl DiskRates {
    fn new(capacity: usize) -> Self {
        Self {
            read_bps: SampleSeries::new(capacity),
            write_bps: SampleSeries::new(capacity),
        }
    }
}

/// Derived network rate buffers, one slot per raw sample.
#[derive(Debug, Clone)]
pub struct NetRates {
    pub rx_bps: SampleSeries<u64>,
    pub tx_bps: SampleSeries<u64>,
    pub rx_pps: SampleSeries<u64>,
    pub tx_pps: SampleSeries<u64>,
}

impl NetRates {
    fn new(capacity: usize) -> Self {
        Self {
            rx_bps: SampleSeries::new(capacity),
            tx_bps: SampleSeries::new(capacity),
            rx_pps: SampleSeries::new(capacity),
            tx_pps: SampleSeries::new(capacity),
        }
    }
}

/// All bounded history of one host.
#[derive(Debug)]
pub struct HostSeries {
    capacity: usize,
    pub cpu: SampleSeries<CpuSample>,
    pub disk_io: HashMap<String, SampleSeries<DiskCounters>>,
    pub disk_rates: HashMap<String, DiskRates>,
    pub net_io: HashMap<String, SampleSeries<NetCounters>>,
    pub net_rates: HashMap<String, NetRates>,
}

impl HostSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cpu: SampleSeries::new(capacity),
            disk_io: HashMap::new(),
            disk_rates: HashMap::new(),
            net_io: HashMap::new(),
            net_rates: HashMap::new(),
        }
    }

    /// Drops all history. Runs whenever the host's connection is found
    /// not-alive, under the host write lock, so readers see either the full
    /// previous state or nothing.
    pub fn clear_all(&mut self) {
        self.cpu.clear();
        self.disk_io.clear();
        self.disk_rates.clear();
        self.net_io.clear();
        self.net_rates.clear();
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub(crate) struct HostInner {
    pub session: Option<NodeSession>,
    pub series: HostSeries,
}

/// One monitored host: identifier, procfs paths, connection and history.
///
/// A single reader/writer lock guards the connection pointer and all ring
/// buffers; the supervisor resolves identifiers to hosts, no component
/// holds a back-reference.
pub struct Host {
    id: String,
    paths: ProcPaths,
    config: Config,
    transport: Arc<dyn Transport>,
    pub(crate) inner: RwLock<HostInner>,
    warned: Mutex<HashSet<(&'static str, &'static str)>>,
}

impl Host {
    pub fn new(id: impl Into<String>, transport: Arc<dyn Transport>, config: Config) -> Self {
        Self::with_paths(id, transport, config, ProcPaths::default())
    }

    pub fn with_paths(
        id: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: Config,
        paths: ProcPaths,
    ) -> Self {
        let capacity = config.series_capacity;
        Self {
            id: id.into(),
            paths,
            config,
            transport,
            inner: RwLock::new(HostInner {
                session: None,
                series: HostSeries::new(capacity),
            }),
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paths(&self) -> &ProcPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn is_alive(&self) -> bool {
        let inner = self.inner.read().await;
        inner.session.as_ref().map(|s| s.is_alive()).unwrap_or(false)
    }

    /// The gateway of a live session, if any.
    pub(crate) async fn live_gateway(&self) -> Option<Arc<crate::gateway::ChannelGateway>> {
        let inner = self.inner.read().await;
        match &inner.session {
            Some(s) if s.is_alive() => Some(s.gateway()),
            _ => None,
        }
    }

    /// Attempts to establish a session. Runs without the host lock; the
    /// result is installed with a short write-lock swap.
    pub async fn reconnect(&self) -> bool {
        if self.is_alive().await {
            return true;
        }
        debug!(host = %self.id, "reconnect attempt");
        match NodeSession::connect(self.transport.as_ref(), &self.id, &self.config).await {
            Ok(session) => {
                self.install_session(session).await;
                true
            }
            Err(err) => {
                debug!(host = %self.id, error = %err, "reconnect failed");
                false
            }
        }
    }

    pub(crate) async fn install_session(&self, session: NodeSession) {
        let old = {
            let mut inner = self.inner.write().await;
            inner.session.replace(session)
        };
        if let Some(old) = old {
            old.close().await;
        }
        self.warned.lock().unwrap().clear();
    }

    /// Tears down the session and clears history.
    pub async fn disconnect(&self) {
        let old = {
            let mut inner = self.inner.write().await;
            inner.series.clear_all();
            inner.session.take()
        };
        if let Some(old) = old {
            old.close().await;
        }
    }

    /// Logs a degraded field once per (field, error kind) per connection.
    pub(crate) fn warn_once(&self, field: &'static str, err: &ReadError) {
        let mut warned = self.warned.lock().unwrap();
        if warned.insert((field, err.kind())) {
            warn!(host = %self.id, field, error = %err, "field degraded");
        }
    }
}

// ---------------------------------------------------------------------------
// Task A: raw counter pull
// ---------------------------------------------------------------------------

/// One sampling tick for one host.
///
/// A failed liveness probe clears all series and short-circuits the tick;
/// individual read or parse failures skip only their own series.
pub async fn sample_host(host: &Host) {
    let Some(gateway) = host.live_gateway().await else {
        let mut inner = host.inner.write().await;
        if !inner.series.cpu.is_empty()
            || !inner.series.disk_io.is_empty()
            || !inner.series.net_io.is_empty()
        {
            debug!(host = %host.id(), "connection not alive, clearing history");
        }
        inner.series.clear_all();
        return;
    };

    let timestamp = Utc::now().timestamp();
    let fs = gateway.as_ref() as &dyn RemoteFs;

    let stat = read_cpu_stat(fs, host.paths()).await;
    let disks = read_disk_counters(fs, host.paths()).await;
    let nets = read_net_counters(fs, host.paths()).await;

    let mut inner = host.inner.write().await;
    match stat {
        Ok(stat) => append_cpu(&mut inner.series, stat, timestamp),
        Err(err) => host.warn_once("cpu", &err),
    }
    match disks {
        Ok(disks) => append_disks(&mut inner.series, disks),
        Err(err) => host.warn_once("disk-io", &err),
    }
    match nets {
        Ok(nets) => append_nets(&mut inner.series, nets),
        Err(err) => host.warn_once("net-io", &err),
    }
}

async fn read_cpu_stat(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<CpuStat, ReadError> {
    let content = read_string(fs, &paths.stat).await?;
    Ok(parse_stat(&content)?)
}

/// Appends a CPU sample. A drop in the cumulative total means the remote
/// restarted behind an intact transport: the whole series resets.
fn append_cpu(series: &mut HostSeries, stat: CpuStat, timestamp: i64) {
    if let Some(last) = series.cpu.last()
        && last.stat.all.total() > stat.all.total()
    {
        debug!("cpu counters went backwards, resetting series");
        series.cpu.clear();
    }
    series.cpu.push(CpuSample { stat, timestamp });
}

async fn read_disk_counters(
    fs: &dyn RemoteFs,
    paths: &ProcPaths,
) -> Result<Vec<DiskCounters>, ReadError> {
    let content = read_string(fs, &paths.diskstats).await?;
    let stats = parse_diskstats(&content)?;

    let mut counters = Vec::with_capacity(stats.len());
    for stat in stats {
        // Devices whose mapper name cannot be resolved are skipped this
        // tick rather than recorded under the wrong key.
        let Some(device) = normalize_device(fs, &stat.name).await else {
            continue;
        };
        counters.push(DiskCounters {
            device,
            read_ops: stat.read_ops,
            read_bytes: stat.read_bytes(),
            write_ops: stat.write_ops,
            write_bytes: stat.write_bytes(),
        });
    }
    Ok(counters)
}

/// Rewrites a diskstats device name to its `/dev` path. Device-mapper
/// entries (`md-*`) resolve through `/sys/block/<name>/dm/name`.
pub async fn normalize_device(fs: &dyn RemoteFs, name: &str) -> Option<String> {
    if name.starts_with("md-") {
        let path = format!("/sys/block/{name}/dm/name");
        let mapper = read_string(fs, &path).await.ok()?;
        let mapper = mapper.trim();
        if mapper.is_empty() {
            return None;
        }
        Some(format!("/dev/mapper/{mapper}"))
    } else {
        Some(format!("/dev/{name}"))
    }
}

fn append_disks(series: &mut HostSeries, counters: Vec<DiskCounters>) {
    let capacity = series.capacity;
    for c in counters {
        let io = series
            .disk_io
            .entry(c.device.clone())
            .or_insert_with(|| SampleSeries::new(capacity));
        let rates = series
            .disk_rates
            .entry(c.device.clone())
            .or_insert_with(|| DiskRates::new(capacity));

        let prev = io.last();
        let read = next_rate(prev.map(|p| p.read_bytes), c.read_bytes);
        let write = next_rate(prev.map(|p| p.write_bytes), c.write_bytes);

        if read == RateStep::Reset || write == RateStep::Reset {
            io.clear();
            rates.read_bps.push(0);
            rates.write_bps.push(0);
        } else {
            rates.read_bps.push(rate_value(read));
            rates.write_bps.push(rate_value(write));
        }
        io.push(c);
    }
}

async fn read_net_counters(
    fs: &dyn RemoteFs,
    paths: &ProcPaths,
) -> Result<Vec<NetCounters>, ReadError> {
    let content = read_string(fs, &paths.net_dev).await?;
    let stats = parse_net_dev(&content)?;

    Ok(stats
        .into_iter()
        .map(|s| NetCounters {
            iface: s.iface,
            rx_packets: s.rx_packets,
            rx_bytes: s.rx_bytes,
            tx_packets: s.tx_packets,
            tx_bytes: s.tx_bytes,
        })
        .collect())
}

fn append_nets(series: &mut HostSeries, counters: Vec<NetCounters>) {
    let capacity = series.capacity;
    for c in counters {
        let io = series
            .net_io
            .entry(c.iface.clone())
            .or_insert_with(|| SampleSeries::new(capacity));
        let rates = series
            .net_rates
            .entry(c.iface.clone())
            .or_insert_with(|| NetRates::new(capacity));

        let prev = io.last();
        let rx_b = next_rate(prev.map(|p| p.rx_bytes), c.rx_bytes);
        let tx_b = next_rate(prev.map(|p| p.tx_bytes), c.tx_bytes);
        let rx_p = next_rate(prev.map(|p| p.rx_packets), c.rx_packets);
        let tx_p = next_rate(prev.map(|p| p.tx_packets), c.tx_packets);

        if [rx_b, tx_b, rx_p, tx_p].contains(&RateStep::Reset) {
            io.clear();
            rates.rx_bps.push(0);
            rates.tx_bps.push(0);
            rates.rx_pps.push(0);
            rates.tx_pps.push(0);
        } else {
            rates.rx_bps.push(rate_value(rx_b));
            rates.tx_bps.push(rate_value(tx_b));
            rates.rx_pps.push(rate_value(rx_p));
            rates.tx_pps.push(rate_value(tx_p));
        }
        io.push(c);
    }
}

fn rate_value(step: RateStep) -> u64 {
    match step {
        RateStep::Rate(d) => d,
        RateStep::Baseline | RateStep::Reset => 0,
    }
}

// ---------------------------------------------------------------------------
// Task B: read-through facts
// ---------------------------------------------------------------------------

/// A filtered, measured mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedFs {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub usage: FsUsage,
}

pub async fn read_kernel_version(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<String, ReadError> {
    let content = read_string(fs, &paths.version).await?;
    Ok(parse_kernel_version(&content)?)
}

pub async fn read_uptime(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<Duration, ReadError> {
    let content = read_string(fs, &paths.uptime).await?;
    Ok(parse_uptime(&content)?)
}

pub async fn read_load_avg(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<LoadAvg, ReadError> {
    let content = read_string(fs, &paths.loadavg).await?;
    Ok(parse_loadavg(&content)?)
}

pub async fn read_mem_info(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<MemInfo, ReadError> {
    let content = read_string(fs, &paths.meminfo).await?;
    Ok(parse_meminfo(&content)?)
}

pub async fn read_cpu_cores(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<usize, ReadError> {
    let content = read_string(fs, &paths.cpuinfo).await?;
    Ok(parse_cpu_count(&content))
}

/// Number of PID directories under the proc root.
pub async fn read_task_count(fs: &dyn RemoteFs, paths: &ProcPaths) -> Result<u64, ReadError> {
    let pids = fs.list_pid_dirs(&paths.proc_root).await?;
    Ok(pids.len() as u64)
}

/// Mount table restricted to real filesystems, each with its statvfs
/// answer. Mounts whose statvfs fails are skipped, not fatal.
pub async fn read_disk_mounts(
    fs: &dyn RemoteFs,
    paths: &ProcPaths,
) -> Result<Vec<MountedFs>, ReadError> {
    let content = read_string(fs, &paths.mounts).await?;
    let mounts = parse_mounts(&content)?;

    let mut result = Vec::new();
    for m in mounts {
        if !is_monitored_fs(&m.fs_type) {
            continue;
        }
        let Ok(usage) = fs.stat_mount_point(&m.mount_point).await else {
            continue;
        };
        result.push(MountedFs {
            device: m.device,
            mount_point: m.mount_point,
            fs_type: m.fs_type,
            usage,
        });
    }
    Ok(result)
}

pub fn is_monitored_fs(fs_type: &str) -> bool {
    FSTYPES.contains(&fs_type)
}

/// Per-interface addresses, formatted `address/prefix`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceAddrs {
    pub ipv4: HashMap<String, String>,
    pub ipv6: HashMap<String, String>,
}

/// Resolves per-interface addresses for IPv4 and IPv6.
pub async fn read_interface_addrs(
    fs: &dyn RemoteFs,
    paths: &ProcPaths,
) -> Result<InterfaceAddrs, ReadError> {
    let trie = read_string(fs, &paths.fib_trie).await?;
    let route = read_string(fs, &paths.route).await?;
    let inet6 = read_string(fs, &paths.if_inet6).await?;

    let mut ipv4 = HashMap::new();
    for entry in procfs::parse_fib_trie(&trie, &route)? {
        ipv4.entry(entry.iface)
            .or_insert_with(|| format!("{}/{}", entry.address, entry.prefix));
    }

    let mut ipv6 = HashMap::new();
    for entry in procfs::parse_if_inet6(&inet6)? {
        ipv6.entry(entry.iface)
            .or_insert_with(|| format!("{}/{}", entry.address, entry.prefix));
    }

    Ok(InterfaceAddrs { ipv4, ipv6 })
}
