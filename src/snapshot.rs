//! Read-only views for the View collaborator.
//!
//! A snapshot is assembled per host: series-derived figures are copied
//! under the host read lock, instantaneous facts are read through the
//! gateway on demand. Every optional field degrades to `None` when the
//! host is dead or its read failed; the view never holds a reference into
//! a ring buffer.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::graph;
use crate::rates;
use crate::sampler::{self, Host};

/// Consistent per-host slice of the fleet's observable state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetSnapshot {
    pub hosts: Vec<HostSnapshot>,
}

impl FleetSnapshot {
    pub fn host(&self, id: &str) -> Option<&HostSnapshot> {
        self.hosts.iter().find(|h| h.id == id)
    }
}

/// Everything the view shows about one host.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostSnapshot {
    pub id: String,
    pub alive: bool,
    pub uptime: Option<Duration>,
    pub kernel: Option<String>,
    pub load_avg: Option<LoadSnapshot>,
    pub tasks: Option<u64>,
    pub cpu_cores: Option<usize>,
    pub cpu_pct: Option<f64>,
    pub cpu_spark: Option<String>,
    pub cpu_braille: Option<String>,
    pub per_core: Option<Vec<CoreSnapshot>>,
    pub mem: Option<MemSnapshot>,
    pub disks: Option<Vec<DiskSnapshot>>,
    pub nets: Option<Vec<NetSnapshot>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadSnapshot {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Busy-time split of one core, fractions of the last interval.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CoreSnapshot {
    pub low: f64,
    pub normal: f64,
    pub kernel: f64,
    pub guest: f64,
    pub total: f64,
}

/// Memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemSnapshot {
    pub used: u64,
    pub total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
    pub buf_cached: u64,
}

/// One monitored mountpoint with its recent I/O rates, newest last.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskSnapshot {
    pub device: String,
    pub mount_point: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub read_bps: Vec<u64>,
    pub write_bps: Vec<u64>,
}

/// One interface with its addresses and recent rates, newest last.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetSnapshot {
    pub iface: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub rx_bps: Vec<u64>,
    pub tx_bps: Vec<u64>,
    pub rx_pps: Vec<u64>,
    pub tx_pps: Vec<u64>,
}

struct SeriesView {
    cpu_pct: Option<f64>,
    cpu_spark: Option<String>,
    cpu_braille: Option<String>,
    per_core: Option<Vec<CoreSnapshot>>,
    disk_windows: HashMap<String, (Vec<u64>, Vec<u64>)>,
    net_windows: HashMap<String, (Vec<u64>, Vec<u64>, Vec<u64>, Vec<u64>)>,
}

/// Assembles the snapshot of one host.
pub(crate) async fn host_snapshot(host: &Host) -> HostSnapshot {
    let mut snap = HostSnapshot {
        id: host.id().to_string(),
        ..HostSnapshot::default()
    };

    // Series-derived values are copied under the read lock; the gateway
    // handle comes out with them so the fact reads below run lock-free.
    let (gateway, view) = {
        let inner = host.inner.read().await;
        let gateway = match &inner.session {
            Some(s) if s.is_alive() => Some(s.gateway()),
            _ => None,
        };
        (gateway, series_view(host, &inner.series))
    };

    let Some(gateway) = gateway else {
        return snap;
    };
    let fs = gateway.as_ref();

    snap.alive = true;
    snap.cpu_pct = view.cpu_pct;
    snap.cpu_spark = view.cpu_spark;
    snap.cpu_braille = view.cpu_braille;
    snap.per_core = view.per_core;

    let paths = host.paths();

    match sampler::read_kernel_version(fs, paths).await {
        Ok(kernel) => snap.kernel = Some(kernel),
        Err(err) => host.warn_once("kernel", &err),
    }
    match sampler::read_uptime(fs, paths).await {
        Ok(uptime) => snap.uptime = Some(uptime),
        Err(err) => host.warn_once("uptime", &err),
    }
    match sampler::read_load_avg(fs, paths).await {
        Ok(load) => {
            snap.load_avg = Some(LoadSnapshot {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            });
        }
        Err(err) => host.warn_once("loadavg", &err),
    }
    match sampler::read_task_count(fs, paths).await {
        Ok(tasks) => snap.tasks = Some(tasks),
        Err(err) => host.warn_once("tasks", &err),
    }
    match sampler::read_cpu_cores(fs, paths).await {
        Ok(cores) => snap.cpu_cores = Some(cores),
        Err(err) => host.warn_once("cpu-cores", &err),
    }
    match sampler::read_mem_info(fs, paths).await {
        Ok(mem) => {
            snap.mem = Some(MemSnapshot {
                used: mem.used_bytes(),
                total: mem.total_bytes(),
                swap_used: mem.swap_used_bytes(),
                swap_total: mem.swap_total_bytes(),
                buf_cached: mem.buf_cached_bytes(),
            });
        }
        Err(err) => host.warn_once("mem", &err),
    }
    match sampler::read_disk_mounts(fs, paths).await {
        Ok(mounts) => {
            let mut disks = Vec::with_capacity(mounts.len());
            for m in mounts {
                let (read_bps, write_bps) =
                    view.disk_windows.get(&m.device).cloned().unwrap_or_default();
                disks.push(DiskSnapshot {
                    device: m.device,
                    mount_point: m.mount_point,
                    total: m.usage.total,
                    used: m.usage.used,
                    free: m.usage.free,
                    read_bps,
                    write_bps,
                });
            }
            snap.disks = Some(disks);
        }
        Err(err) => host.warn_once("disks", &err),
    }

    let addrs = match sampler::read_interface_addrs(fs, paths).await {
        Ok(addrs) => addrs,
        Err(err) => {
            host.warn_once("interface-addrs", &err);
            sampler::InterfaceAddrs::default()
        }
    };
    let mut nets: Vec<NetSnapshot> = view
        .net_windows
        .into_iter()
        .map(|(iface, (rx_bps, tx_bps, rx_pps, tx_pps))| NetSnapshot {
            ipv4: addrs.ipv4.get(&iface).cloned(),
            ipv6: addrs.ipv6.get(&iface).cloned(),
            iface,
            rx_bps,
            tx_bps,
            rx_pps,
            tx_pps,
        })
        .collect();
    nets.sort_by(|a, b| a.iface.cmp(&b.iface));
    snap.nets = Some(nets);

    snap
}

/// Copies everything snapshot-worthy out of the ring buffers.
fn series_view(host: &Host, series: &sampler::HostSeries) -> SeriesView {
    let cfg = host.config();
    let enough_cpu = series.cpu.len() >= 2;

    let cpu_pct = enough_cpu.then(|| {
        let later = series.cpu.nth_back(0).map(|s| &s.stat.all);
        let prev = series.cpu.nth_back(1).map(|s| &s.stat.all);
        match (prev, later) {
            (Some(p), Some(l)) => rates::cpu_percent(p, l),
            _ => 0.0,
        }
    });

    let cpu_spark = enough_cpu.then(|| {
        let window =
            rates::utilization_window(&series.cpu, cfg.sparkline_window.saturating_sub(1), |s| {
                &s.stat.all
            });
        graph::sparkline(&window, 0.0, 100.0)
    });

    let cpu_braille = enough_cpu.then(|| {
        let window =
            rates::utilization_window(&series.cpu, cfg.braille_window.saturating_sub(1), |s| {
                &s.stat.all
            });
        graph::braille_line(&window)
    });

    let per_core = enough_cpu.then(|| {
        let later = series.cpu.nth_back(0).map(|s| &s.stat.per_core);
        let prev = series.cpu.nth_back(1).map(|s| &s.stat.per_core);
        match (prev, later) {
            (Some(p), Some(l)) => rates::per_core_usage(p, l)
                .into_iter()
                .map(|u| CoreSnapshot {
                    low: u.low,
                    normal: u.normal,
                    kernel: u.kernel,
                    guest: u.guest,
                    total: u.total,
                })
                .collect(),
            _ => Vec::new(),
        }
    });

    let window = cfg.io_snapshot_window;
    let disk_windows = series
        .disk_rates
        .iter()
        .map(|(device, r)| {
            (
                device.clone(),
                (r.read_bps.tail_window(window), r.write_bps.tail_window(window)),
            )
        })
        .collect();
    let net_windows = series
        .net_rates
        .iter()
        .map(|(iface, r)| {
            (
                iface.clone(),
                (
                    r.rx_bps.tail_window(window),
                    r.tx_bps.tail_window(window),
                    r.rx_pps.tail_window(window),
                    r.tx_pps.tail_window(window),
                ),
            )
        })
        .collect();

    SeriesView {
        cpu_pct,
        cpu_spark,
        cpu_braille,
        per_core,
        disk_windows,
        net_windows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mock::{MockFleet, fixtures};
    use crate::sampler::sample_host;

    async fn connected_host(fleet: &MockFleet, id: &str) -> Host {
        let host = Host::new(id, fleet.transport(), Config::default());
        assert!(host.reconnect().await);
        host
    }

    #[tokio::test]
    async fn dead_host_yields_empty_snapshot() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = Host::new("a", fleet.transport(), Config::default());

        let snap = host_snapshot(&host).await;
        assert_eq!(snap.id, "a");
        assert!(!snap.alive);
        assert!(snap.cpu_pct.is_none());
        assert!(snap.mem.is_none());
        assert!(snap.disks.is_none());
        assert!(snap.nets.is_none());
    }

    #[tokio::test]
    async fn alive_host_fills_facts() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = connected_host(&fleet, "a").await;

        let snap = host_snapshot(&host).await;
        assert!(snap.alive);
        assert_eq!(snap.kernel.as_deref(), Some("Linux version 6.1.0-13-amd64"));
        assert_eq!(snap.tasks, Some(4));
        assert_eq!(snap.cpu_cores, Some(2));
        assert_eq!(snap.uptime.unwrap().as_secs(), 12345);

        let mem = snap.mem.unwrap();
        assert_eq!(mem.total, 8_388_608 * 1024);
        assert_eq!(
            mem.used,
            (8_388_608u64 - 4_194_304 - 262_144 - 1_048_576) * 1024
        );
        assert_eq!(mem.buf_cached, (262_144u64 + 1_048_576) * 1024);

        // one sample only: derived CPU fields stay absent
        assert!(snap.cpu_pct.is_none());
        assert!(snap.cpu_spark.is_none());
        assert!(snap.cpu_braille.is_none());
    }

    #[tokio::test]
    async fn derived_cpu_fields_need_two_samples() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = connected_host(&fleet, "a").await;

        sample_host(&host).await;
        let snap = host_snapshot(&host).await;
        assert!(snap.cpu_pct.is_none());

        fleet.set_file("a", "/proc/stat", fixtures::stat_content(10_075, 80_025));
        sample_host(&host).await;
        let snap = host_snapshot(&host).await;
        // Δtotal = 100, Δidle = 25 → 75%
        let pct = snap.cpu_pct.unwrap();
        assert!((pct - 75.0).abs() < 1e-6, "pct = {pct}");
        assert!(snap.cpu_spark.is_some());
        assert!(snap.cpu_braille.is_some());
        assert_eq!(snap.per_core.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disks_join_mounts_with_rate_windows() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = connected_host(&fleet, "a").await;

        sample_host(&host).await;
        fleet.set_file("a", "/proc/diskstats", fixtures::diskstats_content(4_100, 2_050));
        sample_host(&host).await;

        let snap = host_snapshot(&host).await;
        let disks = snap.disks.unwrap();
        let mounts: Vec<&str> = disks.iter().map(|d| d.mount_point.as_str()).collect();
        assert_eq!(mounts, vec!["/", "/boot"]);

        let root = &disks[0];
        assert_eq!(root.device, "/dev/sda1");
        assert_eq!(root.total, 100_000_000_000);
        assert_eq!(root.read_bps.len(), Config::default().io_snapshot_window);
        assert_eq!(*root.read_bps.last().unwrap(), 100 * 512);
        // /boot has no matching diskstats device: windows stay empty
        assert!(disks[1].read_bps.is_empty());
    }

    #[tokio::test]
    async fn nets_carry_addresses_and_windows() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = connected_host(&fleet, "a").await;

        sample_host(&host).await;
        fleet.set_file("a", "/proc/net/dev", fixtures::net_dev_content(13_000, 95, 6_000, 50));
        sample_host(&host).await;

        let snap = host_snapshot(&host).await;
        let nets = snap.nets.unwrap();
        assert_eq!(nets.len(), 2); // eth0 + lo, sorted
        let eth0 = nets.iter().find(|n| n.iface == "eth0").unwrap();
        assert_eq!(eth0.ipv4.as_deref(), Some("192.168.10.7/24"));
        assert!(eth0.ipv6.as_deref().unwrap().starts_with("fe80::"));
        assert_eq!(*eth0.rx_bps.last().unwrap(), 3_000);
        assert_eq!(*eth0.tx_bps.last().unwrap(), 1_000);
        assert_eq!(*eth0.rx_pps.last().unwrap(), 15);
        assert_eq!(*eth0.tx_pps.last().unwrap(), 10);
    }

    #[tokio::test]
    async fn single_failed_read_degrades_only_its_field() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let host = connected_host(&fleet, "a").await;

        fleet.remove_file("a", "/proc/meminfo");
        let snap = host_snapshot(&host).await;
        assert!(snap.alive);
        assert!(snap.mem.is_none());
        assert!(snap.kernel.is_some());
        assert!(snap.tasks.is_some());
    }
}
