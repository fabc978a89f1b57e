//! Pre-built host fixtures for tests and the demo binary.

use super::HostFixture;

/// `/proc/stat` content with an aggregate line and two cores. `user` and
/// `idle` are split evenly across the cores; advance them between ticks to
/// simulate activity.
pub fn stat_content(user: u64, idle: u64) -> String {
    format!(
        "cpu  {user} 0 0 {idle} 0 0 0 0 0 0\n\
         cpu0 {h_user} 0 0 {h_idle} 0 0 0 0 0 0\n\
         cpu1 {h_user} 0 0 {h_idle} 0 0 0 0 0 0\n\
         ctxt 500000\n\
         btime 1700000000\n",
        h_user = user / 2,
        h_idle = idle / 2,
    )
}

/// `/proc/net/dev` content for `lo` and `eth0` with the given eth0
/// counters.
pub fn net_dev_content(rx_bytes: u64, rx_packets: u64, tx_bytes: u64, tx_packets: u64) -> String {
    format!(
        "Inter-|   Receive                                                |  Transmit\n \
         face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
         lo:       0        0    0    0    0     0          0         0        0        0    0    0    0     0       0          0\n  \
         eth0: {rx_bytes} {rx_packets}    0    0    0     0          0         0 {tx_bytes} {tx_packets}    0    0    0     0       0          0\n"
    )
}

/// `/proc/diskstats` content for `sda` and `sda1` with the given sda1
/// sector counters.
pub fn diskstats_content(read_sectors: u64, write_sectors: u64) -> String {
    format!(
        "   8       0 sda 100 0 {rs2} 100 50 0 {ws2} 200 0 150 300 0 0 0 0\n   \
         8       1 sda1 100 0 {read_sectors} 100 50 0 {write_sectors} 200 0 150 300 0 0 0 0\n",
        rs2 = read_sectors * 2,
        ws2 = write_sectors * 2,
    )
}

pub const MEMINFO: &str = "\
MemTotal:        8388608 kB
MemFree:         4194304 kB
MemAvailable:    6291456 kB
Buffers:          262144 kB
Cached:          1048576 kB
SwapCached:            0 kB
SwapTotal:       2097152 kB
SwapFree:        2097152 kB
";

pub const MOUNTS: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec 0 0
sysfs /sys sysfs rw,nosuid,nodev,noexec 0 0
/dev/sda2 /boot vfat rw 0 0
";

pub const FIB_TRIE: &str = "\
Main:
  +-- 0.0.0.0/0 3 0 5
     |-- 127.0.0.0
        /8 host LOCAL
  +-- 192.168.10.0/24 2 0 2
     |-- 192.168.10.0
        /32 link BROADCAST
     |-- 192.168.10.7
        /32 host LOCAL
";

pub const ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t010AA8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t000AA8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
";

pub const IF_INET6: &str = "\
00000000000000000000000000000001 01 80 10 80       lo
fe80000000000000025056fffeb70ced 02 40 20 80     eth0
";

pub const CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: test cpu

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: test cpu
";

pub const VERSION: &str =
    "Linux version 6.1.0-13-amd64 (builder@host) (gcc-12) #1 SMP PREEMPT_DYNAMIC\n";

/// A healthy two-core host with one real disk, one boot partition and a
/// single external interface.
pub fn typical_host() -> HostFixture {
    HostFixture::default()
        .file("/proc/stat", stat_content(10_000, 80_000))
        .file("/proc/cpuinfo", CPUINFO)
        .file("/proc/meminfo", MEMINFO)
        .file("/proc/uptime", "12345.67 23456.78\n")
        .file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n")
        .file("/proc/mounts", MOUNTS)
        .file("/proc/diskstats", diskstats_content(4_000, 2_000))
        .file("/proc/version", VERSION)
        .file("/proc/net/dev", net_dev_content(10_000, 80, 5_000, 40))
        .file("/proc/net/fib_trie", FIB_TRIE)
        .file("/proc/net/route", ROUTE)
        .file("/proc/net/if_inet6", IF_INET6)
        .dir(
            "/proc",
            &["1", "2", "120", "4281", "cpuinfo", "stat", "net", "irq"],
        )
        .mount_usage("/", 100_000_000_000, 40_000_000_000, 60_000_000_000)
        .mount_usage("/boot", 500_000_000, 100_000_000, 400_000_000)
}

/// A host whose diskstats expose a device-mapper volume under its `md-`
/// name.
pub fn mapper_host() -> HostFixture {
    typical_host()
        .file(
            "/proc/diskstats",
            "   8       0 sda1 100 0 4000 100 50 0 2000 200 0 150 300 0 0 0 0\n \
             253       0 md-2 700 0 9000 100 300 0 5000 200 0 150 300 0 0 0 0\n",
        )
        .file("/sys/block/md-2/dm/name", "vg0-root\n")
}
