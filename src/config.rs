//! Runtime knobs for the sampling engine.
//!
//! The struct derives `Deserialize` so an external configuration loader can
//! populate it; every field falls back to the documented default.

use std::time::Duration;

use serde::Deserialize;

/// Tunables for samplers, reconnects and snapshot windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Period of the per-host raw counter pull, in milliseconds.
    pub sample_period_ms: u64,
    /// Period of the global reconnect sweep, in milliseconds.
    pub reconnect_period_ms: u64,
    /// Transport keepalive interval, in seconds.
    pub keep_alive_seconds: u64,
    /// Capacity of every per-metric sample series.
    pub series_capacity: usize,
    /// Number of samples feeding the CPU sparkline.
    pub sparkline_window: usize,
    /// Number of samples feeding the CPU braille line.
    pub braille_window: usize,
    /// Number of rate samples exposed per disk/net snapshot entry.
    pub io_snapshot_window: usize,
    /// Upper bound on transport establishment, in seconds.
    pub connect_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_period_ms: 2000,
            reconnect_period_ms: 5000,
            keep_alive_seconds: 1,
            series_capacity: 480,
            sparkline_window: 11,
            braille_window: 22,
            io_snapshot_window: 50,
            connect_timeout_seconds: 5,
        }
    }
}

impl Config {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn reconnect_period(&self) -> Duration {
        Duration::from_millis(self.reconnect_period_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Deadline for a single read through the gateway. Capped at the sample
    /// period so a stuck host cannot starve its own tick loop.
    pub fn read_deadline(&self) -> Duration {
        self.sample_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sample_period_ms, 2000);
        assert_eq!(cfg.reconnect_period_ms, 5000);
        assert_eq!(cfg.keep_alive_seconds, 1);
        assert_eq!(cfg.series_capacity, 480);
        assert_eq!(cfg.sparkline_window, 11);
        assert_eq!(cfg.braille_window, 22);
        assert_eq!(cfg.io_snapshot_window, 50);
        assert_eq!(cfg.connect_timeout_seconds, 5);
    }

    #[test]
    fn read_deadline_tracks_sample_period() {
        let cfg = Config {
            sample_period_ms: 750,
            ..Config::default()
        };
        assert_eq!(cfg.read_deadline(), Duration::from_millis(750));
    }
}
