//! Derivations over counter samples.
//!
//! This module is the single source of truth for turning cumulative kernel
//! counters into the figures the snapshot exposes: CPU utilization deltas,
//! per-core decomposition, first-difference rates, and axis scaling for the
//! graph encoders.

use crate::procfs::CpuTicks;
use crate::series::SampleSeries;

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute u64 delta, returning `None` on counter regression (reset).
pub fn du64(curr: u64, prev: u64) -> Option<u64> {
    (curr >= prev).then_some(curr - prev)
}

/// The outcome of deriving one rate slot from adjacent counter samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStep {
    /// Normal first difference.
    Rate(u64),
    /// First sample of a series: a single zero slot.
    Baseline,
    /// Counter went backwards: emit zero and reset the source series.
    Reset,
}

/// Derives the next rate slot from the previous counter value (if any) and
/// the current one.
pub fn next_rate(prev: Option<u64>, curr: u64) -> RateStep {
    match prev {
        None => RateStep::Baseline,
        Some(p) => match du64(curr, p) {
            Some(d) => RateStep::Rate(d),
            None => RateStep::Reset,
        },
    }
}

// ---------------------------------------------------------------------------
// CPU utilization
// ---------------------------------------------------------------------------

/// Overall utilization percentage between two tick samples.
///
/// `(Δtotal − Δidle) / Δtotal × 100`, zero when the total did not advance.
pub fn cpu_percent(prev: &CpuTicks, later: &CpuTicks) -> f64 {
    let total_p = prev.total() as f64;
    let total_l = later.total() as f64;
    let total_diff = total_l - total_p;
    if total_diff <= 0.0 {
        return 0.0;
    }

    let idle_diff = later.idle as f64 - prev.idle as f64;
    (total_diff - idle_diff) / total_diff * 100.0
}

/// Fractions of one core's busy time, used for stacked per-core bars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoreUsage {
    /// Niced user time ("Low").
    pub low: f64,
    /// Plain user time ("Normal").
    pub normal: f64,
    /// System time ("Kernel").
    pub kernel: f64,
    /// Guest time.
    pub guest: f64,
    /// Busy fraction of the interval, 0.0..=1.0.
    pub total: f64,
}

/// Per-core decomposition between two tick samples. Cores present in only
/// one of the samples are skipped.
pub fn per_core_usage(prev: &[CpuTicks], later: &[CpuTicks]) -> Vec<CoreUsage> {
    let cores = prev.len().min(later.len());
    let mut usages = Vec::with_capacity(cores);

    for i in 0..cores {
        let p = &prev[i];
        let l = &later[i];

        let total_diff = l.total() as f64 - p.total() as f64;
        if total_diff <= 0.0 {
            usages.push(CoreUsage::default());
            continue;
        }
        let idle_diff = l.idle as f64 - p.idle as f64;

        let frac = |lv: u64, pv: u64| (lv as f64 - pv as f64) / total_diff;
        usages.push(CoreUsage {
            low: frac(l.nice, p.nice),
            normal: frac(l.user, p.user),
            kernel: frac(l.system, p.system),
            guest: frac(l.guest, p.guest),
            total: (total_diff - idle_diff) / total_diff,
        });
    }

    usages
}

/// Utilization of the last `window` adjacent sample pairs, oldest first,
/// zero-padded at the front when the series holds fewer pairs. Feeds the
/// sparkline and braille summaries.
pub fn utilization_window<T, F>(series: &SampleSeries<T>, window: usize, ticks: F) -> Vec<f64>
where
    F: Fn(&T) -> &CpuTicks,
{
    let mut usages = Vec::with_capacity(window);
    for i in (0..window).rev() {
        match (series.nth_back(i + 1), series.nth_back(i)) {
            (Some(prev), Some(later)) => usages.push(cpu_percent(ticks(prev), ticks(later))),
            _ => usages.push(0.0),
        }
    }
    usages
}

// ---------------------------------------------------------------------------
// Graph scaling
// ---------------------------------------------------------------------------

/// Rounds an observed maximum up to the next multiple of its order of
/// magnitude, for a stable graph axis. Zero maps to 10.
pub fn scale_max(max: f64) -> f64 {
    if max <= 0.0 {
        return 10.0;
    }

    let scale = 10f64.powf(max.log10().floor());
    (max / scale).ceil() * scale
}

/// Largest value in a slice, zero for an empty one.
pub fn slice_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(user: u64, idle: u64) -> CpuTicks {
        CpuTicks {
            user,
            idle,
            ..CpuTicks::default()
        }
    }

    #[test]
    fn du64_regression_yields_none() {
        assert_eq!(du64(10, 4), Some(6));
        assert_eq!(du64(4, 4), Some(0));
        assert_eq!(du64(3, 4), None);
    }

    #[test]
    fn next_rate_steps() {
        assert_eq!(next_rate(None, 100), RateStep::Baseline);
        assert_eq!(next_rate(Some(100), 175), RateStep::Rate(75));
        assert_eq!(next_rate(Some(10_000), 500), RateStep::Reset);
    }

    #[test]
    fn cpu_percent_basic() {
        // Δtotal = 100, Δidle = 25 → 75%.
        let p = ticks(100, 100);
        let l = ticks(175, 125);
        assert!((cpu_percent(&p, &l) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_percent_no_progress_is_zero() {
        let p = ticks(100, 100);
        assert_eq!(cpu_percent(&p, &p), 0.0);
    }

    #[test]
    fn cpu_percent_fully_idle() {
        let p = ticks(100, 100);
        let l = ticks(100, 200);
        assert!(cpu_percent(&p, &l).abs() < 1e-9);
    }

    #[test]
    fn per_core_decomposition() {
        let p = vec![CpuTicks {
            user: 100,
            nice: 10,
            system: 50,
            idle: 840,
            ..CpuTicks::default()
        }];
        let l = vec![CpuTicks {
            user: 140,
            nice: 20,
            system: 70,
            idle: 870,
            ..CpuTicks::default()
        }];

        let usages = per_core_usage(&p, &l);
        assert_eq!(usages.len(), 1);
        let u = &usages[0];
        // Δtotal = 100: user 40%, nice 10%, system 20%, idle 30%.
        assert!((u.normal - 0.4).abs() < 1e-9);
        assert!((u.low - 0.1).abs() < 1e-9);
        assert!((u.kernel - 0.2).abs() < 1e-9);
        assert!((u.guest - 0.0).abs() < 1e-9);
        assert!((u.total - 0.7).abs() < 1e-9);
    }

    #[test]
    fn per_core_handles_core_count_change() {
        let p = vec![ticks(100, 100); 2];
        let l = vec![ticks(150, 150); 1];
        assert_eq!(per_core_usage(&p, &l).len(), 1);
    }

    #[test]
    fn utilization_window_pads_and_orders() {
        let mut series = SampleSeries::new(8);
        series.push(ticks(100, 100));
        series.push(ticks(175, 125)); // 75%
        series.push(ticks(175, 225)); // 0%

        let w = utilization_window(&series, 4, |t| t);
        assert_eq!(w.len(), 4);
        assert_eq!(w[0], 0.0); // padding
        assert_eq!(w[1], 0.0); // padding
        assert!((w[2] - 75.0).abs() < 1e-9);
        assert!(w[3].abs() < 1e-9);
    }

    #[test]
    fn scale_max_rounds_to_magnitude() {
        assert_eq!(scale_max(237.0), 300.0);
        assert_eq!(scale_max(0.0), 10.0);
        assert_eq!(scale_max(9.0), 10.0);
        assert_eq!(scale_max(100.0), 100.0);
        assert_eq!(scale_max(1001.0), 2000.0);
    }

    #[test]
    fn slice_max_of_empty_is_zero() {
        assert_eq!(slice_max(&[]), 0.0);
        assert_eq!(slice_max(&[1.0, 9.0, 3.0]), 9.0);
    }
}
