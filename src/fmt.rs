//! Shared formatting helpers for view layers.

use std::time::Duration;

/// Formats an uptime as `NNNNdays HH:MM:SS` with the colour tags the view
/// layer understands.
pub fn format_uptime(d: Duration) -> String {
    let total = d.as_secs();
    let seconds = total % 60;
    let minutes = (total / 60) % 60;
    let hours = (total / 3600) % 24;
    let days = total / 86400;

    format!("{days:4}[gray]days[none] {hours:02}:{minutes:02}:{seconds:02}")
}

/// Cell widths of a stacked percent bar: one width per fraction, truncated
/// the way terminal bars are drawn. The remainder of `length` is background.
pub fn segment_widths(fractions: &[f64], length: usize) -> Vec<usize> {
    fractions
        .iter()
        .map(|f| (f.clamp(0.0, 1.0) * length as f64) as usize)
        .collect()
}

const BYTE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Formats a byte count with SI units, one decimal above the base unit.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let exp = (bytes as f64).log(1000.0).floor() as usize;
    let exp = exp.min(BYTE_UNITS.len() - 1);
    let value = bytes as f64 / 1000f64.powi(exp as i32);
    format!("{value:.1} {}", BYTE_UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_format() {
        let d = Duration::from_secs(12 * 86400 + 3 * 3600 + 4 * 60 + 5);
        assert_eq!(format_uptime(d), "  12[gray]days[none] 03:04:05");
        assert_eq!(format_uptime(Duration::ZERO), "   0[gray]days[none] 00:00:00");
    }

    #[test]
    fn segment_widths_truncate() {
        // 40% user + 20% kernel on a 30-cell bar: 12 and 6 cells
        assert_eq!(segment_widths(&[0.4, 0.2], 30), vec![12, 6]);
        assert_eq!(segment_widths(&[0.999], 10), vec![9]);
        assert_eq!(segment_widths(&[-0.5, 1.5], 10), vec![0, 10]);
    }

    #[test]
    fn byte_format() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1.0 kB");
        assert_eq!(format_bytes(1_234_000), "1.2 MB");
        assert_eq!(format_bytes(8_589_934_592), "8.6 GB");
    }
}
