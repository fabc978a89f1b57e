//! Terminal glyph encoders for numeric series.
//!
//! Two pure encoders: a one-glyph-per-sample sparkline over the eight block
//! heights, and a two-samples-per-column Braille line with colour tags
//! bucketed by magnitude. Both are deterministic; callers pick the window
//! and the min/max scale.

const SPARKLINE_TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Braille glyph for a (left, right) bucket pair; rows are the left bucket.
const BRAILLE_PAIRS: [[char; 5]; 5] = [
    ['⠀', '⢀', '⢠', '⢰', '⢸'],
    ['⡀', '⣀', '⣠', '⣰', '⣸'],
    ['⡄', '⣄', '⣤', '⣴', '⣼'],
    ['⡆', '⣆', '⣦', '⣶', '⣾'],
    ['⡇', '⣇', '⣧', '⣷', '⣿'],
];

/// Encodes a series as one block glyph per sample.
///
/// An empty series yields an empty string. When the scale collapses
/// (`max − min < 1e-7`) every sample maps to the lowest glyph.
pub fn sparkline(data: &[f64], min: f64, max: f64) -> String {
    if data.is_empty() {
        return String::new();
    }

    if (max - min).abs() < 1e-7 {
        return std::iter::repeat_n(SPARKLINE_TICKS[0], data.len()).collect();
    }

    let scale = 7.0 / (max - min);
    data.iter()
        .map(|n| {
            let tick = ((n - min) * scale).round().clamp(0.0, 7.0) as usize;
            SPARKLINE_TICKS[tick]
        })
        .collect()
}

/// Magnitude bucket of one sample: negative, then quarters of 0..100.
fn bucket(value: f64) -> usize {
    if value < 0.0 {
        0
    } else if value < 25.0 {
        1
    } else if value < 50.0 {
        2
    } else if value < 75.0 {
        3
    } else {
        4
    }
}

/// Colour tag wrapping for a column, chosen by its larger bucket.
fn paint(glyph: char, level: usize) -> String {
    match level {
        4 => format!("[#fa1e1e]{glyph}[none]"),
        3 => format!("[#E78101]{glyph}[none]"),
        2 => format!("[#f2e266]{glyph}[none]"),
        1 => format!("[#4897d4]{glyph}[none]"),
        _ => glyph.to_string(),
    }
}

/// Encodes a series as Braille columns, two samples per column.
///
/// Values are expected in percent (0..100). A trailing odd sample pairs
/// with zero. The output holds exactly ⌈N/2⌉ columns.
pub fn braille_line(data: &[f64]) -> String {
    let mut out = String::new();
    for pair in data.chunks(2) {
        let left = bucket(pair[0]);
        let right = bucket(pair.get(1).copied().unwrap_or(0.0));
        out.push_str(&paint(BRAILLE_PAIRS[left][right], left.max(right)));
    }
    out
}

/// Number of columns `braille_line` produces for a series of `n` samples.
pub fn braille_columns(n: usize) -> usize {
    n.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkline_empty_series() {
        assert_eq!(sparkline(&[], 0.0, 100.0), "");
    }

    #[test]
    fn sparkline_glyph_count_and_alphabet() {
        let data: Vec<f64> = (0..17).map(|i| i as f64 * 6.0).collect();
        let line = sparkline(&data, 0.0, 100.0);
        assert_eq!(line.chars().count(), 17);
        assert!(line.chars().all(|c| SPARKLINE_TICKS.contains(&c)));
    }

    #[test]
    fn sparkline_constant_series_is_floor() {
        let line = sparkline(&[42.0, 42.0, 42.0], 42.0, 42.0);
        assert_eq!(line, "▁▁▁");
    }

    #[test]
    fn sparkline_three_point_ramp() {
        // 0 → ▁, 100 → █; the midpoint may round to either side.
        let line: Vec<char> = sparkline(&[0.0, 50.0, 100.0], 0.0, 100.0).chars().collect();
        assert_eq!(line[0], '▁');
        assert!(line[1] == '▄' || line[1] == '▅');
        assert_eq!(line[2], '█');
    }

    #[test]
    fn sparkline_clamps_out_of_range() {
        let line: Vec<char> = sparkline(&[-50.0, 500.0], 0.0, 100.0).chars().collect();
        assert_eq!(line[0], '▁');
        assert_eq!(line[1], '█');
    }

    #[test]
    fn braille_column_count() {
        for n in 0..9 {
            let data = vec![10.0; n];
            let line = braille_line(&data);
            // every column of a 10% series renders bucket (1,1) = ⣀
            assert_eq!(line.matches('⣀').count(), braille_columns(n), "n = {n}");
        }
    }

    #[test]
    fn braille_buckets_and_colours() {
        // 90 pairs with 90: bucket (4,4) → ⣿ wrapped in red.
        assert_eq!(braille_line(&[90.0, 90.0]), "[#fa1e1e]⣿[none]");
        // 60 with 30: buckets (3,2) → ⣶ wrapped in orange.
        assert_eq!(braille_line(&[60.0, 30.0]), "[#E78101]⣶[none]");
        // 30 with 10: buckets (2,1) → ⣤ in yellow.
        assert_eq!(braille_line(&[30.0, 10.0]), "[#f2e266]⣤[none]");
        // 10 with 10: buckets (1,1) → ⣀ in blue.
        assert_eq!(braille_line(&[10.0, 10.0]), "[#4897d4]⣀[none]");
        // negatives land in bucket zero: blank, no tag.
        assert_eq!(braille_line(&[-1.0, -1.0]), "⠀");
    }

    #[test]
    fn braille_trailing_odd_sample_pairs_with_zero() {
        // single 80% sample pairs with 0.0: buckets (4, 1) → ⣇ in red.
        assert_eq!(braille_line(&[80.0]), "[#fa1e1e]⣇[none]");
    }
}
