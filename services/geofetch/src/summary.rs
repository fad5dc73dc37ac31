//! One-line statistics for printed bands.

use ndarray::ArrayViewD;

pub struct BandSummary;

impl BandSummary {
    pub fn header() -> String {
        format!(
            "{:<16} {:>10} {:>14} {:>14} {:>14}",
            "band", "valid", "min", "max", "mean"
        )
    }
}

/// Name, count of non-NaN cells, and their min / max / mean.
pub fn band_summary(name: &str, data: ArrayViewD<'_, f64>) -> String {
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in data.iter().filter(|v| !v.is_nan()) {
        count += 1;
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    if count == 0 {
        return format!("{:<16} {:>10} {:>14} {:>14} {:>14}", name, 0, "-", "-", "-");
    }
    format!(
        "{:<16} {:>10} {:>14.4} {:>14.4} {:>14.4}",
        name,
        count,
        min,
        max,
        sum / count as f64
    )
}
