/// Scale that turns a median absolute deviation into a standard deviation
/// estimate for normally distributed values.
pub const NORMAL_MAD_DIVISOR: f64 = 0.6745;

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Median, averaging the two middle values for even lengths.
///
/// ```
/// use gcmsquery::utils::stats::median;
/// assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
/// assert_eq!(median(&[]), None);
/// ```
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted_copy(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Raw median absolute deviation about the median (no normal scaling).
pub fn median_absolute_deviation(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// MAD divided by [NORMAL_MAD_DIVISOR], comparable to a standard deviation.
pub fn scaled_mad(values: &[f64]) -> Option<f64> {
    median_absolute_deviation(values).map(|m| m / NORMAL_MAD_DIVISOR)
}

/// Median of the samples at `index - 1`, `index` and `index + 1`,
/// clipped to the slice.
///
/// With only two samples in range this is their mean.
pub fn centered_median3(values: &[f64], index: usize) -> f64 {
    let start = index.saturating_sub(1);
    let end = (index + 2).min(values.len());
    if start >= end {
        return 0.0;
    }
    median(&values[start..end]).unwrap_or(0.0)
}

/// Linearly interpolated percentile (0-100) of the values.
///
/// ```
/// use gcmsquery::utils::stats::percentile;
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0), Some(3.0));
/// assert_eq!(percentile(&[0.0, 10.0], 95.0), Some(9.5));
/// ```
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&pct) {
        return None;
    }
    let sorted = sorted_copy(values);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mad() {
        // median 3, deviations [2, 1, 0, 1, 2] -> 1
        let mad = median_absolute_deviation(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(mad, 1.0);
        let scaled = scaled_mad(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((scaled - 1.4826).abs() < 1e-3);
        assert_eq!(median_absolute_deviation(&[]), None);
    }

    #[test]
    fn test_centered_median3() {
        let vals = [1000.0, 800.0, 600.0, 0.0];
        assert_eq!(centered_median3(&vals, 0), 900.0);
        assert_eq!(centered_median3(&vals, 1), 800.0);
        assert_eq!(centered_median3(&vals, 2), 600.0);
        assert_eq!(centered_median3(&vals, 3), 300.0);
        assert_eq!(centered_median3(&[], 0), 0.0);
    }
}
