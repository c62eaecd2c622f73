use std::sync::Arc;

use gcmsquery::Array2D;
use rayon::prelude::*;

use crate::alignment::model::Alignment;
use crate::errors::Result;
use crate::models::{
    Peak,
    PeakKind,
};

/// Gaussian tail probability at which two retention times stop being
/// comparable.
pub const RT_CUTOFF_PROBABILITY: f64 = 0.001;

/// Retention time difference beyond which a peak pair scores the maximum
/// distance, `rt_width * sqrt(-2 ln p)`.
///
/// ```
/// use gcmsseek::alignment::scoring::rt_cutoff;
///
/// let c = rt_cutoff(2.5);
/// assert!((c - 9.2923).abs() < 1e-3);
/// ```
pub fn rt_cutoff(rt_width: f64) -> f64 {
    rt_width * (-2.0 * RT_CUTOFF_PROBABILITY.ln()).sqrt()
}

/// Spectral agreement of two peaks in `[0, 1]`.
///
/// Single-ion peaks agree only with a peak on the same ion. An empty
/// spectrum agrees with nothing.
pub fn spectral_similarity(a: &Peak, b: &Peak) -> f64 {
    match (a.kind(), b.kind()) {
        (PeakKind::FullSpectrum(x), PeakKind::FullSpectrum(y)) => x.cosine_similarity(y),
        (PeakKind::SingleIon { mass: x }, PeakKind::SingleIon { mass: y }) => {
            if (x - y).abs() <= 1e-6 {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Distance between two peaks in `[0, 1]`, `None` when their retention
/// times are further apart than `cutoff`.
pub fn peak_distance(a: &Peak, b: &Peak, rt_width: f64, cutoff: f64) -> Option<f64> {
    let delta = a.retention_time() - b.retention_time();
    if delta.abs() > cutoff {
        return None;
    }
    let rt_term = (-(delta / rt_width).powi(2) / 2.0).exp();
    Some(1.0 - spectral_similarity(a, b) * rt_term)
}

/// Mean peak distance over every pair of real peaks of two columns.
///
/// Pairs outside the retention time cutoff count as distance 1. A column
/// pair without a single pair inside the cutoff cannot be matched and
/// scores `f64::INFINITY`.
pub fn column_distance(a: &[Option<Arc<Peak>>], b: &[Option<Arc<Peak>>], rt_width: f64) -> f64 {
    let cutoff = rt_cutoff(rt_width);
    let mut total = 0.0;
    let mut count = 0usize;
    let mut eligible = false;
    for pa in a.iter().flatten() {
        for pb in b.iter().flatten() {
            match peak_distance(pa, pb, rt_width, cutoff) {
                Some(d) => {
                    total += d;
                    eligible = true;
                }
                None => total += 1.0,
            }
            count += 1;
        }
    }
    if !eligible || count == 0 {
        return f64::INFINITY;
    }
    total / count as f64
}

/// Distances between every column of `a` (rows) and of `b` (columns).
///
/// Rows are scored in parallel. Either side being empty yields an empty
/// matrix.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn score_matrix(a: &Alignment, b: &Alignment, rt_width: f64) -> Result<Array2D<f64>> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Ok(Array2D::filled(n, m, f64::INFINITY));
    }
    let values: Vec<f64> = a
        .columns()
        .par_iter()
        .flat_map_iter(|ca| b.columns().iter().map(move |cb| column_distance(ca, cb, rt_width)))
        .collect();
    Ok(Array2D::from_flat_vector(values, n, m)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcmsquery::MassSpectrum;

    fn peak(rt: f64, intensities: Vec<f64>) -> Arc<Peak> {
        let masses = (0..intensities.len()).map(|i| 50.0 + i as f64).collect();
        Arc::new(Peak::new(rt, MassSpectrum::new(masses, intensities).unwrap()).unwrap())
    }

    #[test]
    fn test_identical_peaks_have_zero_distance() {
        let p = peak(10.0, vec![1.0, 2.0, 3.0]);
        let d = column_distance(&[Some(p.clone())], &[Some(p)], 2.5);
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn test_rt_drift_increases_distance() {
        let a = peak(10.0, vec![1.0, 2.0, 3.0]);
        let near = peak(10.5, vec![1.0, 2.0, 3.0]);
        let far = peak(12.0, vec![1.0, 2.0, 3.0]);
        let d_near = column_distance(&[Some(a.clone())], &[Some(near)], 2.5);
        let d_far = column_distance(&[Some(a)], &[Some(far)], 2.5);
        assert!(d_near > 0.0);
        assert!(d_far > d_near);
        assert!(d_far < 1.0);
    }

    #[test]
    fn test_out_of_cutoff_is_ineligible() {
        let a = peak(10.0, vec![1.0, 2.0, 3.0]);
        let b = peak(30.0, vec![1.0, 2.0, 3.0]);
        assert_eq!(column_distance(&[Some(a.clone())], &[Some(b.clone())], 2.5), f64::INFINITY);
        assert_eq!(column_distance(&[None], &[Some(b.clone())], 2.5), f64::INFINITY);

        // One pair inside the cutoff makes the columns comparable.
        let c = peak(10.0, vec![1.0, 2.0, 3.0]);
        let d = column_distance(&[Some(a), None], &[Some(b), Some(c)], 2.5);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_spectrum_scores_as_dissimilar() {
        let a = peak(10.0, vec![1.0, 2.0]);
        let empty = Arc::new(Peak::new(10.0, MassSpectrum::new(vec![], vec![]).unwrap()).unwrap());
        let d = column_distance(&[Some(a)], &[Some(empty)], 2.5);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_single_ion_similarity() {
        let a = Peak::single_ion(10.0, 73.0).unwrap();
        let b = Peak::single_ion(10.0, 73.0).unwrap();
        let c = Peak::single_ion(10.0, 74.0).unwrap();
        assert_eq!(spectral_similarity(&a, &b), 1.0);
        assert_eq!(spectral_similarity(&a, &c), 0.0);
    }
}
