use std::sync::Arc;

use gcmsquery::errors::{
    DataShapeError,
    InsufficientDataError,
};
use gcmsquery::utils::stats::median;
use gcmsquery::MassSpectrum;

use crate::errors::Result;
use crate::models::{
    Experiment,
    Peak,
    PeakKind,
};

/// One aligned group: a slot per experiment, `None` where that experiment
/// has no peak.
pub type Column = Vec<Option<Arc<Peak>>>;

/// Peaks further than this many median absolute deviations from the median RT are
/// outliers when building composite peaks.
pub const RT_OUTLIER_MADS: f64 = 2.5;

/// An ordered set of aligned peak groups over one or more experiments.
///
/// Every column has exactly one slot per entry of `experiment_codes` and
/// at least one real peak. Columns are ordered by the mean retention time
/// of their peaks. A single experiment lifted with [Alignment::from_experiment]
/// is the 1-alignment every merge starts from.
#[derive(Debug, Clone)]
pub struct Alignment {
    experiment_codes: Vec<String>,
    columns: Vec<Column>,
    similarity: Option<f64>,
}

impl Alignment {
    pub fn from_experiment(experiment: &Experiment) -> Self {
        let mut columns: Vec<Column> = experiment
            .peaks()
            .iter()
            .map(|p| vec![Some(Arc::new(p.clone()))])
            .collect();
        columns.sort_by(|a, b| column_mean_rt(a).total_cmp(&column_mean_rt(b)));
        Self {
            experiment_codes: vec![experiment.name().to_string()],
            columns,
            similarity: None,
        }
    }

    /// Assembles an alignment from already built columns.
    ///
    /// All-gap columns are dropped and the rest are stably sorted by mean
    /// retention time.
    pub fn from_columns(
        experiment_codes: Vec<String>,
        columns: Vec<Column>,
        similarity: Option<f64>,
    ) -> Result<Self> {
        for col in columns.iter() {
            if col.len() != experiment_codes.len() {
                return Err(DataShapeError::ExpectedSlicesSameLength {
                    expected: experiment_codes.len(),
                    other: col.len(),
                    context: "Alignment column vs experiment codes".to_string(),
                }
                .into());
            }
        }
        let mut columns: Vec<Column> = columns
            .into_iter()
            .filter(|c| c.iter().any(|p| p.is_some()))
            .collect();
        columns.sort_by(|a, b| column_mean_rt(a).total_cmp(&column_mean_rt(b)));
        Ok(Self {
            experiment_codes,
            columns,
            similarity,
        })
    }

    pub fn experiment_codes(&self) -> &[String] {
        &self.experiment_codes
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn n_experiments(&self) -> usize {
        self.experiment_codes.len()
    }

    /// Number of aligned groups.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Score of the merge that produced this alignment, if any.
    pub fn similarity(&self) -> Option<f64> {
        self.similarity
    }

    pub fn mean_rts(&self) -> Vec<f64> {
        self.columns.iter().map(|c| column_mean_rt(c)).collect()
    }

    /// Drops the columns holding fewer than `min_peaks` real peaks.
    pub fn filter_min_peaks(&mut self, min_peaks: usize) {
        if min_peaks > 1 {
            self.columns.retain(|c| column_peak_count(c) >= min_peaks);
        }
    }

    /// Indices of the columns that have a peak in every experiment when
    /// `require_all` is set, every index otherwise.
    pub fn column_indices(&self, require_all: bool) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !require_all || c.iter().all(|p| p.is_some()))
            .map(|(i, _)| i)
            .collect()
    }

    /// One composite peak per column.
    pub fn aligned_peaks(&self, ignore_outliers: bool) -> Result<Vec<Peak>> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let peaks: Vec<&Peak> = col.iter().flatten().map(|p| p.as_ref()).collect();
                composite_peak(&peaks, ignore_outliers)
                    .map_err(|e| e.append_to_context(&format!("aligned_peaks column {}", i)))
            })
            .collect()
    }
}

/// Mean retention time of the real peaks of a column, NaN for an all-gap
/// column.
pub fn column_mean_rt(column: &[Option<Arc<Peak>>]) -> f64 {
    let (sum, count) = column
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), p| (s + p.retention_time(), n + 1));
    sum / count as f64
}

pub fn column_peak_count(column: &[Option<Arc<Peak>>]) -> usize {
    column.iter().filter(|p| p.is_some()).count()
}

/// Flags the values lying more than [RT_OUTLIER_MADS] absolute deviations
/// from their median. Nothing is flagged when the deviation is zero.
pub fn median_outliers(values: &[f64]) -> Vec<bool> {
    let Some(med) = median(values) else {
        return vec![];
    };
    let devs: Vec<f64> = values.iter().map(|x| (x - med).abs()).collect();
    let mdev = median(&devs).unwrap_or(0.0);
    if mdev == 0.0 {
        return vec![false; values.len()];
    }
    devs.iter().map(|d| d / mdev > RT_OUTLIER_MADS).collect()
}

/// Builds a peak at the mean retention time whose spectrum is the mean of
/// the input spectra, each scaled to a base peak of 100.
///
/// The composite lives on the mass axis of the first full-spectrum peak.
/// With `ignore_outliers`, and more than three peaks, retention time
/// outliers are left out of both means. If no input carries a spectrum the
/// result is a single-ion peak on the first input's ion.
pub fn composite_peak(peaks: &[&Peak], ignore_outliers: bool) -> Result<Peak> {
    if peaks.is_empty() {
        return Err(InsufficientDataError::NoUsableValues {
            context: "composite_peak with no peaks".to_string(),
        }
        .into());
    }

    let outliers = if ignore_outliers && peaks.len() > 3 {
        let rts: Vec<f64> = peaks.iter().map(|p| p.retention_time()).collect();
        median_outliers(&rts)
    } else {
        vec![false; peaks.len()]
    };
    let used: Vec<&Peak> = peaks
        .iter()
        .zip(outliers.iter())
        .filter(|(p, out)| !**out && !p.is_outlier())
        .map(|(p, _)| *p)
        .collect();
    let used = if used.is_empty() { peaks.to_vec() } else { used };

    let avg_rt = used.iter().map(|p| p.retention_time()).sum::<f64>() / used.len() as f64;

    let spectra: Vec<&MassSpectrum> = used.iter().filter_map(|p| p.mass_spectrum()).collect();
    let Some(first) = spectra.first() else {
        return match used[0].kind() {
            PeakKind::SingleIon { mass } => Peak::single_ion(avg_rt, *mass),
            PeakKind::FullSpectrum(ms) => Peak::new(avg_rt, ms.clone()),
        };
    };

    let mut avg = vec![0.0; first.len()];
    for ms in spectra.iter() {
        let scaled = ms.normalized(100.0);
        for (slot, mass) in avg.iter_mut().zip(first.masses().iter()) {
            *slot += scaled.intensity_at(*mass).unwrap_or(0.0);
        }
    }
    let n = spectra.len() as f64;
    avg.iter_mut().for_each(|x| *x /= n);
    let ms = MassSpectrum::new(first.masses().to_vec(), avg)?;
    Peak::new(avg_rt, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(rt: f64, intensities: Vec<f64>) -> Peak {
        let masses = (0..intensities.len()).map(|i| 50.0 + i as f64).collect();
        Peak::new(rt, MassSpectrum::new(masses, intensities).unwrap()).unwrap()
    }

    #[test]
    fn test_from_experiment_orders_by_rt() {
        let expr = Experiment::new(
            "a",
            vec![peak(30.0, vec![1.0]), peak(10.0, vec![1.0]), peak(20.0, vec![1.0])],
        );
        let aln = Alignment::from_experiment(&expr);
        assert_eq!(aln.len(), 3);
        assert_eq!(aln.experiment_codes(), &["a".to_string()]);
        assert_eq!(aln.mean_rts(), vec![10.0, 20.0, 30.0]);
        assert_eq!(aln.similarity(), None);
    }

    #[test]
    fn test_from_columns_checks_width_and_drops_gaps() {
        let p = Arc::new(peak(5.0, vec![1.0]));
        let codes = vec!["a".to_string(), "b".to_string()];
        assert!(Alignment::from_columns(codes.clone(), vec![vec![Some(p.clone())]], None).is_err());

        let aln = Alignment::from_columns(
            codes,
            vec![vec![None, Some(p.clone())], vec![None, None]],
            Some(1.0),
        )
        .unwrap();
        assert_eq!(aln.len(), 1);
        assert_eq!(aln.column_indices(true), Vec::<usize>::new());
        assert_eq!(aln.column_indices(false), vec![0]);
    }

    #[test]
    fn test_filter_min_peaks() {
        let p = Arc::new(peak(5.0, vec![1.0]));
        let q = Arc::new(peak(9.0, vec![1.0]));
        let codes = vec!["a".to_string(), "b".to_string()];
        let mut aln = Alignment::from_columns(
            codes,
            vec![vec![Some(p.clone()), Some(p)], vec![None, Some(q)]],
            None,
        )
        .unwrap();
        aln.filter_min_peaks(1);
        assert_eq!(aln.len(), 2);
        aln.filter_min_peaks(2);
        assert_eq!(aln.len(), 1);
        assert_eq!(aln.mean_rts(), vec![5.0]);
    }

    #[test]
    fn test_composite_peak_averages_scaled_spectra() {
        let a = peak(10.0, vec![50.0, 100.0]);
        let b = peak(12.0, vec![10.0, 0.0]);
        let comp = composite_peak(&[&a, &b], false).unwrap();
        assert_eq!(comp.retention_time(), 11.0);
        assert_eq!(comp.mass_spectrum().unwrap().intensities(), &[75.0, 50.0]);
        assert!(composite_peak(&[], false).is_err());
    }

    #[test]
    fn test_composite_peak_ignores_rt_outliers() {
        let peaks: Vec<Peak> = [10.0, 10.2, 9.9, 10.1, 60.0]
            .iter()
            .map(|rt| peak(*rt, vec![1.0]))
            .collect();
        let refs: Vec<&Peak> = peaks.iter().collect();
        let with = composite_peak(&refs, true).unwrap();
        assert!((with.retention_time() - 10.05).abs() < 1e-9);
        let without = composite_peak(&refs, false).unwrap();
        assert!((without.retention_time() - 20.04).abs() < 1e-9);
    }

    #[test]
    fn test_median_outliers() {
        assert_eq!(
            median_outliers(&[1.0, 1.1, 0.9, 1.0, 9.0]),
            vec![false, false, false, false, true]
        );
        assert_eq!(median_outliers(&[2.0, 2.0, 2.0]), vec![false; 3]);
        assert!(median_outliers(&[]).is_empty());
    }
}
