use gcmsquery::errors::ParameterError;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use crate::errors::Result;
use crate::models::{
    Peak,
    PeakKind,
};

/// Where the intensity cutoff of [num_ions_threshold] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IonCutoff {
    #[serde(rename = "absolute")]
    Absolute(f64),
    /// Multiple of the noise level of the run's TIC.
    #[serde(rename = "noise_multiple")]
    NoiseMultiple(f64),
}

impl IonCutoff {
    pub fn resolve(&self, noise_level: f64) -> f64 {
        match self {
            IonCutoff::Absolute(x) => *x,
            IonCutoff::NoiseMultiple(k) => k * noise_level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Ions below this percentage of the peak's base ion are zeroed.
    pub relative_percent: f64,
    pub min_ions: usize,
    pub cutoff: IonCutoff,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            relative_percent: 2.0,
            min_ions: 3,
            cutoff: IonCutoff::NoiseMultiple(1.0),
        }
    }
}

/// Zeroes, in every peak, the ions below `percent` % of that peak's most
/// intense ion. The number of peaks never changes.
///
/// Single-ion peaks carry no spectrum and are left alone.
pub fn rel_threshold(peaks: &mut [Peak], percent: f64) -> Result<()> {
    if !(percent.is_finite() && percent > 0.0) {
        return Err(ParameterError::ExpectedPositive {
            parameter: "percent",
            value: percent,
            context: "rel_threshold".to_string(),
        }
        .into());
    }
    for peak in peaks.iter_mut() {
        let mut ms = match peak.kind() {
            PeakKind::FullSpectrum(ms) => ms.clone(),
            PeakKind::SingleIon { .. } => continue,
        };
        let cutoff = ms.max_intensity() / 100.0 * percent;
        ms.map_intensities(|x| if x < cutoff { 0.0 } else { x });
        peak.set_mass_spectrum(ms);
    }
    Ok(())
}

/// Keeps the peaks having at least `n` ions with intensity `>= cutoff`.
///
/// Returns a new list, retained peaks are unchanged. A single-ion peak
/// counts as one ion.
pub fn num_ions_threshold(peaks: &[Peak], n: usize, cutoff: f64) -> Result<Vec<Peak>> {
    if n == 0 {
        return Err(ParameterError::ExpectedPositive {
            parameter: "n",
            value: 0.0,
            context: "num_ions_threshold".to_string(),
        }
        .into());
    }
    if !cutoff.is_finite() {
        return Err(ParameterError::InvalidValue {
            parameter: "cutoff",
            value: cutoff.to_string(),
            context: "num_ions_threshold".to_string(),
        }
        .into());
    }

    let kept: Vec<Peak> = peaks
        .iter()
        .filter(|p| {
            let ions = match p.kind() {
                PeakKind::FullSpectrum(ms) => {
                    ms.intensities().iter().filter(|x| **x >= cutoff).count()
                }
                PeakKind::SingleIon { .. } => 1,
            };
            ions >= n
        })
        .cloned()
        .collect();
    info!(
        "Kept {} of {} peaks with at least {} ions >= {:.2}",
        kept.len(),
        peaks.len(),
        n,
        cutoff
    );
    Ok(kept)
}

/// Copies of the peaks with `low < rt < high` (seconds).
pub fn select_peaks_by_rt(peaks: &[Peak], low: f64, high: f64) -> Result<Vec<Peak>> {
    if low >= high {
        return Err(ParameterError::InvalidRange {
            parameter: "retention_time",
            low,
            high,
            context: "select_peaks_by_rt".to_string(),
        }
        .into());
    }
    Ok(peaks
        .iter()
        .filter(|p| p.retention_time() > low && p.retention_time() < high)
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcmsquery::MassSpectrum;

    fn peaks() -> Vec<Peak> {
        vec![
            Peak::new(
                10.0,
                MassSpectrum::new(vec![50.0, 51.0, 52.0, 53.0], vec![1.0, 100.0, 50.0, 30.0])
                    .unwrap(),
            )
            .unwrap(),
            Peak::new(
                20.0,
                MassSpectrum::new(vec![50.0, 51.0, 52.0, 53.0], vec![0.0, 0.0, 5.0, 0.0]).unwrap(),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_rel_threshold_zeroes_small_ions() {
        let mut pl = peaks();
        let uid_before = pl[0].uid();
        rel_threshold(&mut pl, 2.0).unwrap();
        assert_eq!(pl.len(), 2);
        assert_eq!(
            pl[0].mass_spectrum().unwrap().intensities(),
            &[0.0, 100.0, 50.0, 30.0]
        );
        assert_eq!(pl[0].uid(), uid_before);

        rel_threshold(&mut pl, 40.0).unwrap();
        assert_eq!(
            pl[0].mass_spectrum().unwrap().intensities(),
            &[0.0, 100.0, 50.0, 0.0]
        );
        assert!(rel_threshold(&mut pl, 0.0).is_err());
    }

    #[test]
    fn test_num_ions_threshold_never_grows() {
        let pl = peaks();
        let kept = num_ions_threshold(&pl, 3, 10.0).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], pl[0]);
        assert!(num_ions_threshold(&pl, 1, 0.0).unwrap().len() <= pl.len());
        assert!(num_ions_threshold(&pl, 0, 1.0).is_err());
    }

    #[test]
    fn test_cutoff_resolution() {
        assert_eq!(IonCutoff::Absolute(5.0).resolve(100.0), 5.0);
        assert_eq!(IonCutoff::NoiseMultiple(3.0).resolve(2.0), 6.0);
        let pl = peaks();
        assert_eq!(select_peaks_by_rt(&pl, 5.0, 20.0).unwrap().len(), 1);
        assert!(select_peaks_by_rt(&pl, 20.0, 5.0).is_err());
    }
}
