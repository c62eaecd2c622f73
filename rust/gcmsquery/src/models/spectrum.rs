use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    DataShapeError,
    ParameterError,
    Result,
};
use crate::utils::sorted::nearest_index;

/// Masses closer than this are treated as the same ion when comparing
/// two spectra.
pub const MASS_MATCH_TOLERANCE: f64 = 1e-6;

/// A (possibly binned) mass spectrum, masses ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpectrum {
    masses: Vec<f64>,
    intensities: Vec<f64>,
}

impl MassSpectrum {
    pub fn new(masses: Vec<f64>, intensities: Vec<f64>) -> Result<Self> {
        if masses.len() != intensities.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: masses.len(),
                other: intensities.len(),
                context: "MassSpectrum masses vs intensities".to_string(),
            }
            .into());
        }
        Ok(Self {
            masses,
            intensities,
        })
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.masses
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
    }

    /// Zero for an empty spectrum.
    pub fn max_intensity(&self) -> f64 {
        self.intensities.iter().copied().fold(0.0, f64::max)
    }

    /// Intensity of the ion at `mass`, if present.
    pub fn intensity_at(&self, mass: f64) -> Option<f64> {
        let idx = nearest_index(&self.masses, mass)?;
        if (self.masses[idx] - mass).abs() <= MASS_MATCH_TOLERANCE {
            Some(self.intensities[idx])
        } else {
            None
        }
    }

    /// Indices sorted by decreasing intensity, earlier index first on ties.
    pub fn ranked_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.sort_by(|&a, &b| self.intensities[b].total_cmp(&self.intensities[a]));
        idx
    }

    /// Masses of the `n` most intense ions, most intense first.
    pub fn top_ions(&self, n: usize) -> Vec<f64> {
        self.ranked_indices()
            .into_iter()
            .take(n)
            .map(|i| self.masses[i])
            .collect()
    }

    pub fn map_intensities(&mut self, f: impl Fn(f64) -> f64) {
        self.intensities.iter_mut().for_each(|x| *x = f(*x));
    }

    /// Keeps only ions with `low <= mass <= high`.
    pub fn crop(&mut self, low: f64, high: f64) -> Result<()> {
        if low >= high {
            return Err(ParameterError::InvalidRange {
                parameter: "mass",
                low,
                high,
                context: "MassSpectrum::crop".to_string(),
            }
            .into());
        }
        let (masses, intensities): (Vec<f64>, Vec<f64>) = self
            .iter()
            .filter(|(m, _)| *m >= low && *m <= high)
            .unzip();
        if masses.is_empty() {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: format!("MassSpectrum::crop no ions in [{}, {}]", low, high),
            }
            .into());
        }
        self.masses = masses;
        self.intensities = intensities;
        Ok(())
    }

    /// Zeroes the intensity of the ion nearest to `mass`.
    pub fn null_mass(&mut self, mass: f64) -> Result<()> {
        let (min, max) = match (self.masses.first(), self.masses.last()) {
            (Some(a), Some(b)) => (*a, *b),
            _ => {
                return Err(DataShapeError::ExpectedNonEmptyData {
                    context: "MassSpectrum::null_mass".to_string(),
                }
                .into());
            }
        };
        if mass < min || mass > max {
            return Err(DataShapeError::ValueOutOfRange {
                value: mass,
                min,
                max,
                context: "MassSpectrum::null_mass".to_string(),
            }
            .into());
        }
        if let Some(idx) = nearest_index(&self.masses, mass) {
            self.intensities[idx] = 0.0;
        }
        Ok(())
    }

    /// Copy scaled so the most intense ion equals `top`.
    /// An all-zero spectrum is returned unchanged.
    pub fn normalized(&self, top: f64) -> MassSpectrum {
        let max = self.max_intensity();
        let mut out = self.clone();
        if max > 0.0 {
            out.map_intensities(|x| x / max * top);
        }
        out
    }

    /// Cosine similarity over the ions both spectra share.
    ///
    /// Masses are matched with a merge join, so spectra cropped to
    /// different ranges can still be compared. Returns 0 when either side
    /// has no intensity, never NaN.
    ///
    /// ```
    /// use gcmsquery::MassSpectrum;
    /// let a = MassSpectrum::new(vec![50.0, 51.0], vec![1.0, 0.0]).unwrap();
    /// let b = MassSpectrum::new(vec![50.0, 51.0, 52.0], vec![2.0, 0.0, 0.0]).unwrap();
    /// assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-12);
    /// ```
    pub fn cosine_similarity(&self, other: &MassSpectrum) -> f64 {
        let norm_a: f64 = self.intensities.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b: f64 = other.intensities.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        let mut dot = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            let diff = self.masses[i] - other.masses[j];
            if diff.abs() <= MASS_MATCH_TOLERANCE {
                dot += self.intensities[i] * other.intensities[j];
                i += 1;
                j += 1;
            } else if diff < 0.0 {
                i += 1;
            } else {
                j += 1;
            }
        }
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> MassSpectrum {
        MassSpectrum::new(vec![50.0, 51.0, 52.0, 53.0], vec![10.0, 40.0, 40.0, 5.0]).unwrap()
    }

    #[test]
    fn test_top_ions_tie_order() {
        assert_eq!(spectrum().top_ions(2), vec![51.0, 52.0]);
        assert_eq!(spectrum().top_ions(10).len(), 4);
    }

    #[test]
    fn test_crop_and_null() {
        let mut ms = spectrum();
        ms.crop(51.0, 52.5).unwrap();
        assert_eq!(ms.masses(), &[51.0, 52.0]);
        assert!(ms.crop(52.0, 51.0).is_err());

        let mut ms = spectrum();
        ms.null_mass(51.2).unwrap();
        assert_eq!(ms.intensities(), &[10.0, 0.0, 40.0, 5.0]);
        assert!(ms.null_mass(60.0).is_err());
    }

    #[test]
    fn test_cosine_empty_and_disjoint() {
        let a = spectrum();
        let empty = MassSpectrum::new(vec![], vec![]).unwrap();
        assert_eq!(a.cosine_similarity(&empty), 0.0);

        let disjoint = MassSpectrum::new(vec![100.0], vec![1.0]).unwrap();
        assert_eq!(a.cosine_similarity(&disjoint), 0.0);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalized() {
        let ms = spectrum().normalized(100.0);
        assert_eq!(ms.intensities(), &[25.0, 100.0, 100.0, 12.5]);
        assert_eq!(ms.intensity_at(53.0), Some(12.5));
        assert_eq!(ms.intensity_at(53.5), None);
    }
}
