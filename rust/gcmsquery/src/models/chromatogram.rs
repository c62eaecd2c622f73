use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    DataShapeError,
    Result,
};
use crate::utils::sorted::nearest_index;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChromatogramKind {
    #[serde(rename = "tic")]
    Tic,
    #[serde(rename = "extracted_ion")]
    ExtractedIon { mass: f64 },
    #[serde(rename = "base_peak")]
    BasePeak,
}

/// Intensity over retention time for one ion, the TIC or the base peak.
///
/// A snapshot: changing the chromatogram does not change the matrix it
/// came from, use `IntensityMatrix::set_ic_at_index` for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IonChromatogram {
    intensities: Vec<f64>,
    time_list: Vec<f64>,
    kind: ChromatogramKind,
}

impl IonChromatogram {
    pub fn new(intensities: Vec<f64>, time_list: Vec<f64>, kind: ChromatogramKind) -> Result<Self> {
        if time_list.is_empty() {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "IonChromatogram time list".to_string(),
            }
            .into());
        }
        if intensities.len() != time_list.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: time_list.len(),
                other: intensities.len(),
                context: "IonChromatogram intensities vs times".to_string(),
            }
            .into());
        }
        Ok(Self {
            intensities,
            time_list,
            kind,
        })
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn into_intensities(self) -> Vec<f64> {
        self.intensities
    }

    pub fn time_list(&self) -> &[f64] {
        &self.time_list
    }

    pub fn kind(&self) -> ChromatogramKind {
        self.kind
    }

    pub fn mass(&self) -> Option<f64> {
        match self.kind {
            ChromatogramKind::ExtractedIon { mass } => Some(mass),
            _ => None,
        }
    }

    pub fn is_tic(&self) -> bool {
        matches!(self.kind, ChromatogramKind::Tic)
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    /// Mean spacing between consecutive scans, zero for a single scan.
    pub fn time_step(&self) -> f64 {
        let n = self.time_list.len();
        if n < 2 {
            return 0.0;
        }
        (self.time_list[n - 1] - self.time_list[0]) / (n - 1) as f64
    }

    pub fn get_time_at_index(&self, index: usize) -> Result<f64> {
        self.time_list.get(index).copied().ok_or_else(|| {
            DataShapeError::IndexOutOfBounds {
                index,
                len: self.time_list.len(),
                context: "IonChromatogram::get_time_at_index".to_string(),
            }
            .into()
        })
    }

    pub fn get_intensity_at_index(&self, index: usize) -> Result<f64> {
        self.intensities.get(index).copied().ok_or_else(|| {
            DataShapeError::IndexOutOfBounds {
                index,
                len: self.intensities.len(),
                context: "IonChromatogram::get_intensity_at_index".to_string(),
            }
            .into()
        })
    }

    /// Nearest scan to `time`, which must lie within the acquisition.
    pub fn get_index_at_time(&self, time: f64) -> Result<usize> {
        index_at_time(&self.time_list, time, "IonChromatogram::get_index_at_time")
    }

    /// Same chromatogram with new intensities of the same length.
    pub fn with_intensities(&self, intensities: Vec<f64>) -> Result<Self> {
        Self::new(intensities, self.time_list.clone(), self.kind)
    }
}

pub(crate) fn index_at_time(time_list: &[f64], time: f64, context: &str) -> Result<usize> {
    let (min, max) = match (time_list.first(), time_list.last()) {
        (Some(a), Some(b)) => (*a, *b),
        _ => {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: context.to_string(),
            }
            .into());
        }
    };
    if !(min..=max).contains(&time) {
        return Err(DataShapeError::ValueOutOfRange {
            value: time,
            min,
            max,
            context: context.to_string(),
        }
        .into());
    }
    nearest_index(time_list, time).ok_or_else(|| {
        DataShapeError::ExpectedNonEmptyData {
            context: context.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_queries() -> Result<()> {
        let ic = IonChromatogram::new(
            vec![1.0, 5.0, 2.0],
            vec![10.0, 11.0, 12.0],
            ChromatogramKind::ExtractedIon { mass: 73.0 },
        )?;
        assert_eq!(ic.time_step(), 1.0);
        assert_eq!(ic.get_index_at_time(11.4)?, 1);
        assert_eq!(ic.get_index_at_time(10.5)?, 0);
        assert!(ic.get_index_at_time(12.1).is_err());
        assert_eq!(ic.mass(), Some(73.0));
        assert!(!ic.is_tic());
        assert!(ic.get_intensity_at_index(3).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_checks() {
        assert!(IonChromatogram::new(vec![1.0], vec![1.0, 2.0], ChromatogramKind::Tic).is_err());
        assert!(IonChromatogram::new(vec![], vec![], ChromatogramKind::Tic).is_err());
    }
}
