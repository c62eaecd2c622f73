use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    DataShapeError,
    Result,
};

/// One raw acquisition: all (mass, intensity) pairs at a retention time.
///
/// Fields are public so scans can be deserialized straight from JSON;
/// [Scan::validate] is run again by the binner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    /// Seconds.
    pub retention_time: f64,
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl Scan {
    pub fn new(retention_time: f64, masses: Vec<f64>, intensities: Vec<f64>) -> Result<Self> {
        let out = Self {
            retention_time,
            masses,
            intensities,
        };
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.retention_time.is_finite() {
            return Err(DataShapeError::ExpectedFiniteNonNanData {
                index: 0,
                context: "scan retention time".to_string(),
            }
            .into());
        }
        if self.masses.len() != self.intensities.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: self.masses.len(),
                other: self.intensities.len(),
                context: format!("scan at {} s masses vs intensities", self.retention_time),
            }
            .into());
        }
        if let Some(i) = self.masses.iter().position(|m| !m.is_finite()) {
            return Err(DataShapeError::ExpectedFiniteNonNanData {
                index: i,
                context: format!("scan at {} s masses", self.retention_time),
            }
            .into());
        }
        Ok(())
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

    pub fn min_mass(&self) -> Option<f64> {
        self.masses.iter().copied().reduce(f64::min)
    }

    pub fn max_mass(&self) -> Option<f64> {
        self.masses.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_validation() {
        assert!(Scan::new(1.0, vec![50.0, 51.0], vec![1.0]).is_err());
        assert!(Scan::new(f64::NAN, vec![50.0], vec![1.0]).is_err());
        assert!(Scan::new(1.0, vec![f64::INFINITY], vec![1.0]).is_err());
        let scan = Scan::new(1.0, vec![50.0, 52.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(scan.min_mass(), Some(50.0));
        assert_eq!(scan.max_mass(), Some(52.0));
        assert_eq!(scan.iter().collect::<Vec<_>>(), vec![(50.0, 1.0), (52.0, 2.0)]);
    }

    #[test]
    fn test_scan_from_json() {
        let scan: Scan = serde_json::from_str(
            r#"{"retention_time": 12.5, "masses": [50.0], "intensities": [3.0]}"#,
        )
        .unwrap();
        assert_eq!(scan.len(), 1);
        assert!(scan.validate().is_ok());
    }
}
