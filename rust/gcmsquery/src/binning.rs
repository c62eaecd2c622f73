use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    warn,
};

use crate::errors::{
    DataShapeError,
    ParameterError,
    Result,
};
use crate::models::{
    Array2D,
    IntensityMatrix,
    Scan,
};
use crate::utils::sorted::check_strictly_increasing;

/// How raw masses are assigned to bins.
///
/// Bin `i` is centred at `min_mass + i * width` and collects masses with
/// `centre - lower_boundary <= mass < centre + upper_boundary`.
/// The two boundaries must add up to the bin width so bins neither
/// overlap nor leave gaps.
///
/// Example:
/// ```
/// use gcmsquery::BinningConfig;
///
/// let config: BinningConfig = serde_json::from_str(
///     r#"{"float": {"bin_width": 0.5, "lower_boundary": 0.25, "upper_boundary": 0.25}}"#,
/// ).unwrap();
/// assert!(config.validate().is_ok());
/// assert_eq!(BinningConfig::integer().validate().unwrap(), (1.0, 0.3, 0.7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BinningConfig {
    #[serde(rename = "float")]
    Float {
        bin_width: f64,
        lower_boundary: f64,
        upper_boundary: f64,
        /// Overrides the lowest bin centre, otherwise the lowest observed mass.
        #[serde(default)]
        min_mass: Option<f64>,
    },
    /// Unit bins centred on integer masses.
    #[serde(rename = "integer")]
    Integer {
        lower_boundary: f64,
        upper_boundary: f64,
    },
}

impl Default for BinningConfig {
    fn default() -> Self {
        BinningConfig::Float {
            bin_width: 1.0,
            lower_boundary: 0.5,
            upper_boundary: 0.5,
            min_mass: None,
        }
    }
}

impl BinningConfig {
    pub fn integer() -> Self {
        BinningConfig::Integer {
            lower_boundary: 0.3,
            upper_boundary: 0.7,
        }
    }

    /// Returns `(bin_width, lower_boundary, upper_boundary)` when usable.
    pub fn validate(&self) -> Result<(f64, f64, f64)> {
        let (width, lower, upper) = match *self {
            BinningConfig::Float {
                bin_width,
                lower_boundary,
                upper_boundary,
                min_mass,
            } => {
                if let Some(m) = min_mass {
                    if !m.is_finite() {
                        return Err(ParameterError::InvalidValue {
                            parameter: "min_mass",
                            value: m.to_string(),
                            context: "binning".to_string(),
                        }
                        .into());
                    }
                }
                (bin_width, lower_boundary, upper_boundary)
            }
            BinningConfig::Integer {
                lower_boundary,
                upper_boundary,
            } => (1.0, lower_boundary, upper_boundary),
        };

        if !(width.is_finite() && width > 0.0) {
            return Err(ParameterError::ExpectedPositive {
                parameter: "bin_width",
                value: width,
                context: "binning".to_string(),
            }
            .into());
        }
        for (name, val) in [("lower_boundary", lower), ("upper_boundary", upper)] {
            if !(val.is_finite() && val >= 0.0) {
                return Err(ParameterError::InvalidValue {
                    parameter: name,
                    value: val.to_string(),
                    context: "binning expects a finite non negative boundary".to_string(),
                }
                .into());
            }
        }
        if (lower + upper - width).abs() >= 1e-6 * width {
            return Err(ParameterError::BinBoundsMismatch {
                lower,
                upper,
                width,
                context: "binning".to_string(),
            }
            .into());
        }
        Ok((width, lower, upper))
    }
}

/// Bins a stream of scans into an [IntensityMatrix].
///
/// Intensities landing in the same bin of the same scan are summed.
/// With an explicit `min_mass`, masses below the first bin are dropped
/// and reported once through `warn!`.
///
/// ```
/// use gcmsquery::{build_intensity_matrix, BinningConfig, Scan};
///
/// let scans = vec![
///     Scan::new(1.0, vec![50.0, 50.7], vec![100.0, 50.0]).unwrap(),
///     Scan::new(2.0, vec![50.4], vec![30.0]).unwrap(),
/// ];
/// let im = build_intensity_matrix(&scans, &BinningConfig::default()).unwrap();
/// assert_eq!(im.mass_list(), &[50.0, 51.0]);
/// assert_eq!(im.get_scan_at_index(0).unwrap(), &[100.0, 50.0]);
/// assert_eq!(im.get_scan_at_index(1).unwrap(), &[30.0, 0.0]);
/// ```
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn build_intensity_matrix(scans: &[Scan], config: &BinningConfig) -> Result<IntensityMatrix> {
    let (width, lower, upper) = config.validate()?;

    if scans.is_empty() {
        return Err(DataShapeError::ExpectedNonEmptyData {
            context: "binning received no scans".to_string(),
        }
        .into());
    }
    for (i, scan) in scans.iter().enumerate() {
        scan.validate()
            .map_err(|e| e.append_to_context(&format!("binning scan {}", i)))?;
    }
    let time_list: Vec<f64> = scans.iter().map(|s| s.retention_time).collect();
    check_strictly_increasing(&time_list, "binning retention times")?;

    let observed_min = scans.iter().filter_map(|s| s.min_mass()).reduce(f64::min);
    let observed_max = scans.iter().filter_map(|s| s.max_mass()).reduce(f64::max);
    let (observed_min, observed_max) = match (observed_min, observed_max) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "binning found no masses in any scan".to_string(),
            }
            .into());
        }
    };

    let min_mass = match *config {
        BinningConfig::Float { min_mass, .. } => min_mass.unwrap_or(observed_min),
        BinningConfig::Integer { .. } => (observed_min + 1.0 - upper).floor(),
    };

    let span = ((observed_max + lower - min_mass) / width).floor();
    if span < 0.0 {
        return Err(DataShapeError::ValueOutOfRange {
            value: min_mass,
            min: f64::NEG_INFINITY,
            max: observed_max,
            context: "binning min_mass is above every observed mass".to_string(),
        }
        .into());
    }
    let num_bins = span as usize + 1;
    let mass_list: Vec<f64> = (0..num_bins).map(|i| i as f64 * width + min_mass).collect();

    let mut intensities = Array2D::filled(scans.len(), num_bins, 0.0);
    let mut skipped = 0usize;
    for (scan, row) in scans.iter().zip(intensities.iter_mut_rows()) {
        for (mass, intensity) in scan.iter() {
            let pos = ((mass + lower - min_mass) / width).floor();
            if pos < 0.0 || pos as usize >= num_bins {
                skipped += 1;
                continue;
            }
            row[pos as usize] += intensity;
        }
    }

    if skipped > 0 {
        warn!(
            "Dropped {} raw points outside the binned mass range starting at {}",
            skipped, min_mass
        );
    }
    info!(
        "Binned {} scans into {} mass bins ({:.2} - {:.2})",
        scans.len(),
        num_bins,
        mass_list[0],
        mass_list[num_bins - 1]
    );

    IntensityMatrix::new(time_list, mass_list, intensities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GcmsQueryError;

    fn scans() -> Vec<Scan> {
        vec![
            Scan::new(1.0, vec![50.2, 51.1, 51.2, 55.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            Scan::new(2.0, vec![49.8], vec![10.0]).unwrap(),
            Scan::new(3.0, vec![], vec![]).unwrap(),
        ]
    }

    #[test]
    fn test_conservation() -> Result<()> {
        let im = build_intensity_matrix(&scans(), &BinningConfig::default())?;
        let total: f64 = im.intensity_array().values().iter().sum();
        assert_eq!(total, 20.0);
        // Same bin, same scan: summed.
        assert_eq!(im.get_scan_at_index(0)?[1], 5.0);
        assert_eq!(im.get_scan_at_index(2)?.iter().sum::<f64>(), 0.0);
        Ok(())
    }

    #[test]
    fn test_integer_mode() -> Result<()> {
        let im = build_intensity_matrix(&scans(), &BinningConfig::integer())?;
        assert_eq!(im.mass_list()[0], 50.0);
        assert_eq!(im.mass_list().len(), 6);
        assert_eq!(im.get_scan_at_index(1)?[0], 10.0);
        Ok(())
    }

    #[test]
    fn test_min_mass_override_drops_points() -> Result<()> {
        let config = BinningConfig::Float {
            bin_width: 1.0,
            lower_boundary: 0.5,
            upper_boundary: 0.5,
            min_mass: Some(51.0),
        };
        let im = build_intensity_matrix(&scans(), &config)?;
        assert_eq!(im.mass_list()[0], 51.0);
        let total: f64 = im.intensity_array().values().iter().sum();
        assert_eq!(total, 9.0);
        Ok(())
    }

    #[test]
    fn test_parameter_errors() {
        let gap = BinningConfig::Float {
            bin_width: 1.0,
            lower_boundary: 0.2,
            upper_boundary: 0.2,
            min_mass: None,
        };
        assert!(matches!(
            build_intensity_matrix(&scans(), &gap),
            Err(GcmsQueryError::Parameter(
                ParameterError::BinBoundsMismatch { .. }
            ))
        ));
        let zero = BinningConfig::Float {
            bin_width: 0.0,
            lower_boundary: 0.0,
            upper_boundary: 0.0,
            min_mass: None,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_data_errors() {
        let config = BinningConfig::default();
        assert!(matches!(
            build_intensity_matrix(&[], &config),
            Err(GcmsQueryError::DataShape(_))
        ));

        let backwards = vec![
            Scan::new(2.0, vec![50.0], vec![1.0]).unwrap(),
            Scan::new(1.0, vec![50.0], vec![1.0]).unwrap(),
        ];
        assert!(build_intensity_matrix(&backwards, &config).is_err());

        let ragged = vec![Scan {
            retention_time: 1.0,
            masses: vec![50.0],
            intensities: vec![],
        }];
        assert!(build_intensity_matrix(&ragged, &config).is_err());

        let no_masses = vec![Scan::new(1.0, vec![], vec![]).unwrap()];
        assert!(build_intensity_matrix(&no_masses, &config).is_err());
    }
}
