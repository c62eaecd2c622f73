use std::path::Path;

use gcmsquery::errors::ParameterError;
use gcmsquery::{
    BinningConfig,
    NoiseConfig,
    TimeSpec,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::alignment::{
    AlignmentConfig,
    GapFillConfig,
};
use crate::area::AreaConfig;
use crate::detection::DetectionConfig;
use crate::errors::{
    ConfigError,
    Result,
};
use crate::filters::FilterConfig;

/// Clean-up applied to the intensity matrix before peak picking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MatrixConfig {
    /// Keep only this `(low, high)` mass range.
    #[serde(default)]
    pub mass_range: Option<(f64, f64)>,
    /// Zero these masses, e.g. column bleed ions.
    #[serde(default)]
    pub null_masses: Vec<f64>,
}

/// Every knob of a run, one section per stage.
///
/// Missing sections take their defaults:
///
/// ```
/// use gcmsseek::config::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(
///     r#"{"detection": {"points": 9, "scans": 2}, "rt_range": [{"minutes": 6.5}, {"minutes": 21.0}]}"#,
/// )
/// .unwrap();
/// assert_eq!(config.detection.points, 9);
/// assert_eq!(config.alignment.gap_penalty, 0.30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub binning: BinningConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub area: AreaConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub gap_fill: GapFillConfig,
    /// Peaks outside `(start, end)` are dropped from the experiment.
    #[serde(default)]
    pub rt_range: Option<(TimeSpec, TimeSpec)>,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                source,
                context: "PipelineConfig".to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReading {
            source,
            path: path.to_path_buf(),
        })?;
        Self::from_json_str(&contents)
            .map_err(|e| e.append_to_context(&path.display().to_string()))
    }

    /// Checks every section; the first problem found is returned.
    pub fn validate(&self) -> Result<()> {
        self.binning.validate()?;
        self.detection.validate()?;
        self.area.validate()?;
        self.alignment.validate()?;
        self.gap_fill.validate()?;
        if let Some((low, high)) = self.matrix.mass_range {
            if low >= high {
                return Err(ParameterError::InvalidRange {
                    parameter: "mass_range",
                    low,
                    high,
                    context: "PipelineConfig".to_string(),
                }
                .into());
            }
        }
        if let Some((start, end)) = self.rt_range {
            if start.seconds() >= end.seconds() {
                return Err(ParameterError::InvalidRange {
                    parameter: "rt_range",
                    low: start.seconds(),
                    high: end.seconds(),
                    context: "PipelineConfig".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
