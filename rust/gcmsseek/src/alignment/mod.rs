pub mod common_ion;
pub mod dp;
pub mod gap_fill;
pub mod guide_tree;
pub mod model;
pub mod scoring;
pub mod tables;

use gcmsquery::errors::ParameterError;
use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::Result;

pub use common_ion::common_ion;
pub use dp::align_pair;
pub use gap_fill::{
    fill_gaps,
    GapFillConfig,
};
pub use guide_tree::{
    align_with_tree,
    average_linkage,
    guide_tree,
    GuideTree,
    NodeRef,
    TreeNode,
};
pub use model::{
    composite_peak,
    Alignment,
    Column,
};
pub use tables::{
    AlignmentTables,
    AreaSource,
};

/// Retention time widths are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Within-state retention time width (`Dw`).
    pub rt_width: f64,
    /// Within-state gap penalty (`Gw`).
    pub gap_penalty: f64,
    pub min_peaks: usize,
    /// Looser width used when aligning two states against each other.
    pub between_state_rt_width: f64,
    pub between_state_gap_penalty: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            rt_width: 2.5,
            gap_penalty: 0.30,
            min_peaks: 1,
            between_state_rt_width: 10.0,
            between_state_gap_penalty: 0.30,
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<()> {
        for (parameter, value) in [
            ("rt_width", self.rt_width),
            ("between_state_rt_width", self.between_state_rt_width),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParameterError::ExpectedPositive {
                    parameter,
                    value,
                    context: "AlignmentConfig".to_string(),
                }
                .into());
            }
        }
        for (parameter, value) in [
            ("gap_penalty", self.gap_penalty),
            ("between_state_gap_penalty", self.between_state_gap_penalty),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParameterError::InvalidValue {
                    parameter,
                    value: value.to_string(),
                    context: "AlignmentConfig".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
