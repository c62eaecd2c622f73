use gcmsquery::errors::ParameterError;
use gcmsquery::TimeSpec;
use serde::Serialize;
use tracing::debug;

use super::peak::Peak;
use crate::errors::Result;

/// The peak list of one run, under a name used to label it in alignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    name: String,
    peaks: Vec<Peak>,
}

impl Experiment {
    pub fn new(name: impl Into<String>, peaks: Vec<Peak>) -> Self {
        Self {
            name: name.into(),
            peaks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn into_peaks(self) -> Vec<Peak> {
        self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Drops, in place, every peak outside the open interval `(low, high)`.
    pub fn select_rt_range(&mut self, low: TimeSpec, high: TimeSpec) -> Result<()> {
        let (lo, hi) = (low.seconds(), high.seconds());
        if lo >= hi {
            return Err(ParameterError::InvalidRange {
                parameter: "retention_time",
                low: lo,
                high: hi,
                context: format!("Experiment::select_rt_range on {}", self.name),
            }
            .into());
        }
        let before = self.peaks.len();
        self.peaks
            .retain(|p| p.retention_time() > lo && p.retention_time() < hi);
        debug!(
            "Experiment {}: kept {} of {} peaks in ({} s, {} s)",
            self.name,
            self.peaks.len(),
            before,
            lo,
            hi
        );
        Ok(())
    }

    /// Same as [Experiment::select_rt_range] with bounds like `"6.5m"` or `"400s"`.
    pub fn select_rt_range_str(&mut self, low: &str, high: &str) -> Result<()> {
        let low: TimeSpec = low.parse()?;
        let high: TimeSpec = high.parse()?;
        self.select_rt_range(low, high)
    }
}
