use gcmsquery::errors::{
    DataShapeError,
    InsufficientDataError,
    ParameterError,
};
use gcmsquery::IntensityMatrix;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use crate::alignment::tables::AlignmentTables;
use crate::area::ion_area;
use crate::detection::get_maxima_list_reduced;
use crate::errors::Result;

/// Settings for recovering missed peaks from the raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapFillConfig {
    /// Scans a maximum of the quantitation ion has to dominate.
    pub points: usize,
    /// Half-width of the search around the group's mean retention time, in seconds.
    pub rt_window: f64,
    /// Minimum apex intensity of the quantitation ion.
    /// Qualifier ions need half of it at the same scan.
    pub threshold: f64,
    pub tolerance_percent: f64,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            points: 3,
            rt_window: 1.0,
            threshold: 1000.0,
            tolerance_percent: 0.5,
        }
    }
}

impl GapFillConfig {
    pub fn validate(&self) -> Result<()> {
        if self.points < 3 || self.points % 2 == 0 {
            return Err(ParameterError::ExpectedOddWindow {
                parameter: "points",
                value: self.points,
                context: "GapFillConfig".to_string(),
            }
            .into());
        }
        for (parameter, value) in [
            ("rt_window", self.rt_window),
            ("tolerance_percent", self.tolerance_percent),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParameterError::ExpectedPositive {
                    parameter,
                    value,
                    context: "GapFillConfig".to_string(),
                }
                .into());
            }
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(ParameterError::InvalidValue {
                parameter: "threshold",
                value: self.threshold.to_string(),
                context: "GapFillConfig".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FilledGap {
    retention_time: f64,
    area: f64,
}

fn covers_mass(im: &IntensityMatrix, mass: f64) -> bool {
    (im.min_mass()..=im.max_mass()).contains(&mass)
}

/// Largest qualified peak of `quant_ion` near `target_rt`, if any.
fn find_missing_peak(
    im: &IntensityMatrix,
    quant_ion: f64,
    qualifier_ions: &[f64],
    target_rt: f64,
    config: &GapFillConfig,
) -> Result<Option<FilledGap>> {
    if !covers_mass(im, quant_ion) || !qualifier_ions.iter().all(|m| covers_mass(im, *m)) {
        return Ok(None);
    }
    let ic = im.get_ic_at_mass(Some(quant_ion))?;
    let maxima = get_maxima_list_reduced(&ic, target_rt, config.points, config.rt_window)?;
    if maxima.is_empty() {
        return Ok(None);
    }
    let qualifier_traces = qualifier_ions
        .iter()
        .map(|m| -> Result<Vec<f64>> { Ok(im.get_ic_at_mass(Some(*m))?.into_intensities()) })
        .collect::<Result<Vec<_>>>()?;

    let mut best: Option<FilledGap> = None;
    for (apex_rt, intensity) in maxima {
        if intensity <= config.threshold {
            continue;
        }
        let apex = ic.get_index_at_time(apex_rt)?;
        if qualifier_traces
            .iter()
            .any(|trace| trace[apex] <= config.threshold / 2.0)
        {
            continue;
        }
        let area = ion_area(ic.intensities(), apex, 0, config.tolerance_percent)?.area;
        if best.map_or(true, |b| area > b.area) {
            best = Some(FilledGap {
                retention_time: apex_rt,
                area,
            });
        }
    }
    Ok(best)
}

/// Fills the missing areas of single-ion tables by integrating the
/// quantitation ion around each group's mean retention time.
///
/// `matrices` follow the table rows. A gap is filled with the largest
/// maximum of the quantitation ion within `rt_window` that clears
/// `threshold` and whose qualifier ions clear half of it. Its apex time
/// goes into the retention time table when that cell is empty too.
/// Returns how many cells were filled.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn fill_gaps(
    tables: &mut AlignmentTables,
    matrices: &[IntensityMatrix],
    config: &GapFillConfig,
) -> Result<usize> {
    config.validate()?;
    if matrices.len() != tables.experiment_codes.len() {
        return Err(DataShapeError::ExpectedSlicesSameLength {
            expected: tables.experiment_codes.len(),
            other: matrices.len(),
            context: "fill_gaps intensity matrices vs experiments".to_string(),
        }
        .into());
    }
    let quant_ions = match &tables.quant_ions {
        Some(ions) => ions,
        None => {
            return Err(InsufficientDataError::NoUsableValues {
                context: "fill_gaps needs tables of common ion areas".to_string(),
            }
            .into())
        }
    };

    let table = &*tables;
    let fills = matrices
        .par_iter()
        .enumerate()
        .map(|(row, im)| -> Result<Vec<(usize, FilledGap)>> {
            let mut out = Vec::new();
            for (col, cell) in table.area_table[row].iter().enumerate() {
                if cell.is_some() {
                    continue;
                }
                let found = find_missing_peak(
                    im,
                    quant_ions[col],
                    &table.qualifier_ions[col],
                    table.mean_rts[col],
                    config,
                )
                .map_err(|e| {
                    e.append_to_context(&format!(
                        "fill_gaps {} at {}",
                        table.experiment_codes[row], table.uids[col]
                    ))
                })?;
                if let Some(fill) = found {
                    out.push((col, fill));
                }
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let n_gaps: usize = tables
        .area_table
        .iter()
        .map(|row| row.iter().filter(|c| c.is_none()).count())
        .sum();
    let mut n_filled = 0;
    for (row, row_fills) in fills.into_iter().enumerate() {
        for (col, fill) in row_fills {
            debug!(
                "Filled {} in {} with area {} at {}",
                tables.uids[col], tables.experiment_codes[row], fill.area, fill.retention_time
            );
            tables.area_table[row][col] = Some(fill.area);
            if tables.rt_table[row][col].is_none() {
                tables.rt_table[row][col] = Some(fill.retention_time);
            }
            n_filled += 1;
        }
    }
    info!("Filled {} of {} gaps", n_filled, n_gaps);
    Ok(n_filled)
}
