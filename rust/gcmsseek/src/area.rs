use gcmsquery::errors::{
    DataShapeError,
    InsufficientDataError,
    ParameterError,
};
use gcmsquery::utils::stats::{
    centered_median3,
    median,
    percentile,
};
use gcmsquery::IntensityMatrix;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::errors::Result;
use crate::models::{
    IonAreas,
    Peak,
    PeakKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    /// Furthest a boundary may be from the apex, in scans. 0 means unbounded.
    pub max_bound: usize,
    /// Stop integrating once the edge drops below this percent of the area.
    pub tolerance_percent: f64,
    /// How many of the most intense ions get their own area recorded.
    pub n_top_ions: usize,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            max_bound: 0,
            tolerance_percent: 0.5,
            n_top_ions: 5,
        }
    }
}

impl AreaConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance_percent.is_finite() && self.tolerance_percent > 0.0) {
            return Err(ParameterError::ExpectedPositive {
                parameter: "tolerance_percent",
                value: self.tolerance_percent,
                context: "area estimation".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfArea {
    pub area: f64,
    /// Scans walked away from the apex.
    pub bound: usize,
    /// True when the walk stopped because the signal rose again,
    /// i.e. the boundary is shared with a neighbouring peak.
    pub shared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonArea {
    pub area: f64,
    pub left: usize,
    pub right: usize,
    pub left_shared: bool,
    pub right_shared: bool,
}

/// Integrates one side of a peak, `values[0]` being the apex.
///
/// Walks outward adding samples while the edge value keeps falling and
/// stays above `tol / 2` percent of the running area. The edge value is the
/// median of the three samples centred on the current position.
pub fn half_area(values: &[f64], max_bound: usize, tol: f64) -> HalfArea {
    if values.is_empty() {
        return HalfArea {
            area: 0.0,
            bound: 0,
            shared: false,
        };
    }
    let tol = tol / 200.0;
    let limit = if max_bound < 1 {
        values.len()
    } else {
        (max_bound + 1).min(values.len())
    };

    let mut area = values[0];
    let mut edge = centered_median3(values, 0);
    let mut old_edge = 2.0 * edge;
    let mut index = 1;
    while area * tol < edge && edge < old_edge && index < limit {
        old_edge = edge;
        area += values[index];
        edge = centered_median3(values, index);
        index += 1;
    }

    HalfArea {
        area,
        bound: index - 1,
        shared: edge >= old_edge,
    }
}

/// Area of one ion chromatogram around `apex`, both sides combined.
///
/// ```
/// use gcmsseek::area::ion_area;
///
/// let trace = [0.0, 0.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 800.0, 600.0, 400.0, 200.0, 0.0, 0.0];
/// let res = ion_area(&trace, 6, 0, 0.5).unwrap();
/// assert_eq!(res.area, 5000.0);
/// assert_eq!((res.left, res.right), (5, 5));
/// ```
pub fn ion_area(values: &[f64], apex: usize, max_bound: usize, tol: f64) -> Result<IonArea> {
    if apex >= values.len() {
        return Err(DataShapeError::IndexOutOfBounds {
            index: apex,
            len: values.len(),
            context: "ion_area apex".to_string(),
        }
        .into());
    }
    let lhs: Vec<f64> = values[..=apex].iter().rev().copied().collect();
    let left = half_area(&lhs, max_bound, tol);
    let right = half_area(&values[apex..], max_bound, tol);

    // The apex is counted by both halves.
    let area = (left.area + right.area - values[apex]).max(0.0);
    Ok(IonArea {
        area,
        left: left.bound,
        right: right.bound,
        left_shared: left.shared,
        right_shared: right.shared,
    })
}

fn apex_index(im: &IntensityMatrix, peak: &Peak) -> Result<usize> {
    match peak.bounds() {
        Some(b) if b.apex < im.size().0 => Ok(b.apex),
        _ => Ok(im.get_index_at_time(peak.retention_time())?),
    }
}

/// Masses of the peak's ions with non-zero intensity.
fn apexing_masses(peak: &Peak) -> Vec<f64> {
    match peak.kind() {
        PeakKind::FullSpectrum(ms) => ms
            .iter()
            .filter(|(_, i)| *i > 0.0)
            .map(|(m, _)| m)
            .collect(),
        PeakKind::SingleIon { mass } => vec![*mass],
    }
}

fn ion_area_at_mass(
    im: &IntensityMatrix,
    mass: f64,
    apex: usize,
    max_bound: usize,
    tol: f64,
) -> Result<IonArea> {
    let ic = im.get_ic_at_mass(Some(mass))?;
    ion_area(ic.intensities(), apex, max_bound, tol)
}

/// Total area of a peak summed over every ion with non-zero intensity,
/// plus the area of each of those ions.
pub fn peak_sum_area(
    im: &IntensityMatrix,
    peak: &Peak,
    max_bound: usize,
    tol: f64,
) -> Result<(f64, IonAreas)> {
    let apex = apex_index(im, peak)?;
    let mut total = 0.0;
    let mut areas = IonAreas::new();
    for mass in apexing_masses(peak) {
        let res = ion_area_at_mass(im, mass, apex, max_bound, tol)
            .map_err(|e| e.append_to_context(&format!("peak_sum_area for {}", peak.uid())))?;
        areas.insert(mass, res.area);
        total += res.area;
    }
    Ok((total, areas))
}

/// Areas of the `n_top_ions` most intense (non-zero) ions of a peak.
pub fn peak_top_ion_areas(
    im: &IntensityMatrix,
    peak: &Peak,
    n_top_ions: usize,
    max_bound: usize,
    tol: f64,
) -> Result<IonAreas> {
    let apex = apex_index(im, peak)?;
    let top: Vec<f64> = match peak.kind() {
        PeakKind::FullSpectrum(ms) => ms
            .ranked_indices()
            .into_iter()
            .filter(|&i| ms.intensities()[i] > 0.0)
            .take(n_top_ions)
            .map(|i| ms.masses()[i])
            .collect(),
        PeakKind::SingleIon { mass } => vec![*mass],
    };

    top.into_iter()
        .map(|mass| Ok((mass, ion_area_at_mass(im, mass, apex, max_bound, tol)?.area)))
        .collect()
}

/// Median left and right bounds over the peak's apexing ions.
///
/// With `include_shared` false, sides that ended on a shared boundary are
/// left out. A side with no usable bound reports 0.
pub fn median_bounds(im: &IntensityMatrix, peak: &Peak, include_shared: bool) -> Result<(f64, f64)> {
    let apex = apex_index(im, peak)?;
    let mut lefts = Vec::new();
    let mut rights = Vec::new();
    for mass in apexing_masses(peak) {
        let res = ion_area_at_mass(im, mass, apex, 0, AreaConfig::default().tolerance_percent)?;
        if include_shared || !res.left_shared {
            lefts.push(res.left as f64);
        }
        if include_shared || !res.right_shared {
            rights.push(res.right as f64);
        }
    }
    Ok((median(&lefts).unwrap_or(0.0), median(&rights).unwrap_or(0.0)))
}

/// Approximate (left, right) extent of a peak: the 95th percentile of the
/// per-ion bounds, rounded up.
pub fn peak_pt_bounds(im: &IntensityMatrix, peak: &Peak) -> Result<(usize, usize)> {
    let apex = apex_index(im, peak)?;
    let mut lefts = Vec::new();
    let mut rights = Vec::new();
    for mass in apexing_masses(peak) {
        let res = ion_area_at_mass(im, mass, apex, 0, AreaConfig::default().tolerance_percent)?;
        lefts.push(res.left as f64);
        rights.push(res.right as f64);
    }
    match (percentile(&lefts, 95.0), percentile(&rights, 95.0)) {
        (Some(l), Some(r)) => Ok((l.ceil() as usize, r.ceil() as usize)),
        _ => Err(InsufficientDataError::NoUsableValues {
            context: format!("peak_pt_bounds: peak {} has no apexing ions", peak.uid()),
        }
        .into()),
    }
}

/// Sets the total area and the top ion areas of every peak.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn estimate_peak_areas(im: &IntensityMatrix, peaks: &mut [Peak], config: &AreaConfig) -> Result<()> {
    config.validate()?;
    let tol = config.tolerance_percent;
    for peak in peaks.iter_mut() {
        let (total, _) = peak_sum_area(im, peak, config.max_bound, tol)?;
        let top = peak_top_ion_areas(im, peak, config.n_top_ions, config.max_bound, tol)?;
        peak.set_area(total)?;
        peak.set_ion_areas(top);
    }
    debug!("Estimated areas for {} peaks", peaks.len());
    Ok(())
}
