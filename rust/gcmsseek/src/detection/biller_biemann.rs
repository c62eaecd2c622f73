use gcmsquery::errors::ParameterError;
use gcmsquery::{
    Array2D,
    ChromatogramKind,
    IntensityMatrix,
    IonChromatogram,
    MassSpectrum,
};
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use crate::errors::Result;
use crate::models::{
    Peak,
    PeakBounds,
};

/// Settings for the Biller-Biemann local maxima detector.
///
/// `points` is the (odd) number of scans a value must dominate to count as
/// an apex. `scans` is the width of the window whose maxima get folded into
/// the strongest scan, to undo spectral skew across neighbouring scans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub points: usize,
    pub scans: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            points: 3,
            scans: 1,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_points(self.points)?;
        if self.scans == 0 {
            return Err(ParameterError::ExpectedPositive {
                parameter: "scans",
                value: 0.0,
                context: "Biller-Biemann detection".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn validate_points(points: usize) -> Result<()> {
    if points < 3 || points % 2 == 0 {
        return Err(ParameterError::ExpectedOddWindow {
            parameter: "points",
            value: points,
            context: "Biller-Biemann detection needs an odd window of at least 3".to_string(),
        }
        .into());
    }
    Ok(())
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn maxima_indices_unchecked(values: &[f64], points: usize) -> Vec<usize> {
    let half = points / 2;
    let mut out = Vec::new();
    // Start of a flat top, resolved once the plateau falls again.
    let mut edge: Option<usize> = None;

    for (index, window) in values.windows(points).enumerate() {
        let left = max_of(&window[..half]);
        let mid = window[half];
        let right = max_of(&window[half + 1..]);
        let centre = index + half;

        if mid > left && mid > right {
            out.push(centre);
            edge = None;
        } else if mid > left && mid == right {
            edge = Some(centre);
        } else if mid == left && mid > right {
            if let Some(start) = edge.take() {
                out.push((start + centre) / 2);
            }
        }
    }
    out
}

/// Scan indices of the local maxima of one trace.
///
/// A value is an apex when it is strictly larger than everything else in
/// the centred window of `points` scans. A flat top is reported once, at
/// the middle of the plateau.
///
/// ```
/// use gcmsseek::detection::get_maxima_indices;
///
/// let trace = [0.0, 1.0, 5.0, 1.0, 0.0, 2.0, 4.0, 4.0, 4.0, 2.0, 0.0];
/// assert_eq!(get_maxima_indices(&trace, 3).unwrap(), vec![2, 7]);
/// ```
pub fn get_maxima_indices(values: &[f64], points: usize) -> Result<Vec<usize>> {
    validate_points(points)?;
    Ok(maxima_indices_unchecked(values, points))
}

/// (retention time, intensity) of every local maximum of a chromatogram.
pub fn get_maxima_list(ic: &IonChromatogram, points: usize) -> Result<Vec<(f64, f64)>> {
    let indices = get_maxima_indices(ic.intensities(), points)?;
    indices
        .into_iter()
        .map(|i| Ok((ic.get_time_at_index(i)?, ic.get_intensity_at_index(i)?)))
        .collect()
}

/// Like [get_maxima_list] but only maxima within `window` seconds of `target_rt`.
pub fn get_maxima_list_reduced(
    ic: &IonChromatogram,
    target_rt: f64,
    points: usize,
    window: f64,
) -> Result<Vec<(f64, f64)>> {
    Ok(get_maxima_list(ic, points)?
        .into_iter()
        .filter(|(rt, _)| *rt > target_rt - window && *rt < target_rt + window)
        .collect())
}

/// Moves, for each scan, every maximum in the surrounding `scans` window into
/// the window scan with the largest summed maxima (the earliest on ties).
///
/// The sweep is sequential and in place, so later windows see what
/// earlier ones already moved.
fn combine_scans(maxima: &mut Array2D<f64>, scans: usize) {
    if scans <= 1 {
        return;
    }
    let nrows = maxima.nrows() as isize;
    let half = (scans / 2) as isize;

    for row in 0..nrows {
        let window = (row - half..row - half + scans as isize).filter(|r| (0..nrows).contains(r));

        let mut best = 0.0;
        let mut target = None;
        for r in window.clone() {
            let tic: f64 = maxima
                .get_row(r as usize)
                .map(|x| x.iter().sum())
                .unwrap_or(0.0);
            if tic > best {
                best = tic;
                target = Some(r as usize);
            }
        }
        let Some(target) = target else {
            continue;
        };

        for r in window.map(|r| r as usize).filter(|r| *r != target) {
            let moved: Vec<f64> = match maxima.get_row_mut(r) {
                Some(src) => {
                    let copy = src.to_vec();
                    src.iter_mut().for_each(|x| *x = 0.0);
                    copy
                }
                None => continue,
            };
            if let Some(dst) = maxima.get_row_mut(target) {
                dst.iter_mut().zip(moved).for_each(|(d, s)| *d += s);
            }
        }
    }
}

/// Matrix holding each ion's intensity at its own local maxima and zero
/// elsewhere, after combining across `scans` neighbouring scans.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn get_maxima_matrix(im: &IntensityMatrix, points: usize, scans: usize) -> Result<Array2D<f64>> {
    DetectionConfig { points, scans }.validate()?;
    let raw = im.intensity_array();
    let (nrows, ncols) = im.size();

    let per_column: Vec<Vec<usize>> = (0..ncols)
        .into_par_iter()
        .map(|c| {
            let column = raw.get_column(c).unwrap_or_default();
            maxima_indices_unchecked(&column, points)
        })
        .collect();

    let mut maxima = Array2D::filled(nrows, ncols, 0.0);
    for (c, rows) in per_column.iter().enumerate() {
        for &r in rows {
            maxima.insert(r, c, raw.get(r, c).unwrap_or(0.0));
        }
    }
    combine_scans(&mut maxima, scans);
    Ok(maxima)
}

/// TIC rebuilt from local maxima only, summed over a `scans` wide window.
pub fn sum_maxima(im: &IntensityMatrix, points: usize, scans: usize) -> Result<IonChromatogram> {
    let maxima = get_maxima_matrix(im, points, 1)?;
    let row_sums: Vec<f64> = maxima.row_apply(|row| row.iter().sum()).collect();
    let n = row_sums.len() as isize;
    let half = (scans / 2) as isize;

    let sums = (0..n)
        .map(|row| {
            (row - half..row - half + scans as isize)
                .filter(|r| (0..n).contains(r))
                .map(|r| row_sums[r as usize])
                .sum()
        })
        .collect();
    Ok(IonChromatogram::new(
        sums,
        im.time_list().to_vec(),
        ChromatogramKind::Tic,
    )?)
}

/// Biller-Biemann peak detection over a whole intensity matrix.
///
/// Every scan that still holds maxima after scan combination becomes a
/// peak carrying those maxima as its spectrum (over the full mass list).
/// Fewer scans than `points` gives an empty list rather than an error.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn biller_biemann(im: &IntensityMatrix, config: &DetectionConfig) -> Result<Vec<Peak>> {
    config.validate()?;
    let (nrows, ncols) = im.size();
    if nrows < config.points {
        debug!(
            "Only {} scans for a {} point window, no peaks",
            nrows, config.points
        );
        return Ok(Vec::new());
    }

    let maxima = get_maxima_matrix(im, config.points, config.scans)?;
    let mut peaks = Vec::new();
    for (row, intensities) in maxima.iter_rows().enumerate() {
        if intensities.iter().sum::<f64>() <= 0.0 {
            continue;
        }
        let rt = im.get_time_at_index(row)?;
        let ms = MassSpectrum::new(im.mass_list().to_vec(), intensities.to_vec())?;
        let mut peak = Peak::new(rt, ms)?;
        peak.set_bounds(PeakBounds {
            left: 0,
            apex: row,
            right: 0,
        });
        peaks.push(peak);
    }

    info!(
        "Biller-Biemann found {} peaks in {} scans x {} bins (points={}, scans={})",
        peaks.len(),
        nrows,
        ncols,
        config.points,
        config.scans
    );
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(columns: Vec<Vec<f64>>) -> IntensityMatrix {
        let nrows = columns[0].len();
        let ncols = columns.len();
        let arr = Array2D::from_columns(&columns).unwrap();
        IntensityMatrix::new(
            (0..nrows).map(|i| i as f64).collect(),
            (0..ncols).map(|i| 50.0 + i as f64).collect(),
            arr,
        )
        .unwrap()
    }

    #[test]
    fn test_maxima_indices_rules() {
        // Plain apex, plateau of two resolved to its start.
        let trace = [0.0, 3.0, 0.0, 1.0, 2.0, 2.0, 1.0];
        assert_eq!(get_maxima_indices(&trace, 3).unwrap(), vec![1, 4]);
        // A wider window hides the smaller bump.
        let trace = [0.0, 1.0, 2.0, 5.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        assert_eq!(get_maxima_indices(&trace, 5).unwrap(), vec![3]);
        // Flat signal has no maxima, short signal neither.
        assert!(get_maxima_indices(&[1.0; 10], 3).unwrap().is_empty());
        assert!(get_maxima_indices(&[1.0, 2.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_points_validation() {
        assert!(get_maxima_indices(&[1.0], 4).is_err());
        assert!(get_maxima_indices(&[1.0], 1).is_err());
        let bad = DetectionConfig {
            points: 3,
            scans: 0,
        };
        assert!(bad.validate().unwrap_err().is_parameter_error());
    }

    #[test]
    fn test_scan_combination_moves_to_strongest() -> Result<()> {
        // Ion 0 apexes at scan 2, ion 1 apexes at scan 3 (skewed spectrum).
        let im = matrix(vec![
            vec![0.0, 1.0, 10.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 4.0, 1.0, 0.0],
        ]);
        let separate = biller_biemann(&im, &DetectionConfig::default())?;
        assert_eq!(separate.len(), 2);

        let combined = biller_biemann(
            &im,
            &DetectionConfig {
                points: 3,
                scans: 3,
            },
        )?;
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].retention_time(), 2.0);
        assert_eq!(
            combined[0].mass_spectrum().unwrap().intensities(),
            &[10.0, 4.0]
        );
        assert_eq!(combined[0].bounds().unwrap().apex, 2);
        Ok(())
    }

    #[test]
    fn test_short_matrix_gives_no_peaks() -> Result<()> {
        let im = matrix(vec![vec![0.0, 5.0]]);
        assert!(biller_biemann(&im, &DetectionConfig::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_sum_maxima() -> Result<()> {
        let im = matrix(vec![
            vec![0.0, 1.0, 10.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 4.0, 1.0, 0.0],
        ]);
        let tic = sum_maxima(&im, 3, 1)?;
        assert_eq!(tic.intensities(), &[0.0, 0.0, 10.0, 4.0, 0.0, 0.0]);
        let tic = sum_maxima(&im, 3, 3)?;
        assert_eq!(tic.intensities(), &[0.0, 10.0, 14.0, 14.0, 4.0, 0.0]);

        let ic = im.get_ic_at_index(0)?;
        assert_eq!(get_maxima_list(&ic, 3)?, vec![(2.0, 10.0)]);
        assert!(get_maxima_list_reduced(&ic, 5.0, 3, 2.0)?.is_empty());
        Ok(())
    }
}
