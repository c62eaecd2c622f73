use rayon::prelude::*;
use tracing::debug;

use super::base::Array2D;
use super::chromatogram::{
    index_at_time,
    ChromatogramKind,
    IonChromatogram,
};
use super::spectrum::MassSpectrum;
use crate::errors::{
    DataShapeError,
    ParameterError,
    Result,
};
use crate::utils::sorted::{
    check_strictly_increasing,
    nearest_index,
};

/// Dense intensities indexed by scan (rows, retention time) and
/// mass bin (columns).
///
/// Invariants, checked on every construction or wholesale replacement:
/// - `time_list` has one entry per row and is strictly increasing.
/// - `mass_list` has one entry per column and is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityMatrix {
    time_list: Vec<f64>,
    mass_list: Vec<f64>,
    intensities: Array2D<f64>,
}

impl IntensityMatrix {
    pub fn new(time_list: Vec<f64>, mass_list: Vec<f64>, intensities: Array2D<f64>) -> Result<Self> {
        Self::check_parts(&time_list, &mass_list, &intensities)?;
        Ok(Self {
            time_list,
            mass_list,
            intensities,
        })
    }

    /// Placeholder 1x1 zero matrix at time 0 and mass 0, to be filled
    /// later with [IntensityMatrix::replace_contents].
    pub fn trivial() -> Self {
        Self {
            time_list: vec![0.0],
            mass_list: vec![0.0],
            intensities: Array2D::filled(1, 1, 0.0),
        }
    }

    pub fn replace_contents(
        &mut self,
        time_list: Vec<f64>,
        mass_list: Vec<f64>,
        intensities: Array2D<f64>,
    ) -> Result<()> {
        Self::check_parts(&time_list, &mass_list, &intensities)?;
        self.time_list = time_list;
        self.mass_list = mass_list;
        self.intensities = intensities;
        Ok(())
    }

    fn check_parts(time_list: &[f64], mass_list: &[f64], intensities: &Array2D<f64>) -> Result<()> {
        if time_list.is_empty() || mass_list.is_empty() {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "IntensityMatrix time or mass list".to_string(),
            }
            .into());
        }
        if intensities.nrows() != time_list.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: time_list.len(),
                other: intensities.nrows(),
                context: "IntensityMatrix rows vs time list".to_string(),
            }
            .into());
        }
        if intensities.ncols() != mass_list.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: mass_list.len(),
                other: intensities.ncols(),
                context: "IntensityMatrix columns vs mass list".to_string(),
            }
            .into());
        }
        check_strictly_increasing(time_list, "IntensityMatrix time list")?;
        check_strictly_increasing(mass_list, "IntensityMatrix mass list")?;
        Ok(())
    }

    /// (number of scans, number of mass bins)
    pub fn size(&self) -> (usize, usize) {
        (self.intensities.nrows(), self.intensities.ncols())
    }

    pub fn time_list(&self) -> &[f64] {
        &self.time_list
    }

    pub fn mass_list(&self) -> &[f64] {
        &self.mass_list
    }

    pub fn intensity_array(&self) -> &Array2D<f64> {
        &self.intensities
    }

    pub fn min_mass(&self) -> f64 {
        self.mass_list[0]
    }

    pub fn max_mass(&self) -> f64 {
        self.mass_list[self.mass_list.len() - 1]
    }

    pub fn min_rt(&self) -> f64 {
        self.time_list[0]
    }

    pub fn max_rt(&self) -> f64 {
        self.time_list[self.time_list.len() - 1]
    }

    fn check_column(&self, ix: usize, context: &str) -> Result<()> {
        if ix >= self.mass_list.len() {
            return Err(DataShapeError::IndexOutOfBounds {
                index: ix,
                len: self.mass_list.len(),
                context: context.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_row(&self, ix: usize, context: &str) -> Result<()> {
        if ix >= self.time_list.len() {
            return Err(DataShapeError::IndexOutOfBounds {
                index: ix,
                len: self.time_list.len(),
                context: context.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_mass_in_range(&self, mass: f64, context: &str) -> Result<()> {
        if !(self.min_mass()..=self.max_mass()).contains(&mass) {
            return Err(DataShapeError::ValueOutOfRange {
                value: mass,
                min: self.min_mass(),
                max: self.max_mass(),
                context: context.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Column of the bin closest to `mass`; ties go to the lower mass.
    /// Masses outside the matrix map to the first or last bin.
    pub fn get_index_of_mass(&self, mass: f64) -> usize {
        nearest_index(&self.mass_list, mass).unwrap_or(0)
    }

    pub fn get_mass_at_index(&self, ix: usize) -> Result<f64> {
        self.check_column(ix, "IntensityMatrix::get_mass_at_index")?;
        Ok(self.mass_list[ix])
    }

    /// Row of the scan closest to `time`, which must lie within the run.
    pub fn get_index_at_time(&self, time: f64) -> Result<usize> {
        index_at_time(&self.time_list, time, "IntensityMatrix::get_index_at_time")
    }

    pub fn get_time_at_index(&self, ix: usize) -> Result<f64> {
        self.check_row(ix, "IntensityMatrix::get_time_at_index")?;
        Ok(self.time_list[ix])
    }

    pub fn get_ic_at_index(&self, ix: usize) -> Result<IonChromatogram> {
        self.check_column(ix, "IntensityMatrix::get_ic_at_index")?;
        let column = self.intensities.get_column(ix).unwrap_or_default();
        IonChromatogram::new(
            column,
            self.time_list.clone(),
            ChromatogramKind::ExtractedIon {
                mass: self.mass_list[ix],
            },
        )
    }

    /// Extracted ion chromatogram of the nearest bin, or the TIC for `None`.
    pub fn get_ic_at_mass(&self, mass: Option<f64>) -> Result<IonChromatogram> {
        match mass {
            None => self.tic(),
            Some(m) => {
                self.check_mass_in_range(m, "IntensityMatrix::get_ic_at_mass")?;
                self.get_ic_at_index(self.get_index_of_mass(m))
            }
        }
    }

    pub fn set_ic_at_index(&mut self, ix: usize, intensities: &[f64]) -> Result<()> {
        self.check_column(ix, "IntensityMatrix::set_ic_at_index")?;
        self.intensities
            .set_column(ix, intensities)
            .map_err(|e| e.append_to_context("IntensityMatrix::set_ic_at_index"))
    }

    /// Raw intensity row of one scan.
    pub fn get_scan_at_index(&self, ix: usize) -> Result<&[f64]> {
        self.check_row(ix, "IntensityMatrix::get_scan_at_index")?;
        Ok(self.intensities.get_row(ix).unwrap_or(&[]))
    }

    pub fn get_ms_at_index(&self, ix: usize) -> Result<MassSpectrum> {
        let row = self.get_scan_at_index(ix)?;
        MassSpectrum::new(self.mass_list.clone(), row.to_vec())
    }

    pub fn get_ms_at_time(&self, time: f64) -> Result<MassSpectrum> {
        self.get_ms_at_index(self.get_index_at_time(time)?)
    }

    pub fn tic(&self) -> Result<IonChromatogram> {
        let sums: Vec<f64> = self.intensities.row_apply(|row| row.iter().sum()).collect();
        IonChromatogram::new(sums, self.time_list.clone(), ChromatogramKind::Tic)
    }

    pub fn base_peak_chromatogram(&self) -> Result<IonChromatogram> {
        let maxes: Vec<f64> = self
            .intensities
            .row_apply(|row| row.iter().copied().fold(0.0, f64::max))
            .collect();
        IonChromatogram::new(maxes, self.time_list.clone(), ChromatogramKind::BasePeak)
    }

    /// Keeps the bins with `low <= mass <= high`.
    pub fn crop_mass(&mut self, low: f64, high: f64) -> Result<()> {
        if low >= high {
            return Err(ParameterError::InvalidRange {
                parameter: "mass",
                low,
                high,
                context: "IntensityMatrix::crop_mass".to_string(),
            }
            .into());
        }
        self.check_mass_in_range(low, "IntensityMatrix::crop_mass low")?;
        self.check_mass_in_range(high, "IntensityMatrix::crop_mass high")?;

        let keep: Vec<usize> = self
            .mass_list
            .iter()
            .enumerate()
            .filter(|(_, m)| **m >= low && **m <= high)
            .map(|(i, _)| i)
            .collect();
        let cropped = self
            .intensities
            .select_columns(&keep)
            .map_err(|e| e.append_to_context("IntensityMatrix::crop_mass"))?;
        debug!(
            "Cropped mass range to [{}, {}], {} of {} bins kept",
            low,
            high,
            keep.len(),
            self.mass_list.len()
        );
        self.mass_list = keep.iter().map(|&i| self.mass_list[i]).collect();
        self.intensities = cropped;
        Ok(())
    }

    /// Zeroes the bin nearest to `mass` in every scan.
    pub fn null_mass(&mut self, mass: f64) -> Result<()> {
        self.check_mass_in_range(mass, "IntensityMatrix::null_mass")?;
        let ix = self.get_index_of_mass(mass);
        let nrows = self.intensities.nrows();
        self.intensities.set_column(ix, &vec![0.0; nrows])
    }

    /// Keeps only the `n` most intense bins of every scan, zeroing the rest.
    pub fn reduce_mass_spectra(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(ParameterError::ExpectedPositive {
                parameter: "n_intensities",
                value: 0.0,
                context: "IntensityMatrix::reduce_mass_spectra".to_string(),
            }
            .into());
        }
        self.intensities.iter_mut_rows().for_each(|row| {
            if row.len() <= n {
                return;
            }
            let mut order: Vec<usize> = (0..row.len()).collect();
            order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
            for &i in &order[n..] {
                row[i] = 0.0;
            }
        });
        Ok(())
    }

    /// Replaces every ion chromatogram with `f(ic)`, one rayon task per column.
    ///
    /// This is the hook for smoothing or baseline correction done outside
    /// this crate. All columns are computed before any is written back, so
    /// on error the matrix is left unchanged.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn par_transform_ion_chromatograms<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&IonChromatogram) -> Result<Vec<f64>> + Sync,
    {
        let ncols = self.mass_list.len();
        let new_columns: Vec<Vec<f64>> = (0..ncols)
            .into_par_iter()
            .map(|ix| {
                let ic = self.get_ic_at_index(ix)?;
                f(&ic).map_err(|e| e.append_to_context(&format!("transforming column {}", ix)))
            })
            .collect::<Result<Vec<_>>>()?;

        let transposed = Array2D::from_columns(&new_columns)
            .map_err(|e| e.append_to_context("IntensityMatrix::par_transform_ion_chromatograms"))?;
        if transposed.nrows() != self.time_list.len() {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: self.time_list.len(),
                other: transposed.nrows(),
                context: "IntensityMatrix::par_transform_ion_chromatograms".to_string(),
            }
            .into());
        }
        self.intensities = transposed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IntensityMatrix {
        let intensities = Array2D::new(vec![
            vec![1.0, 10.0, 3.0],
            vec![2.0, 20.0, 1.0],
            vec![0.0, 5.0, 9.0],
        ])
        .unwrap();
        IntensityMatrix::new(vec![1.0, 2.0, 3.0], vec![50.0, 51.0, 52.0], intensities).unwrap()
    }

    #[test]
    fn test_invariants_checked() {
        let arr = Array2D::filled(2, 2, 0.0);
        assert!(IntensityMatrix::new(vec![1.0, 1.0], vec![50.0, 51.0], arr.clone()).is_err());
        assert!(IntensityMatrix::new(vec![1.0, 2.0], vec![51.0, 50.0], arr.clone()).is_err());
        assert!(IntensityMatrix::new(vec![1.0, 2.0, 3.0], vec![50.0, 51.0], arr).is_err());
    }

    #[test]
    fn test_trivial_then_replace() -> Result<()> {
        let mut im = IntensityMatrix::trivial();
        assert_eq!(im.size(), (1, 1));
        let other = sample();
        im.replace_contents(
            other.time_list().to_vec(),
            other.mass_list().to_vec(),
            other.intensity_array().clone(),
        )?;
        assert_eq!(im, other);
        Ok(())
    }

    #[test]
    fn test_chromatograms() -> Result<()> {
        let im = sample();
        let tic = im.get_ic_at_mass(None)?;
        assert!(tic.is_tic());
        assert_eq!(tic.intensities(), &[14.0, 23.0, 14.0]);
        let xic = im.get_ic_at_mass(Some(51.4))?;
        assert_eq!(xic.intensities(), &[10.0, 20.0, 5.0]);
        assert!(im.get_ic_at_mass(Some(60.0)).is_err());
        let bp = im.base_peak_chromatogram()?;
        assert_eq!(bp.intensities(), &[10.0, 20.0, 9.0]);
        Ok(())
    }

    #[test]
    fn test_spectra_and_lookup() -> Result<()> {
        let im = sample();
        assert_eq!(im.get_ms_at_time(2.2)?.intensities(), &[2.0, 20.0, 1.0]);
        assert!(im.get_ms_at_time(3.5).is_err());
        assert_eq!(im.get_index_of_mass(50.5), 0);
        assert_eq!(im.get_index_of_mass(50.51), 1);
        assert_eq!(im.get_time_at_index(2)?, 3.0);
        assert!(im.get_mass_at_index(3).is_err());
        Ok(())
    }

    #[test]
    fn test_crop_and_null() -> Result<()> {
        let mut im = sample();
        im.null_mass(50.2)?;
        assert_eq!(im.get_ic_at_index(0)?.intensities(), &[0.0, 0.0, 0.0]);
        im.crop_mass(51.0, 52.0)?;
        assert_eq!(im.mass_list(), &[51.0, 52.0]);
        assert_eq!(im.size(), (3, 2));
        assert!(im.crop_mass(52.0, 51.0).is_err());
        assert!(im.crop_mass(40.0, 51.5).is_err());
        Ok(())
    }

    #[test]
    fn test_reduce_mass_spectra() -> Result<()> {
        let mut im = sample();
        im.reduce_mass_spectra(1)?;
        assert_eq!(im.get_scan_at_index(0)?, &[0.0, 10.0, 0.0]);
        assert_eq!(im.get_scan_at_index(2)?, &[0.0, 0.0, 9.0]);
        assert!(im.reduce_mass_spectra(0).is_err());
        Ok(())
    }

    #[test]
    fn test_par_transform() -> Result<()> {
        let mut im = sample();
        im.par_transform_ion_chromatograms(|ic| {
            Ok(ic.intensities().iter().map(|x| x * 2.0).collect())
        })?;
        assert_eq!(im.get_scan_at_index(1)?, &[4.0, 40.0, 2.0]);

        let before = im.clone();
        let res = im.par_transform_ion_chromatograms(|_| Ok(vec![1.0]));
        assert!(res.is_err());
        assert_eq!(im, before);
        Ok(())
    }
}
