use std::cmp::Ordering;

use gcmsquery::errors::InsufficientDataError;
use tracing::debug;

use crate::alignment::model::{
    Alignment,
    Column,
};
use crate::errors::Result;

const ION_MATCH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct IonTally {
    mass: f64,
    count: usize,
    area_sum: f64,
}

impl IonTally {
    fn mean_area(&self) -> f64 {
        self.area_sum / self.count as f64
    }
}

/// Picks the quantitation ion of one column.
///
/// The ion recorded in the most peaks wins, then the one with the greatest
/// mean area, then the lower mass.
pub fn column_common_ion(column: &Column) -> Option<f64> {
    let mut tallies: Vec<IonTally> = Vec::new();
    for peak in column.iter().flatten() {
        for (mass, area) in peak.ion_areas().iter() {
            match tallies
                .iter_mut()
                .find(|t| (t.mass - mass).abs() <= ION_MATCH_TOLERANCE)
            {
                Some(t) => {
                    t.count += 1;
                    t.area_sum += area;
                }
                None => tallies.push(IonTally {
                    mass,
                    count: 1,
                    area_sum: area,
                }),
            }
        }
    }

    tallies
        .into_iter()
        .max_by(|a, b| {
            a.count
                .cmp(&b.count)
                .then_with(|| a.mean_area().total_cmp(&b.mean_area()))
                .then_with(|| b.mass.partial_cmp(&a.mass).unwrap_or(Ordering::Equal))
        })
        .map(|t| t.mass)
}

/// One common ion per column of `alignment`, in column order.
///
/// Fails on the first column where no peak has recorded ion areas.
pub fn common_ion(alignment: &Alignment) -> Result<Vec<f64>> {
    let ions = alignment
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            column_common_ion(col).ok_or_else(|| {
                InsufficientDataError::NoUsableValues {
                    context: format!("common_ion: column {} has no ion areas", i),
                }
                .into()
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    debug!("Selected common ions for {} columns", ions.len());
    Ok(ions)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{
        IonAreas,
        Peak,
    };

    fn peak_with_areas(areas: &[(f64, f64)]) -> Option<Arc<Peak>> {
        let mut p = Peak::single_ion(10.0, 73.0).unwrap();
        p.set_ion_areas(areas.iter().cloned().collect::<IonAreas>());
        Some(Arc::new(p))
    }

    #[test]
    fn test_most_frequent_ion_wins() {
        let col = vec![
            peak_with_areas(&[(73.0, 10.0), (147.0, 500.0)]),
            peak_with_areas(&[(73.0, 12.0)]),
            None,
        ];
        assert_eq!(column_common_ion(&col), Some(73.0));
    }

    #[test]
    fn test_tie_goes_to_larger_mean_area_then_lower_mass() {
        let col = vec![
            peak_with_areas(&[(73.0, 10.0), (147.0, 20.0)]),
            peak_with_areas(&[(73.0, 10.0), (147.0, 20.0)]),
        ];
        assert_eq!(column_common_ion(&col), Some(147.0));

        let col = vec![peak_with_areas(&[(147.0, 5.0), (73.0, 5.0)])];
        assert_eq!(column_common_ion(&col), Some(73.0));
    }

    #[test]
    fn test_column_without_areas_fails() {
        let p = Arc::new(Peak::single_ion(10.0, 73.0).unwrap());
        let aln = Alignment::from_columns(vec!["a".to_string()], vec![vec![Some(p)]], None)
            .unwrap();
        let err = common_ion(&aln).unwrap_err();
        assert!(err.is_insufficient_data_error());
    }
}
