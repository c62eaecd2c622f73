use gcmsquery::errors::DataShapeError;
use serde::Serialize;

use crate::alignment::model::{
    composite_peak,
    Alignment,
};
use crate::errors::Result;
use crate::models::Peak;

/// Which area goes into the area table.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaSource {
    /// The peak's total area.
    Total,
    /// The area of the given ion, one per alignment column.
    CommonIon(Vec<f64>),
}

/// Retention time and area tables of an alignment.
///
/// Rows follow `experiment_codes`, columns the kept aligned groups. Gaps,
/// and peaks without the requested area, are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentTables {
    pub experiment_codes: Vec<String>,
    pub uids: Vec<String>,
    pub mean_rts: Vec<f64>,
    /// Ion behind each area column, when the areas are single-ion areas.
    pub quant_ions: Option<Vec<f64>>,
    /// The two most intense ions of each group's composite spectrum.
    pub qualifier_ions: Vec<Vec<f64>>,
    pub rt_table: Vec<Vec<Option<f64>>>,
    pub area_table: Vec<Vec<Option<f64>>>,
}

impl AlignmentTables {
    /// Builds the tables; with `require_all_experiments` only the groups
    /// found in every experiment are kept.
    pub fn new(
        alignment: &Alignment,
        area_source: &AreaSource,
        require_all_experiments: bool,
    ) -> Result<Self> {
        if let AreaSource::CommonIon(ions) = area_source {
            if ions.len() != alignment.len() {
                return Err(DataShapeError::ExpectedSlicesSameLength {
                    expected: alignment.len(),
                    other: ions.len(),
                    context: "AlignmentTables common ions vs columns".to_string(),
                }
                .into());
            }
        }

        let keep = alignment.column_indices(require_all_experiments);
        let all_rts = alignment.mean_rts();
        let n_expr = alignment.n_experiments();
        let mut rt_table = vec![Vec::with_capacity(keep.len()); n_expr];
        let mut area_table = vec![Vec::with_capacity(keep.len()); n_expr];
        let mut uids = Vec::with_capacity(keep.len());
        let mut mean_rts = Vec::with_capacity(keep.len());
        let mut qualifier_ions = Vec::with_capacity(keep.len());

        for &ci in keep.iter() {
            let column = &alignment.columns()[ci];
            let peaks: Vec<&Peak> = column.iter().flatten().map(|p| p.as_ref()).collect();
            let composite = composite_peak(&peaks, false)?;
            uids.push(composite.uid());
            qualifier_ions.push(composite.top_ions(2));
            mean_rts.push(all_rts[ci]);

            for (row, slot) in column.iter().enumerate() {
                let rt = slot.as_ref().map(|p| p.retention_time());
                let area = slot.as_ref().and_then(|p| match area_source {
                    AreaSource::Total => p.area(),
                    AreaSource::CommonIon(ions) => p.ion_area(ions[ci]),
                });
                rt_table[row].push(rt);
                area_table[row].push(area);
            }
        }

        let quant_ions = match area_source {
            AreaSource::Total => None,
            AreaSource::CommonIon(ions) => Some(keep.iter().map(|&ci| ions[ci]).collect()),
        };

        Ok(Self {
            experiment_codes: alignment.experiment_codes().to_vec(),
            uids,
            mean_rts,
            quant_ions,
            qualifier_ions,
            rt_table,
            area_table,
        })
    }
}
