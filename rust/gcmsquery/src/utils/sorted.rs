use crate::errors::{
    DataShapeError,
    Result,
};

/// Index of the element closest to `value` in an ascending slice.
///
/// Exact ties between two neighbours resolve to the lower index.
/// Returns `None` only for an empty slice.
///
/// ```
/// use gcmsquery::utils::sorted::nearest_index;
/// let masses = [50.0, 51.0, 52.0];
/// assert_eq!(nearest_index(&masses, 50.4), Some(0));
/// assert_eq!(nearest_index(&masses, 50.5), Some(0));
/// assert_eq!(nearest_index(&masses, 50.6), Some(1));
/// assert_eq!(nearest_index(&masses, 100.0), Some(2));
/// ```
pub fn nearest_index(sorted: &[f64], value: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let upper = sorted.partition_point(|x| *x < value);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted.len() {
        return Some(sorted.len() - 1);
    }
    let lower = upper - 1;
    if (value - sorted[lower]) <= (sorted[upper] - value) {
        Some(lower)
    } else {
        Some(upper)
    }
}

/// Errors on the first element that is non finite or not strictly
/// greater than its predecessor.
pub fn check_strictly_increasing(values: &[f64], context: &str) -> Result<()> {
    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(DataShapeError::ExpectedFiniteNonNanData {
                index: i,
                context: context.to_string(),
            }
            .into());
        }
        if i > 0 && *v <= values[i - 1] {
            return Err(DataShapeError::ExpectedStrictlyIncreasing {
                index: i,
                context: context.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
