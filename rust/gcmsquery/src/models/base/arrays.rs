use crate::errors::{
    DataShapeError,
    Result,
};

/// Dense row-major 2D array.
///
/// In this crate rows are scans (retention time) and columns are
/// mass bins, so a row is a binned spectrum and a column is an
/// extracted ion chromatogram.
///
/// `values` is a flattened array of values
/// `major_dim` is the number of values in each row
/// `minor_dim` is the number of rows
///
/// Values that belong to the same row are adjacent in memory,
/// column access strides over `major_dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array2D<T: Copy> {
    pub(super) values: Vec<T>,
    pub(super) major_dim: usize,
    pub(super) minor_dim: usize,
}

impl<T: Copy> Array2D<T> {
    pub fn new<S: AsRef<[T]>, C: AsRef<[S]>>(values: C) -> Result<Array2D<T>> {
        let nrows = values.as_ref().len();
        if nrows == 0 {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::new rows".to_string(),
            }
            .into());
        }
        let ncols = values.as_ref()[0].as_ref().len();
        if ncols == 0 {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::new columns".to_string(),
            }
            .into());
        }

        let mut flat = Vec::with_capacity(nrows * ncols);
        for row in values.as_ref().iter() {
            if row.as_ref().len() != ncols {
                return Err(DataShapeError::ExpectedSlicesSameLength {
                    expected: ncols,
                    other: row.as_ref().len(),
                    context: "Array2D::new ragged rows".to_string(),
                }
                .into());
            }
            flat.extend_from_slice(row.as_ref());
        }

        Ok(Array2D {
            values: flat,
            major_dim: ncols,
            minor_dim: nrows,
        })
    }

    /// Builds an array from a list of columns.
    ///
    /// ```
    /// use gcmsquery::Array2D;
    /// let array = Array2D::from_columns(vec![vec![1, 4], vec![2, 5], vec![3, 6]]).unwrap();
    /// assert_eq!(array.get_row(0), Some([1, 2, 3].as_ref()));
    /// assert_eq!(array.get_column(2), Some(vec![3, 6]));
    /// ```
    pub fn from_columns<S: AsRef<[T]>, C: AsRef<[S]>>(columns: C) -> Result<Array2D<T>> {
        let ncols = columns.as_ref().len();
        if ncols == 0 {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::from_columns columns".to_string(),
            }
            .into());
        }
        let nrows = columns.as_ref()[0].as_ref().len();
        if nrows == 0 {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::from_columns rows".to_string(),
            }
            .into());
        }

        let fill = columns.as_ref()[0].as_ref()[0];
        let mut out = Array2D::filled(nrows, ncols, fill);
        for (ci, col) in columns.as_ref().iter().enumerate() {
            out.set_column(ci, col.as_ref())?;
        }
        Ok(out)
    }

    pub fn from_flat_vector(values: Vec<T>, nrows: usize, ncols: usize) -> Result<Array2D<T>> {
        if ncols == 0 {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::from_flat_vector columns".to_string(),
            }
            .into());
        }
        if values.len() != nrows * ncols {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: nrows * ncols,
                other: values.len(),
                context: "Array2D::from_flat_vector".to_string(),
            }
            .into());
        }
        Ok(Array2D {
            values,
            major_dim: ncols,
            minor_dim: nrows,
        })
    }

    pub fn filled(nrows: usize, ncols: usize, value: T) -> Array2D<T> {
        Array2D {
            values: vec![value; nrows * ncols],
            major_dim: ncols,
            minor_dim: nrows,
        }
    }

    pub fn nrows(&self) -> usize {
        self.minor_dim
    }

    pub fn ncols(&self) -> usize {
        self.major_dim
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn get(&self, row_idx: usize, col_idx: usize) -> Option<T> {
        if row_idx >= self.minor_dim || col_idx >= self.major_dim {
            return None;
        }
        Some(self.values[row_idx * self.major_dim + col_idx])
    }

    /// Panics if the position is outside the array, same as slice indexing.
    pub fn insert(&mut self, row_idx: usize, col_idx: usize, value: T) {
        assert!(col_idx < self.major_dim, "Column {} out of bounds", col_idx);
        let idx = row_idx * self.major_dim + col_idx;
        self.values[idx] = value;
    }

    pub fn get_row(&self, index: usize) -> Option<&[T]> {
        if index >= self.minor_dim {
            return None;
        }
        let start = index * self.major_dim;
        Some(&self.values[start..start + self.major_dim])
    }

    pub fn get_row_mut(&mut self, index: usize) -> Option<&mut [T]> {
        if index >= self.minor_dim {
            return None;
        }
        let start = index * self.major_dim;
        Some(&mut self.values[start..start + self.major_dim])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        self.values.chunks(self.major_dim)
    }

    pub fn iter_mut_rows(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.values.chunks_mut(self.major_dim)
    }

    /// Apply a function to each row of the array
    ///
    /// ```
    /// use gcmsquery::Array2D;
    /// let array = Array2D::new(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
    /// let result: Vec<u32> = array.row_apply(|x| x.iter().sum()).collect();
    /// assert_eq!(result, vec![6, 15]);
    /// ```
    pub fn row_apply<'a: 'b, 'b, W, F: FnMut(&[T]) -> W + 'b>(
        &'a self,
        f: F,
    ) -> impl Iterator<Item = W> + 'b {
        self.values.chunks(self.major_dim).map(f)
    }

    pub fn get_column(&self, index: usize) -> Option<Vec<T>> {
        if index >= self.major_dim {
            return None;
        }
        Some(
            self.values
                .iter()
                .skip(index)
                .step_by(self.major_dim)
                .copied()
                .collect(),
        )
    }

    pub fn set_column(&mut self, index: usize, column: &[T]) -> Result<()> {
        if index >= self.major_dim {
            return Err(DataShapeError::IndexOutOfBounds {
                index,
                len: self.major_dim,
                context: "Array2D::set_column".to_string(),
            }
            .into());
        }
        if column.len() != self.minor_dim {
            return Err(DataShapeError::ExpectedSlicesSameLength {
                expected: self.minor_dim,
                other: column.len(),
                context: "Array2D::set_column".to_string(),
            }
            .into());
        }
        for (ri, val) in column.iter().enumerate() {
            self.values[ri * self.major_dim + index] = *val;
        }
        Ok(())
    }

    /// Keeps only the listed columns, in the order given.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Array2D<T>> {
        if indices.is_empty() {
            return Err(DataShapeError::ExpectedNonEmptyData {
                context: "Array2D::select_columns".to_string(),
            }
            .into());
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.major_dim) {
            return Err(DataShapeError::IndexOutOfBounds {
                index: bad,
                len: self.major_dim,
                context: "Array2D::select_columns".to_string(),
            }
            .into());
        }
        let mut values = Vec::with_capacity(indices.len() * self.minor_dim);
        for row in self.iter_rows() {
            values.extend(indices.iter().map(|&i| row[i]));
        }
        Ok(Array2D {
            values,
            major_dim: indices.len(),
            minor_dim: self.minor_dim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array2d_new() -> Result<()> {
        let values = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let array = Array2D::new(&values)?;

        assert_eq!(array.ncols(), 3);
        assert_eq!(array.nrows(), 2);
        assert_eq!(array.values, vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_array2d_from_columns() -> Result<()> {
        let columns = vec![vec![1, 4], vec![2, 5], vec![3, 6]];
        let array = Array2D::from_columns(&columns)?;

        assert_eq!(array.ncols(), 3);
        assert_eq!(array.nrows(), 2);
        assert_eq!(array.values, vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_array2d_error_handling() {
        let ragged = vec![vec![1, 2, 3], vec![4, 5]];
        assert!(Array2D::new(&ragged).is_err());

        let empty_values: Vec<Vec<i32>> = vec![];
        assert!(Array2D::new(&empty_values).is_err());

        let ragged_columns = vec![vec![1, 4], vec![2], vec![3, 6]];
        assert!(Array2D::from_columns(&ragged_columns).is_err());

        assert!(Array2D::from_flat_vector(vec![1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_column_roundtrip() -> Result<()> {
        let mut array = Array2D::new(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])?;
        assert_eq!(array.get_column(1), Some(vec![2.0, 4.0, 6.0]));
        array.set_column(0, &[10.0, 30.0, 50.0])?;
        assert_eq!(array.get_row(1), Some([30.0, 4.0].as_ref()));
        assert!(array.set_column(0, &[1.0]).is_err());
        assert!(array.set_column(2, &[1.0, 2.0, 3.0]).is_err());
        assert_eq!(array.get_column(2), None);
        Ok(())
    }

    #[test]
    fn test_select_columns() -> Result<()> {
        let array = Array2D::new(vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]])?;
        let selected = array.select_columns(&[1, 3])?;
        assert_eq!(selected.values, vec![2, 4, 6, 8]);
        assert_eq!(selected.ncols(), 2);
        assert!(array.select_columns(&[4]).is_err());
        Ok(())
    }

    #[test]
    fn test_insertion() {
        let mut array = Array2D::new(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        array.insert(0, 0, 7);
        array.insert(1, 2, 8);
        assert_eq!(array.values, vec![7, 2, 3, 4, 5, 8]);
        assert_eq!(array.get(1, 2), Some(8));
        assert_eq!(array.get(2, 0), None);
    }
}
