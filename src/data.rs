//! Data
//!
//! Containers for the pre-binned training matrix, the raw matrices handed to the
//! predictor, the discretizer thresholds, and the source of the second order statistics.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contiguous Column Major Matrix data container.
///
/// Holds a dense matrix of values in a single borrowed slice, in column-major
/// order, so a feature column can be handed to the histogram builder as a slice.
///
/// # Type Parameters
/// * `T` - The value type, `u16` for binned data and `f64` for raw data.
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Indices into the data row-wise.
    pub index: Vec<usize>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    ///
    /// * `data` - Values laid out column after column, `rows * cols` long.
    /// * `rows` - Number of rows.
    /// * `cols` - Number of columns.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[j * self.rows + i]
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &'a [T] {
        &self.data[(col * self.rows)..((col + 1) * self.rows)]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        (0..self.cols).map(|j| *self.get(row, j)).collect()
    }
}

impl<'a, T> fmt::Display for Matrix<'a, T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut val = String::new();
        for i in 0..self.rows {
            for j in 0..self.cols {
                val.push_str(self.get(i, j).to_string().as_str());
                if j == (self.cols - 1) {
                    val.push('\n');
                } else {
                    val.push(' ');
                }
            }
        }
        write!(f, "{}", val)
    }
}

/// A jagged column aligned matrix, that owns its data contents.
///
/// Used to carry the discretizer's numeric thresholds, one column per feature,
/// where entry `b` of a column is the upper bound of bin `b`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JaggedMatrix<T> {
    /// The contents of the matrix.
    pub data: Vec<T>,
    /// The end index's of the matrix.
    pub ends: Vec<usize>,
    /// Number of columns in the matrix
    pub cols: usize,
    /// The number of elements in the matrix.
    pub n_records: usize,
}

impl<T> JaggedMatrix<T>
where
    T: Copy,
{
    /// Generate a jagged array from a vector of vectors
    pub fn from_vecs(vecs: &[Vec<T>]) -> Self {
        let mut data = Vec::new();
        let mut ends = Vec::with_capacity(vecs.len());
        for vec in vecs {
            data.extend_from_slice(vec);
            ends.push(data.len());
        }
        JaggedMatrix {
            n_records: data.len(),
            data,
            ends,
            cols: vecs.len(),
        }
    }

    /// Get a single value, `None` when either the column or the row is out of range.
    pub fn try_get(&self, col: usize, i: usize) -> Option<T> {
        if col >= self.cols {
            return None;
        }
        self.get_col(col).get(i).copied()
    }
}

impl<T> JaggedMatrix<T> {
    /// Get the column of a jagged array.
    pub fn get_col(&self, col: usize) -> &[T] {
        assert!(col < self.ends.len());
        let (i, j) = if col == 0 {
            (0, self.ends[col])
        } else {
            (self.ends[col - 1], self.ends[col])
        };
        &self.data[i..j]
    }
}

/// Where the second order statistics of the samples come from.
///
/// Losses such as squared error have a hessian that is the same for every
/// sample, in which case the grower never stores nor accumulates it per sample.
#[derive(Debug, Clone, Copy)]
pub enum Hessians<'a> {
    /// One value shared by every sample.
    Constant(f32),
    /// One value per sample, indexed by row.
    PerSample(&'a [f32]),
}

impl<'a> Hessians<'a> {
    /// Hessian of sample `i`.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        match self {
            Hessians::Constant(h) => *h,
            Hessians::PerSample(h) => h[i],
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Hessians::Constant(_))
    }

    /// Sum of the hessians of the samples in `index`, accumulated in `f64`.
    pub fn sum(&self, index: &[usize]) -> f64 {
        match self {
            Hessians::Constant(h) => f64::from(*h) * index.len() as f64,
            Hessians::PerSample(h) => index.iter().map(|i| f64::from(h[*i])).sum(),
        }
    }

    /// Number of stored values, `None` for a constant.
    pub fn len(&self) -> Option<usize> {
        match self {
            Hessians::Constant(_) => None,
            Hessians::PerSample(h) => Some(h.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_get() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 2, 3);
        println!("{}", m);
        assert_eq!(m.get(0, 0), &1);
        assert_eq!(m.get(1, 0), &2);
        assert_eq!(m.get(1, 2), &7);
    }

    #[test]
    fn test_matrix_get_col() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_col(1), &vec![5, 6, 7]);
        assert_eq!(m.get_col(0), &vec![1, 2, 3]);
    }

    #[test]
    fn test_matrix_row() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_row(2), vec![3, 7]);
        assert_eq!(m.get_row(0), vec![1, 5]);
        assert_eq!(m.get_row(1), vec![2, 6]);
    }

    #[test]
    fn test_jaggedmatrix_get_col() {
        let vecs = vec![vec![0], vec![5, 4, 3, 2], vec![4, 5]];
        let jmatrix = JaggedMatrix::from_vecs(&vecs);
        assert_eq!(jmatrix.get_col(1), vec![5, 4, 3, 2]);
        assert_eq!(jmatrix.get_col(0), vec![0]);
        assert_eq!(jmatrix.get_col(2), vec![4, 5]);
        assert_eq!(jmatrix.n_records, 7);
        assert_eq!(jmatrix.try_get(1, 3), Some(2));
        assert_eq!(jmatrix.try_get(1, 4), None);
        assert_eq!(jmatrix.try_get(3, 0), None);
    }

    #[test]
    fn test_hessians() {
        let index = vec![0, 2, 3];
        let constant = Hessians::Constant(2.0);
        assert!(constant.is_constant());
        assert_eq!(constant.get(10), 2.0);
        assert_eq!(constant.sum(&index), 6.0);
        assert_eq!(constant.len(), None);

        let h = vec![0.5, 1.0, 1.5, 2.0];
        let per_sample = Hessians::PerSample(&h);
        assert!(!per_sample.is_constant());
        assert_eq!(per_sample.get(2), 1.5);
        assert_eq!(per_sample.sum(&index), 4.0);
        assert_eq!(per_sample.len(), Some(4));
    }
}
