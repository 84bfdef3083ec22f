//! Numeric building blocks shared by the transform and projection engines.

pub mod oblique;
pub mod pca;

use nalgebra::{DMatrix, RowDVector};

/// Tolerance below which a vector norm or determinant counts as zero.
pub const ZERO_EPS: f64 = 1e-10;

/// Column-wise mean of a row-per-point matrix.
pub fn row_mean(vectors: &DMatrix<f64>) -> RowDVector<f64> {
    vectors.row_mean()
}

/// Subtract the column-wise mean from every row.
pub fn center(vectors: &DMatrix<f64>) -> (DMatrix<f64>, RowDVector<f64>) {
    let mean = row_mean(vectors);
    let centered = DMatrix::from_fn(vectors.nrows(), vectors.ncols(), |i, j| {
        vectors[(i, j)] - mean[j]
    });
    (centered, mean)
}
