//! Oblique projection onto user-defined axes.
//!
//! Given one or two direction vectors, points are re-expressed as
//! coefficients along those directions so the axes themselves land on the
//! orthonormal output basis: a displacement equal to the first axis maps to
//! exactly (1, 0) and the second to (0, 1), whatever the axes' lengths or
//! mutual angle. The full-dimensional variant keeps the remaining standard
//! axes as trailing coordinates.

use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::math::{center, ZERO_EPS};

/// Drop axes with (near-)zero norm, keeping at most `max_axes`.
pub fn usable_axes(axes: &[DVector<f64>], max_axes: usize) -> Vec<&DVector<f64>> {
    axes.iter()
        .filter(|axis| axis.norm() > ZERO_EPS)
        .take(max_axes)
        .collect()
}

/// Project onto 1-2 axes, producing an N x `dimensions` coordinate matrix.
///
/// No usable axes: all-zero output. One axis: orthogonal projection onto the
/// normalized axis (distance units) in the first column, remaining columns
/// zero-filled. Two axes: oblique coefficients via `(V^T V)^-1 V^T` on
/// mean-centered data; if the axes are (near-)parallel the Gram matrix is
/// singular and the first axis alone is used.
pub fn project_2d(vectors: &DMatrix<f64>, axes: &[DVector<f64>], dimensions: usize) -> DMatrix<f64> {
    let n = vectors.nrows();
    let usable = usable_axes(axes, dimensions.max(2));
    if usable.is_empty() {
        return DMatrix::zeros(n, dimensions);
    }

    let (centered, _) = center(vectors);

    let coords = if usable.len() < 2 {
        single_axis_coords(&centered, usable[0])
    } else {
        match coefficient_matrix(usable[0], usable[1]) {
            Some(projection) => &centered * projection.transpose(),
            None => {
                warn!("custom axes are parallel; projecting onto the first axis only");
                single_axis_coords(&centered, usable[0])
            }
        }
    };

    pad_columns(coords, dimensions)
}

/// Full-dimensional change of basis: coordinates 0/1 are the axis
/// coefficients, coordinates 2..D-1 follow the preserved standard axes.
///
/// With a single axis the second basis direction is synthesized from the
/// standard basis vector least parallel to it. A singular basis falls back
/// to the 2D result padded with the centered remaining dimensions.
pub fn project_full(vectors: &DMatrix<f64>, axes: &[DVector<f64>]) -> DMatrix<f64> {
    let n = vectors.nrows();
    let d = vectors.ncols();
    let usable = usable_axes(axes, 2);
    if usable.is_empty() {
        return DMatrix::zeros(n, d);
    }
    if d < 2 {
        return project_2d(vectors, axes, d);
    }

    let v1 = usable[0].clone();
    let v2 = match usable.get(1) {
        Some(v2) => (*v2).clone(),
        None => synthesize_second_axis(&v1),
    };

    let mut basis = DMatrix::<f64>::identity(d, d);
    basis.set_column(0, &v1);
    basis.set_column(1, &v2);

    let (centered, _) = center(vectors);

    if basis.determinant().abs() < ZERO_EPS {
        warn!("custom-axes basis is singular; falling back to planar projection");
        let planar = project_2d(vectors, axes, 2);
        let mut out = DMatrix::zeros(n, d);
        out.columns_mut(0, 2).copy_from(&planar);
        if d > 2 {
            out.columns_mut(2, d - 2)
                .copy_from(&centered.columns(2, d - 2));
        }
        return out;
    }

    let inverse = basis
        .try_inverse()
        .expect("non-singular matrix is invertible");
    centered * inverse.transpose()
}

/// Coefficients of each centered row along the normalized axis.
fn single_axis_coords(centered: &DMatrix<f64>, axis: &DVector<f64>) -> DMatrix<f64> {
    let unit = axis / axis.norm();
    let coords = centered * unit;
    DMatrix::from_column_slice(centered.nrows(), 1, coords.as_slice())
}

/// `(V^T V)^-1 V^T` for V = [v1 | v2]; `None` when the Gram matrix is
/// singular (parallel axes).
fn coefficient_matrix(v1: &DVector<f64>, v2: &DVector<f64>) -> Option<DMatrix<f64>> {
    let d = v1.len();
    let mut v = DMatrix::zeros(d, 2);
    v.set_column(0, v1);
    v.set_column(1, v2);

    let gram = v.transpose() * &v;
    if gram.determinant().abs() < ZERO_EPS {
        return None;
    }
    let gram_inv = gram.try_inverse()?;
    Some(gram_inv * v.transpose())
}

/// The standard basis vector with the smallest component along `v1`.
fn synthesize_second_axis(v1: &DVector<f64>) -> DVector<f64> {
    let least_parallel = (0..v1.len())
        .min_by(|&a, &b| {
            v1[a]
                .abs()
                .partial_cmp(&v1[b].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(0);
    let mut axis = DVector::zeros(v1.len());
    axis[least_parallel] = 1.0;
    axis
}

/// Widen (zero-fill) or narrow a coordinate matrix to `dimensions` columns.
fn pad_columns(coords: DMatrix<f64>, dimensions: usize) -> DMatrix<f64> {
    let n = coords.nrows();
    let have = coords.ncols();
    if have == dimensions {
        return coords;
    }
    let mut out = DMatrix::zeros(n, dimensions);
    let keep = have.min(dimensions);
    out.columns_mut(0, keep).copy_from(&coords.columns(0, keep));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn axis(values: &[f64]) -> DVector<f64> {
        DVector::from_row_slice(values)
    }

    #[test]
    fn test_no_axes_yields_zeros() {
        let data = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let coords = project_2d(&data, &[], 2);
        assert_eq!(coords, DMatrix::zeros(2, 2));
    }

    #[test]
    fn test_zero_norm_axes_are_skipped() {
        let data = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]);
        let coords = project_2d(&data, &[axis(&[0.0, 0.0])], 2);
        assert_eq!(coords, DMatrix::zeros(2, 2));
    }

    #[test]
    fn test_single_axis_projects_distances() {
        // Two points 4 apart along x; axis along x scaled by 2. The single
        // axis path measures distance along the normalized direction.
        let data = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 4.0, 1.0]);
        let coords = project_2d(&data, &[axis(&[2.0, 0.0])], 2);
        assert_relative_eq!(coords[(1, 0)] - coords[(0, 0)], 4.0, epsilon = 1e-12);
        // Second output dimension is zero-filled.
        assert_relative_eq!(coords[(0, 1)], 0.0);
        assert_relative_eq!(coords[(1, 1)], 0.0);
    }

    #[test]
    fn test_two_axes_map_to_orthonormal_basis() {
        // Oblique, non-unit axes. A displacement equal to v1 must land on
        // (1, 0), one equal to v2 on (0, 1).
        let v1 = axis(&[2.0, 0.0, 1.0]);
        let v2 = axis(&[1.0, 3.0, 0.0]);
        let data = DMatrix::from_row_slice(
            3,
            3,
            &[0.0, 0.0, 0.0, 2.0, 0.0, 1.0, 1.0, 3.0, 0.0],
        );
        let coords = project_2d(&data, &[v1, v2], 2);

        let d1 = [coords[(1, 0)] - coords[(0, 0)], coords[(1, 1)] - coords[(0, 1)]];
        let d2 = [coords[(2, 0)] - coords[(0, 0)], coords[(2, 1)] - coords[(0, 1)]];
        assert_relative_eq!(d1[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(d1[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(d2[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(d2[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_parallel_axes_fall_back_to_first() {
        let v1 = axis(&[1.0, 0.0]);
        let v2 = axis(&[2.0, 0.0]);
        let data = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 0.0]);
        let coords = project_2d(&data, &[v1, v2], 2);
        assert_relative_eq!(coords[(1, 0)] - coords[(0, 0)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(coords[(0, 1)], 0.0);
    }

    #[test]
    fn test_full_mode_preserves_remaining_axes() {
        // Axes = first two standard basis vectors: the change of basis is
        // the identity, so full-mode output equals the centered input.
        let v1 = axis(&[1.0, 0.0, 0.0]);
        let v2 = axis(&[0.0, 1.0, 0.0]);
        let data = DMatrix::from_row_slice(
            2,
            3,
            &[1.0, 2.0, 3.0, 3.0, 4.0, 5.0],
        );
        let coords = project_full(&data, &[v1, v2]);
        let (centered, _) = center(&data);
        for i in 0..2 {
            for j in 0..3 {
                assert_relative_eq!(coords[(i, j)], centered[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_full_mode_single_axis_synthesizes_second() {
        let v1 = axis(&[1.0, 0.0, 0.0]);
        let data = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let coords = project_full(&data, &[v1]);
        assert_eq!(coords.ncols(), 3);
        // Displacement along v1 still maps to one unit of the first
        // coordinate.
        assert_relative_eq!(coords[(1, 0)] - coords[(0, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_mode_singular_basis_falls_back() {
        // v2 parallel to v1 makes the basis singular.
        let v1 = axis(&[1.0, 0.0, 0.0]);
        let v2 = axis(&[2.0, 0.0, 0.0]);
        let data = DMatrix::from_row_slice(
            2,
            3,
            &[0.0, 5.0, 7.0, 4.0, 5.0, 9.0],
        );
        let coords = project_full(&data, &[v1, v2]);
        assert_eq!(coords.ncols(), 3);
        // Trailing coordinate keeps the centered third dimension.
        let (centered, _) = center(&data);
        assert_relative_eq!(coords[(0, 2)], centered[(0, 2)], epsilon = 1e-12);
        assert_relative_eq!(coords[(1, 2)], centered[(1, 2)], epsilon = 1e-12);
    }
}
