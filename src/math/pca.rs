//! Principal component analysis over dense row-per-point matrices.
//!
//! Fit goes through a thin SVD of the (optionally centered) data, which is
//! numerically stabler than an eigendecomposition of the covariance matrix
//! for ill-conditioned inputs.

use nalgebra::{DMatrix, RowDVector};

use crate::error::{Result, StrataError};
use crate::math::ZERO_EPS;

/// Result of fitting a PCA model.
#[derive(Debug, Clone)]
pub struct PcaFit {
    /// One row per principal component (k x D).
    pub components: DMatrix<f64>,
    /// Fraction of total variance captured by each kept component.
    pub explained_variance_ratio: Vec<f64>,
    /// Column-wise mean removed before fitting (zeros when uncentered).
    pub mean: RowDVector<f64>,
    /// Transformed coordinates of the input rows (N x k).
    pub scores: DMatrix<f64>,
}

/// Fit PCA and project the input onto the top `n_components` components.
///
/// `n_components` is clamped to `min(rows, cols)`. With `whiten`, scores are
/// rescaled to unit variance per component.
pub fn fit(
    vectors: &DMatrix<f64>,
    n_components: usize,
    center: bool,
    whiten: bool,
) -> Result<PcaFit> {
    let n = vectors.nrows();
    let d = vectors.ncols();
    if n == 0 || d == 0 {
        return Err(StrataError::computation("cannot fit PCA on empty matrix"));
    }
    let k = n_components.min(n).min(d).max(1);

    let (data, mean) = if center {
        crate::math::center(vectors)
    } else {
        (vectors.clone(), RowDVector::zeros(d))
    };

    let svd = data.svd(true, true);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| StrataError::computation("SVD did not produce U"))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| StrataError::computation("SVD did not produce V^T"))?;
    let singular = &svd.singular_values;

    let components = v_t.rows(0, k).into_owned();

    let total_variance: f64 = singular.iter().map(|s| s * s).sum();
    let explained_variance_ratio: Vec<f64> = (0..k)
        .map(|i| {
            if total_variance > ZERO_EPS {
                singular[i] * singular[i] / total_variance
            } else {
                0.0
            }
        })
        .collect();

    let scores = if whiten {
        // Unit-variance scores: U scaled by sqrt(n - 1).
        let scale = ((n.max(2) - 1) as f64).sqrt();
        u.columns(0, k).into_owned() * scale
    } else {
        let mut scores = u.columns(0, k).into_owned();
        for (j, mut col) in scores.column_iter_mut().enumerate() {
            col *= singular[j];
        }
        scores
    };

    Ok(PcaFit {
        components,
        explained_variance_ratio,
        mean,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Points spread along the x axis with slight y noise: PC1 must align
    /// with x and dominate the variance.
    #[test]
    fn test_pca_finds_dominant_axis() {
        let data = DMatrix::from_row_slice(
            4,
            2,
            &[-3.0, 0.1, -1.0, -0.1, 1.0, 0.1, 3.0, -0.1],
        );
        let fit = fit(&data, 2, true, false).unwrap();

        assert_eq!(fit.components.nrows(), 2);
        // PC1 is (±1, ~0).
        assert_relative_eq!(fit.components[(0, 0)].abs(), 1.0, epsilon = 1e-3);
        assert!(fit.explained_variance_ratio[0] > 0.99);

        let ratio_sum: f64 = fit.explained_variance_ratio.iter().sum();
        assert!(ratio_sum <= 1.0 + 1e-12);
    }

    #[test]
    fn test_pca_scores_reproduce_projection() {
        let data = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0]);
        let fit = fit(&data, 2, true, false).unwrap();
        // Scores must equal centered data times component directions.
        let (centered, _) = crate::math::center(&data);
        let expected = centered * fit.components.transpose();
        for i in 0..3 {
            for j in 0..2 {
                assert_relative_eq!(fit.scores[(i, j)], expected[(i, j)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_pca_clamps_component_count() {
        let data = DMatrix::from_row_slice(2, 5, &[1.0; 10]);
        let fit = fit(&data, 10, true, false).unwrap();
        assert_eq!(fit.components.nrows(), 2);
        assert_eq!(fit.scores.ncols(), 2);
    }

    #[test]
    fn test_pca_rejects_empty_input() {
        let data = DMatrix::<f64>::zeros(0, 3);
        assert!(fit(&data, 2, true, false).is_err());
    }

    #[test]
    fn test_pca_constant_data_has_zero_ratios() {
        let data = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let fit = fit(&data, 2, true, false).unwrap();
        for ratio in &fit.explained_variance_ratio {
            assert_relative_eq!(*ratio, 0.0);
        }
    }
}
