//! Matrix algorithms behind each transformation kind.
//!
//! Every algorithm maps an N x D row-per-point matrix to an N x D' matrix.
//! Parameter handling follows the graceful-degradation policy: recoverable
//! parameter problems (missing factors, length mismatches, unusable axes)
//! fall back to a defined behavior, while structurally impossible requests
//! (wrong-shaped matrices) are rejected.

use log::warn;
use nalgebra::DMatrix;
use serde_json::json;

use crate::error::{Result, StrataError};
use crate::math::{oblique, pca};
use crate::model::{ParamMap, TransformationKind};
use crate::params;

/// Default factor applied when scaling is requested without parameters.
const DEFAULT_SCALE_FACTOR: f64 = 2.0;

/// Apply a transformation kind to a vector matrix.
///
/// PCA writes its fitted components, explained-variance ratios, and mean
/// back into `parameters` for introspection.
pub fn apply(
    kind: TransformationKind,
    vectors: &DMatrix<f64>,
    parameters: &mut ParamMap,
) -> Result<DMatrix<f64>> {
    match kind {
        TransformationKind::Scaling => apply_scaling(vectors, parameters),
        TransformationKind::Rotation => apply_rotation(vectors, parameters),
        TransformationKind::Affine => apply_affine(vectors, parameters, true),
        TransformationKind::Linear => apply_affine(vectors, parameters, false),
        TransformationKind::Pca => apply_pca(vectors, parameters),
        TransformationKind::CustomAxes2d => {
            let axes = params::axis_directions(parameters);
            Ok(oblique::project_2d(vectors, &axes, 2))
        }
        TransformationKind::CustomAxesFull => {
            let axes = params::axis_directions(parameters);
            Ok(oblique::project_full(vectors, &axes))
        }
    }
}

/// Elementwise multiply by a per-axis factor vector.
///
/// A factor list whose length does not match the dimensionality broadcasts
/// its first element to every axis; this masks configuration mistakes, so it
/// is logged rather than silent.
fn apply_scaling(vectors: &DMatrix<f64>, parameters: &ParamMap) -> Result<DMatrix<f64>> {
    let d = vectors.ncols();
    let factors = match params::f64_list(parameters, "scale_factors") {
        None => vec![DEFAULT_SCALE_FACTOR; d],
        Some(factors) if factors.len() == d => factors,
        Some(factors) => {
            let broadcast = factors.first().copied().unwrap_or(1.0);
            warn!(
                "scale_factors has {} entries but layer has {} dimensions; \
                 broadcasting {} to all axes",
                factors.len(),
                d,
                broadcast
            );
            vec![broadcast; d]
        }
    };

    let mut out = vectors.clone();
    for (j, factor) in factors.iter().enumerate() {
        out.column_mut(j).scale_mut(*factor);
    }
    Ok(out)
}

/// Planar rotation by `angle` radians on the axis pair `dims` (default
/// `[0, 1]`); all other axes untouched. Out-of-range indices are clamped.
fn apply_rotation(vectors: &DMatrix<f64>, parameters: &ParamMap) -> Result<DMatrix<f64>> {
    let d = vectors.ncols();
    if d < 2 {
        return Ok(vectors.clone());
    }

    let angle = params::f64_or(parameters, "angle", 0.0);
    let dims = params::usize_list(parameters, "dims").unwrap_or_else(|| vec![0, 1]);
    let (d1, d2) = match dims.as_slice() {
        [a, b, ..] => ((*a).min(d - 1), (*b).min(d - 1)),
        _ => (0, 1),
    };
    if d1 == d2 {
        return Err(StrataError::invalid_input(
            "rotation needs two distinct axes",
        ));
    }

    let (sin_a, cos_a) = angle.sin_cos();
    let mut out = vectors.clone();
    for i in 0..vectors.nrows() {
        let x = vectors[(i, d1)];
        let y = vectors[(i, d2)];
        out[(i, d1)] = x * cos_a - y * sin_a;
        out[(i, d2)] = x * sin_a + y * cos_a;
    }
    Ok(out)
}

/// Optional matrix multiply (`vectors @ M^T`) followed by an optional
/// translation. `Linear` is the same without the translation.
fn apply_affine(
    vectors: &DMatrix<f64>,
    parameters: &ParamMap,
    allow_translation: bool,
) -> Result<DMatrix<f64>> {
    let mut out = match params::matrix(parameters, "matrix")? {
        Some(matrix) => {
            if matrix.ncols() != vectors.ncols() {
                return Err(StrataError::invalid_input(format!(
                    "matrix has {} columns but layer has {} dimensions",
                    matrix.ncols(),
                    vectors.ncols()
                )));
            }
            vectors * matrix.transpose()
        }
        None => vectors.clone(),
    };

    if allow_translation {
        if let Some(translation) = params::f64_list(parameters, "translation") {
            if translation.len() != out.ncols() {
                return Err(StrataError::invalid_input(format!(
                    "translation has {} entries but output has {} dimensions",
                    translation.len(),
                    out.ncols()
                )));
            }
            for (j, t) in translation.iter().enumerate() {
                out.column_mut(j).add_scalar_mut(*t);
            }
        }
    }
    Ok(out)
}

/// Re-express the layer in its principal components, writing the fit back
/// into the parameter map.
fn apply_pca(vectors: &DMatrix<f64>, parameters: &mut ParamMap) -> Result<DMatrix<f64>> {
    let max_components = vectors.nrows().min(vectors.ncols());
    let n_components = params::usize_or(parameters, "n_components", max_components);
    let center = params::bool_or(parameters, "center", true);
    let whiten = params::bool_or(parameters, "whiten", false);

    let fit = pca::fit(vectors, n_components, center, whiten)?;

    let components: Vec<Vec<f64>> = fit
        .components
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    parameters.insert("components".to_string(), json!(components));
    parameters.insert(
        "explained_variance_ratio".to_string(),
        json!(fit.explained_variance_ratio),
    );
    parameters.insert(
        "mean".to_string(),
        json!(fit.mean.iter().copied().collect::<Vec<f64>>()),
    );

    Ok(fit.scores)
}
