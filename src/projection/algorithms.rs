//! Per-kind projection computations.
//!
//! Everything here is a pure function from a vector matrix (plus parameters
//! and the projection's fixed seed) to a coordinate matrix; caching and
//! point bookkeeping live in the engine.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::error::Result;
use crate::math::oblique;
use crate::model::{ParamMap, ProjectionKind};
use crate::params;

use super::reduce::ReducerRegistry;

/// Half-width of the jitter band used by the statistical chart kinds.
const JITTER_HALF_WIDTH: f64 = 0.1;

/// Compute coordinates for one projection.
pub fn compute(
    kind: ProjectionKind,
    vectors: &DMatrix<f64>,
    dimensions: usize,
    seed: u64,
    parameters: &ParamMap,
    reducers: &ReducerRegistry,
) -> Result<DMatrix<f64>> {
    match kind {
        ProjectionKind::Pca => reducers
            .get("pca")?
            .reduce(vectors, dimensions, seed, parameters),
        ProjectionKind::Tsne => {
            let forwarded = tsne_parameters(parameters, vectors.nrows());
            reducers
                .get("tsne")?
                .reduce(vectors, dimensions, seed, &forwarded)
        }
        ProjectionKind::Umap => {
            let forwarded = umap_parameters(parameters, vectors.nrows());
            reducers
                .get("umap")?
                .reduce(vectors, dimensions, seed, &forwarded)
        }
        ProjectionKind::CustomAxes => {
            let axes = params::axis_directions(parameters);
            Ok(oblique::project_2d(vectors, &axes, dimensions))
        }
        ProjectionKind::Direct => Ok(direct(vectors, dimensions, parameters)),
        ProjectionKind::Density | ProjectionKind::BoxPlot | ProjectionKind::Violin => {
            Ok(value_with_jitter(vectors, parameters, seed))
        }
    }
}

/// t-SNE knobs with defaults; perplexity must stay below the sample count.
fn tsne_parameters(parameters: &ParamMap, n_samples: usize) -> ParamMap {
    let mut forwarded = parameters.clone();
    let perplexity = params::f64_or(parameters, "perplexity", 30.0)
        .min(n_samples.saturating_sub(1) as f64);
    forwarded.insert("perplexity".to_string(), json!(perplexity));
    forwarded
        .entry("learning_rate".to_string())
        .or_insert(json!("auto"));
    forwarded
        .entry("n_iter".to_string())
        .or_insert(json!(1000));
    forwarded
        .entry("early_exaggeration".to_string())
        .or_insert(json!(12.0));
    forwarded
}

/// UMAP knobs with defaults; the neighbor count must stay below the sample
/// count.
fn umap_parameters(parameters: &ParamMap, n_samples: usize) -> ParamMap {
    let mut forwarded = parameters.clone();
    let n_neighbors =
        params::usize_or(parameters, "n_neighbors", 15).min(n_samples.saturating_sub(1));
    forwarded.insert("n_neighbors".to_string(), json!(n_neighbors));
    forwarded
        .entry("min_dist".to_string())
        .or_insert(json!(0.1));
    forwarded
        .entry("metric".to_string())
        .or_insert(json!("euclidean"));
    forwarded.entry("spread".to_string()).or_insert(json!(1.0));
    forwarded
}

/// Use raw dimension values verbatim as coordinates, indices clamped to the
/// valid range.
fn direct(vectors: &DMatrix<f64>, dimensions: usize, parameters: &ParamMap) -> DMatrix<f64> {
    let n = vectors.nrows();
    let d = vectors.ncols();
    let clamp = |index: usize| index.min(d.saturating_sub(1));

    let dim_x = clamp(params::usize_or(parameters, "dim_x", 0));
    let dim_y = clamp(params::usize_or(parameters, "dim_y", 1));

    let mut picked = vec![dim_x, dim_y];
    if dimensions >= 3 {
        picked.push(clamp(params::usize_or(parameters, "dim_z", 2)));
    }

    let mut out = DMatrix::zeros(n, picked.len());
    for (j, &source) in picked.iter().enumerate() {
        out.set_column(j, &vectors.column(source));
    }
    out
}

/// One dimension's raw values on the first axis, uniform jitter on the
/// second; enough for the client to render strip/density/box/violin charts.
///
/// The jitter comes from the projection's own seeded RNG so recomputation is
/// reproducible.
fn value_with_jitter(vectors: &DMatrix<f64>, parameters: &ParamMap, seed: u64) -> DMatrix<f64> {
    let n = vectors.nrows();
    let d = vectors.ncols();
    let dim = params::usize_or(parameters, "dim", 0).min(d.saturating_sub(1));

    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = DMatrix::zeros(n, 2);
    for i in 0..n {
        out[(i, 0)] = vectors[(i, dim)];
        out[(i, 1)] = rng.gen_range(-JITTER_HALF_WIDTH..JITTER_HALF_WIDTH);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrataError;
    use test_case::test_case;

    fn data() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 4, &[
            1.0, 2.0, 3.0, 4.0, //
            5.0, 6.0, 7.0, 8.0, //
            9.0, 10.0, 11.0, 12.0,
        ])
    }

    #[test]
    fn test_direct_picks_columns() {
        let p = serde_json::json!({"dim_x": 2, "dim_y": 0})
            .as_object()
            .unwrap()
            .clone();
        let out = compute(
            ProjectionKind::Direct,
            &data(),
            2,
            0,
            &p,
            &ReducerRegistry::with_defaults(),
        )
        .unwrap();
        assert_eq!(out[(0, 0)], 3.0);
        assert_eq!(out[(0, 1)], 1.0);
    }

    #[test]
    fn test_direct_clamps_indices_and_supports_3d() {
        let p = serde_json::json!({"dim_x": 99, "dim_y": 1, "dim_z": 50})
            .as_object()
            .unwrap()
            .clone();
        let out = compute(
            ProjectionKind::Direct,
            &data(),
            3,
            0,
            &p,
            &ReducerRegistry::with_defaults(),
        )
        .unwrap();
        assert_eq!(out.ncols(), 3);
        // dim_x and dim_z clamp to the last dimension.
        assert_eq!(out[(0, 0)], 4.0);
        assert_eq!(out[(0, 2)], 4.0);
    }

    #[test_case(ProjectionKind::Density; "density")]
    #[test_case(ProjectionKind::BoxPlot; "boxplot")]
    #[test_case(ProjectionKind::Violin; "violin")]
    fn test_chart_kinds_emit_value_and_jitter(kind: ProjectionKind) {
        let p = serde_json::json!({"dim": 1}).as_object().unwrap().clone();
        let out = compute(kind, &data(), 2, 7, &p, &ReducerRegistry::with_defaults()).unwrap();
        assert_eq!(out.ncols(), 2);
        for i in 0..3 {
            assert_eq!(out[(i, 0)], data()[(i, 1)]);
            assert!(out[(i, 1)].abs() < JITTER_HALF_WIDTH);
        }
    }

    #[test]
    fn test_jitter_is_seed_stable() {
        let p = ParamMap::new();
        let registry = ReducerRegistry::with_defaults();
        let a = compute(ProjectionKind::Density, &data(), 2, 42, &p, &registry).unwrap();
        let b = compute(ProjectionKind::Density, &data(), 2, 42, &p, &registry).unwrap();
        assert_eq!(a, b);
        let c = compute(ProjectionKind::Density, &data(), 2, 43, &p, &registry).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_tsne_without_reducer_is_a_computation_error() {
        let err = compute(
            ProjectionKind::Tsne,
            &data(),
            2,
            0,
            &ParamMap::new(),
            &ReducerRegistry::with_defaults(),
        )
        .unwrap_err();
        assert!(matches!(err, StrataError::ReducerMissing { .. }));
        assert!(err.is_computation());
    }

    #[test]
    fn test_tsne_parameters_clamp_perplexity() {
        let p = serde_json::json!({"perplexity": 30.0})
            .as_object()
            .unwrap()
            .clone();
        let forwarded = tsne_parameters(&p, 10);
        assert_eq!(forwarded.get("perplexity").unwrap().as_f64().unwrap(), 9.0);
        assert_eq!(
            forwarded.get("learning_rate").unwrap().as_str().unwrap(),
            "auto"
        );
    }

    #[test]
    fn test_umap_parameters_clamp_neighbors() {
        let forwarded = umap_parameters(&ParamMap::new(), 10);
        assert_eq!(forwarded.get("n_neighbors").unwrap().as_u64().unwrap(), 9);
        assert_eq!(
            forwarded.get("metric").unwrap().as_str().unwrap(),
            "euclidean"
        );
    }

    #[test]
    fn test_custom_axes_projection_width() {
        let p = serde_json::json!({
            "axes": [{"type": "direction", "vector": [1.0, 0.0, 0.0, 0.0]}]
        })
        .as_object()
        .unwrap()
        .clone();
        let out = compute(
            ProjectionKind::CustomAxes,
            &data(),
            2,
            0,
            &p,
            &ReducerRegistry::with_defaults(),
        )
        .unwrap();
        assert_eq!(out.shape(), (3, 2));
    }
}
