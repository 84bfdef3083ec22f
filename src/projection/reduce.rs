//! Pluggable dimensionality-reduction boundary.
//!
//! PCA is implemented natively; t-SNE and UMAP are external collaborators
//! that embedders plug in through the registry. A projection whose reducer
//! is missing simply stays uncomputed; nothing in the graph is touched.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::error::{Result, StrataError};
use crate::math::pca;
use crate::model::ParamMap;
use crate::params;

/// A dimensionality-reduction algorithm: N x D in, N x dims out.
pub trait Reducer: Send + Sync {
    /// Registry key, e.g. `"pca"`, `"tsne"`, `"umap"`.
    fn name(&self) -> &'static str;

    /// Reduce `vectors` to `dims` output dimensions.
    ///
    /// `seed` drives any stochastic behavior; deterministic algorithms may
    /// ignore it. Implementations must not hold state across calls.
    fn reduce(
        &self,
        vectors: &DMatrix<f64>,
        dims: usize,
        seed: u64,
        parameters: &ParamMap,
    ) -> Result<DMatrix<f64>>;
}

/// Reducers available to the projection engine, keyed by algorithm name.
pub struct ReducerRegistry {
    reducers: HashMap<&'static str, Box<dyn Reducer>>,
}

impl ReducerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            reducers: HashMap::new(),
        }
    }

    /// The default registry: native PCA only.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PcaReducer));
        registry
    }

    /// Install (or replace) a reducer under its own name.
    pub fn register(&mut self, reducer: Box<dyn Reducer>) {
        self.reducers.insert(reducer.name(), reducer);
    }

    /// Look up a reducer, erroring with [`StrataError::ReducerMissing`].
    pub fn get(&self, name: &str) -> Result<&dyn Reducer> {
        self.reducers
            .get(name)
            .map(|r| r.as_ref())
            .ok_or_else(|| StrataError::ReducerMissing {
                algorithm: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Native PCA reducer with explicit component-index selection.
///
/// `parameters["components"]` may list 0-indexed component indices (e.g.
/// `[2, 3]` for PC3/PC4); enough components are fitted to cover the highest
/// requested index, and missing slots are padded with the remaining top
/// components.
pub struct PcaReducer;

impl Reducer for PcaReducer {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn reduce(
        &self,
        vectors: &DMatrix<f64>,
        dims: usize,
        _seed: u64,
        parameters: &ParamMap,
    ) -> Result<DMatrix<f64>> {
        let n = vectors.nrows();
        let d = vectors.ncols();

        let requested = params::usize_list(parameters, "components").filter(|c| !c.is_empty());
        let (n_components, mut indices) = match requested {
            Some(indices) => {
                let max_component = indices.iter().max().copied().unwrap_or(0) + 1;
                (max_component.min(d).min(n), indices)
            }
            None => {
                let k = dims.min(d).min(n);
                (k, (0..k).collect())
            }
        };

        let fit = pca::fit(vectors, n_components, true, false)?;
        let available = fit.scores.ncols();

        // Keep requested indices that exist, then pad with the remaining
        // top components until `dims` columns are selected.
        indices.retain(|&i| i < available);
        if indices.len() < dims {
            for i in 0..available {
                if !indices.contains(&i) {
                    indices.push(i);
                }
                if indices.len() >= dims {
                    break;
                }
            }
        }
        indices.truncate(dims);

        let mut out = DMatrix::zeros(n, indices.len());
        for (j, &component) in indices.iter().enumerate() {
            out.set_column(j, &fit.scores.column(component));
        }
        Ok(out)
    }
}
