//! Projection Engine
//!
//! Computes and caches low-dimensional views of any layer. Projections are
//! lazy: coordinates exist only once read (or when eagerly requested), and
//! every cache entry is consistent with the projection's current parameters
//! and layer reference. Parameter edits and upstream layer replacement both
//! drop the cache; a failed computation just leaves the projection
//! uncomputed.

pub mod algorithms;
pub mod reduce;

use std::collections::HashMap;

use log::{debug, warn};
use rand::Rng;
use serde_json::Value;

use crate::error::{Result, StrataError};
use crate::model::{LayerId, ParamMap, ProjectedPoint, Projection, ProjectionId, ProjectionKind};
use crate::store::DataStore;

pub use reduce::{PcaReducer, Reducer, ReducerRegistry};

/// Upper bound (exclusive) for auto-assigned random seeds.
const SEED_RANGE: u64 = 10_000;

/// Engine owning all projections and their coordinate caches.
pub struct ProjectionEngine {
    projections: HashMap<ProjectionId, Projection>,
    cache: HashMap<ProjectionId, Vec<ProjectedPoint>>,
    reducers: ReducerRegistry,
}

impl ProjectionEngine {
    /// Engine with the default reducer registry (native PCA).
    pub fn new() -> Self {
        Self::with_registry(ReducerRegistry::with_defaults())
    }

    /// Engine with a caller-assembled reducer registry.
    pub fn with_registry(reducers: ReducerRegistry) -> Self {
        Self {
            projections: HashMap::new(),
            cache: HashMap::new(),
            reducers,
        }
    }

    /// Install an external reducer (t-SNE, UMAP, ...).
    pub fn register_reducer(&mut self, reducer: Box<dyn Reducer>) {
        self.reducers.register(reducer);
    }

    /// Remove all projections and caches. Used when activating a snapshot.
    pub fn clear(&mut self) {
        self.projections.clear();
        self.cache.clear();
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Create a projection over a layer.
    ///
    /// The random seed comes from `parameters["random_seed"]` when present,
    /// otherwise it is drawn once and fixed so stochastic algorithms stay
    /// reproducible. Computation happens now only when `eager` is set; a
    /// failed eager computation is logged, not fatal.
    pub fn create_projection(
        &mut self,
        store: &DataStore,
        name: impl Into<String>,
        kind: ProjectionKind,
        layer_id: LayerId,
        dimensions: usize,
        parameters: ParamMap,
        eager: bool,
    ) -> Result<Projection> {
        if store.get_layer(layer_id).is_none() {
            return Err(StrataError::LayerNotFound { id: layer_id });
        }

        let random_seed = parameters
            .get("random_seed")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..SEED_RANGE));

        let projection = Projection::new(name, kind, layer_id, dimensions, parameters, random_seed);
        let id = projection.id;
        self.projections.insert(id, projection.clone());

        if eager {
            if let Err(err) = self.ensure_computed(store, id) {
                debug!("eager computation of projection {} failed: {}", id, err);
            }
        }
        Ok(projection)
    }

    /// Insert a fully-formed projection (snapshot restore path). The cache
    /// starts cold.
    pub fn insert_projection(&mut self, projection: Projection) {
        self.projections.insert(projection.id, projection);
    }

    pub fn get_projection(&self, projection_id: ProjectionId) -> Option<&Projection> {
        self.projections.get(&projection_id)
    }

    pub fn list_projections(&self) -> Vec<&Projection> {
        self.projections.values().collect()
    }

    /// Rename a projection or replace its parameters. New parameters drop
    /// the cached coordinates; the seed fixed at creation is kept.
    pub fn update_projection(
        &mut self,
        projection_id: ProjectionId,
        name: Option<String>,
        parameters: Option<ParamMap>,
    ) -> Result<Projection> {
        let projection = self
            .projections
            .get_mut(&projection_id)
            .ok_or(StrataError::ProjectionNotFound { id: projection_id })?;

        if let Some(name) = name {
            projection.name = name;
        }
        if let Some(parameters) = parameters {
            projection.parameters = parameters;
            self.cache.remove(&projection_id);
        }
        Ok(self.projections[&projection_id].clone())
    }

    /// Delete a projection together with its cache entry.
    pub fn delete_projection(&mut self, projection_id: ProjectionId) -> Result<()> {
        self.projections
            .remove(&projection_id)
            .ok_or(StrataError::ProjectionNotFound { id: projection_id })?;
        self.cache.remove(&projection_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cache lifecycle
    // ------------------------------------------------------------------

    /// Whether coordinates are currently cached.
    pub fn is_computed(&self, projection_id: ProjectionId) -> bool {
        self.cache.contains_key(&projection_id)
    }

    /// Drop one cached result, or all of them.
    pub fn invalidate_cache(&mut self, projection_id: Option<ProjectionId>) {
        match projection_id {
            Some(id) => {
                self.cache.remove(&id);
            }
            None => self.cache.clear(),
        }
    }

    /// Rewrite every projection pointing at `old_layer_id` to point at
    /// `new_layer_id` and drop their caches. Invoked only by the transform
    /// engine's propagation; returns the rebound projection ids.
    pub fn rebind_layer(&mut self, old_layer_id: LayerId, new_layer_id: LayerId) -> Vec<ProjectionId> {
        let mut rebound = Vec::new();
        for projection in self.projections.values_mut() {
            if projection.layer_id == old_layer_id {
                projection.layer_id = new_layer_id;
                rebound.push(projection.id);
            }
        }
        for id in &rebound {
            self.cache.remove(id);
        }
        rebound
    }

    /// Compute coordinates if they are not cached yet.
    ///
    /// At most one computation ever runs per cache fill: the cache check and
    /// the insert happen under the same `&mut self` borrow.
    pub fn ensure_computed(&mut self, store: &DataStore, projection_id: ProjectionId) -> Result<()> {
        if self.cache.contains_key(&projection_id) {
            return Ok(());
        }
        let projection = self
            .projections
            .get(&projection_id)
            .ok_or(StrataError::ProjectionNotFound { id: projection_id })?;

        debug!(
            "computing {} projection '{}' on layer {}",
            projection.kind, projection.name, projection.layer_id
        );
        let results = compute_points(store, projection, &self.reducers)?;
        self.cache.insert(projection_id, results);
        Ok(())
    }

    /// Cached coordinates, computing them first if needed.
    ///
    /// Errors surface the reason a projection could not be computed; the
    /// projection itself stays valid and uncomputed.
    pub fn try_coordinates(
        &mut self,
        store: &DataStore,
        projection_id: ProjectionId,
    ) -> Result<&[ProjectedPoint]> {
        self.ensure_computed(store, projection_id)?;
        Ok(self
            .cache
            .get(&projection_id)
            .expect("ensure_computed fills the cache on success"))
    }

    /// Convenience form of [`try_coordinates`](Self::try_coordinates)
    /// returning `None` when computation (still) fails.
    pub fn coordinates(
        &mut self,
        store: &DataStore,
        projection_id: ProjectionId,
    ) -> Option<&[ProjectedPoint]> {
        match self.try_coordinates(store, projection_id) {
            Ok(points) => Some(points),
            Err(err) => {
                warn!("projection {} not computed: {}", projection_id, err);
                None
            }
        }
    }
}

impl Default for ProjectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the projection's algorithm and attach point identities to the rows.
fn compute_points(
    store: &DataStore,
    projection: &Projection,
    reducers: &ReducerRegistry,
) -> Result<Vec<ProjectedPoint>> {
    let (vectors, point_ids) = store.vectors_as_matrix(projection.layer_id, None);
    if vectors.nrows() == 0 {
        return Err(StrataError::computation(format!(
            "layer {} has no points to project",
            projection.layer_id
        )));
    }

    let coords = algorithms::compute(
        projection.kind,
        &vectors,
        projection.dimensions,
        projection.random_seed,
        &projection.parameters,
        reducers,
    )?;

    let mut results = Vec::with_capacity(point_ids.len());
    for (i, point_id) in point_ids.iter().enumerate() {
        let source = store
            .get_point(projection.layer_id, *point_id)
            .ok_or(StrataError::PointNotFound {
                layer_id: projection.layer_id,
                point_id: *point_id,
            })?;
        results.push(ProjectedPoint {
            id: *point_id,
            label: source.label.clone(),
            metadata: source.metadata.clone(),
            coordinates: coords.row(i).iter().copied().collect(),
            is_virtual: source.is_virtual,
        });
    }
    Ok(results)
}
