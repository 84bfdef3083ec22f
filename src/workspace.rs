//! Workspace: the single owner of all graph state.
//!
//! One `Workspace` is constructed explicitly at process start and threaded
//! through every operation; there are no global singletons and no hidden
//! initialization. Because every mutating operation needs `&mut Workspace`,
//! the borrow checker is the serialization boundary: lazy projection
//! computation is at-most-once per cache fill, and a propagation pass runs
//! to completion before any other mutation can observe the graph.

use crate::error::Result;
use crate::model::{
    LayerId, ParamMap, ProjectedPoint, Projection, ProjectionId, ProjectionKind, Transformation,
    TransformationId, TransformationKind,
};
use crate::projection::{ProjectionEngine, Reducer, ReducerRegistry};
use crate::snapshot::Snapshot;
use crate::store::DataStore;
use crate::transform::{PropagationReport, TransformEngine};

/// Owns the entity store, the transform engine, and the projection engine.
pub struct Workspace {
    store: DataStore,
    transforms: TransformEngine,
    projections: ProjectionEngine,
}

impl Workspace {
    /// A workspace with the default reducer registry (native PCA).
    pub fn new() -> Self {
        Self {
            store: DataStore::new(),
            transforms: TransformEngine::new(),
            projections: ProjectionEngine::new(),
        }
    }

    /// A workspace with a caller-assembled reducer registry (t-SNE/UMAP
    /// implementations plug in here).
    pub fn with_reducers(reducers: ReducerRegistry) -> Self {
        Self {
            store: DataStore::new(),
            transforms: TransformEngine::new(),
            projections: ProjectionEngine::with_registry(reducers),
        }
    }

    /// Install an external reducer after construction.
    pub fn register_reducer(&mut self, reducer: Box<dyn Reducer>) {
        self.projections.register_reducer(reducer);
    }

    /// Drop every layer, point, selection, axis, transformation, and
    /// projection. Explicit teardown; also the first step of a restore.
    pub fn clear(&mut self) {
        self.store.clear();
        self.transforms.clear();
        self.projections.clear();
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    /// The entity store (layers, points, selections, axes).
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Mutable entity store access for plain CRUD; graph-aware operations
    /// live on the workspace itself.
    pub fn store_mut(&mut self) -> &mut DataStore {
        &mut self.store
    }

    pub fn transforms(&self) -> &TransformEngine {
        &self.transforms
    }

    pub fn projections(&self) -> &ProjectionEngine {
        &self.projections
    }

    // ------------------------------------------------------------------
    // Transformations
    // ------------------------------------------------------------------

    /// Create and apply a transformation (see
    /// [`TransformEngine::create_transformation`]).
    pub fn create_transformation(
        &mut self,
        name: impl Into<String>,
        kind: TransformationKind,
        source_layer_id: LayerId,
        parameters: ParamMap,
    ) -> Result<Transformation> {
        self.transforms
            .create_transformation(&mut self.store, name, kind, source_layer_id, parameters)
    }

    /// Edit a transformation; kind/parameter changes replace the target
    /// layer and propagate downstream (see
    /// [`TransformEngine::update_transformation`]).
    pub fn update_transformation(
        &mut self,
        transformation_id: TransformationId,
        name: Option<String>,
        kind: Option<TransformationKind>,
        parameters: Option<ParamMap>,
    ) -> Result<(Transformation, Option<PropagationReport>)> {
        self.transforms.update_transformation(
            &mut self.store,
            &mut self.projections,
            transformation_id,
            name,
            kind,
            parameters,
        )
    }

    /// Delete a transformation, detaching its target layer.
    pub fn delete_transformation(
        &mut self,
        transformation_id: TransformationId,
    ) -> Result<Transformation> {
        self.transforms
            .delete_transformation(&mut self.store, transformation_id)
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Create a projection over a layer (see
    /// [`ProjectionEngine::create_projection`]).
    pub fn create_projection(
        &mut self,
        name: impl Into<String>,
        kind: ProjectionKind,
        layer_id: LayerId,
        dimensions: usize,
        parameters: ParamMap,
        eager: bool,
    ) -> Result<Projection> {
        self.projections.create_projection(
            &self.store,
            name,
            kind,
            layer_id,
            dimensions,
            parameters,
            eager,
        )
    }

    /// Lazily computed coordinates; `None` while computation keeps failing.
    pub fn projection_coordinates(
        &mut self,
        projection_id: ProjectionId,
    ) -> Option<&[ProjectedPoint]> {
        self.projections.coordinates(&self.store, projection_id)
    }

    /// Like [`projection_coordinates`](Self::projection_coordinates) but
    /// surfacing the failure reason.
    pub fn try_projection_coordinates(
        &mut self,
        projection_id: ProjectionId,
    ) -> Result<&[ProjectedPoint]> {
        self.projections.try_coordinates(&self.store, projection_id)
    }

    /// Rename a projection or replace its parameters (parameter changes
    /// drop the cache).
    pub fn update_projection(
        &mut self,
        projection_id: ProjectionId,
        name: Option<String>,
        parameters: Option<ParamMap>,
    ) -> Result<Projection> {
        self.projections
            .update_projection(projection_id, name, parameters)
    }

    pub fn delete_projection(&mut self, projection_id: ProjectionId) -> Result<()> {
        self.projections.delete_projection(projection_id)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture the whole graph as a serializable snapshot.
    pub fn snapshot(&self, name: impl Into<String>, description: impl Into<String>) -> Snapshot {
        Snapshot::capture(self, name, description)
    }

    /// Replace all state with a snapshot's content.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        snapshot.restore_into(self)
    }

    pub(crate) fn components_mut(
        &mut self,
    ) -> (&mut DataStore, &mut TransformEngine, &mut ProjectionEngine) {
        (
            &mut self.store,
            &mut self.transforms,
            &mut self.projections,
        )
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
