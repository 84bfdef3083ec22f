//! Transform Engine
//!
//! Applies transformations to layers and owns the propagation protocol that
//! keeps the graph consistent when a transformation is edited after the
//! fact: the edited transformation's target layer is replaced, and every
//! transformation and projection downstream of it is re-derived or rebound.
//!
//! Layers are never mutated in place. Re-deriving always produces a new
//! layer object under the old layer's name; point ids carry over so the
//! "same" item is trackable across the whole chain.

pub mod algorithms;

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use nalgebra::DMatrix;

use crate::error::{Result, StrataError};
use crate::model::{
    LayerId, ParamMap, PointData, PointId, ProjectionId, Transformation, TransformationId,
    TransformationKind,
};
use crate::projection::ProjectionEngine;
use crate::store::DataStore;

/// What a propagation pass touched.
///
/// Failed branches are reported rather than rolled back: siblings that were
/// already re-derived stay re-derived, and the failing branch keeps its
/// previous (now stale) target layer.
#[derive(Debug, Default)]
pub struct PropagationReport {
    /// (old layer id, replacement layer id) pairs, in traversal order.
    pub replaced_layers: Vec<(LayerId, LayerId)>,
    /// Transformations whose source was rewired and target re-derived.
    pub reapplied_transformations: Vec<TransformationId>,
    /// Projections rebound to replacement layers (caches dropped).
    pub rebound_projections: Vec<ProjectionId>,
    /// Branches that could not be re-derived, with the reason.
    pub failed_branches: Vec<(TransformationId, String)>,
}

impl PropagationReport {
    pub fn is_clean(&self) -> bool {
        self.failed_branches.is_empty()
    }
}

/// Engine owning all transformations.
#[derive(Debug, Default)]
pub struct TransformEngine {
    transformations: HashMap<TransformationId, Transformation>,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all transformations. Used when activating a snapshot.
    pub fn clear(&mut self) {
        self.transformations.clear();
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Create a transformation and immediately apply it, materializing the
    /// target layer `"{source.name}_{name}"`.
    pub fn create_transformation(
        &mut self,
        store: &mut DataStore,
        name: impl Into<String>,
        kind: TransformationKind,
        source_layer_id: LayerId,
        parameters: ParamMap,
    ) -> Result<Transformation> {
        if store.get_layer(source_layer_id).is_none() {
            return Err(StrataError::LayerNotFound {
                id: source_layer_id,
            });
        }
        if self.ancestry_has_cycle(source_layer_id) {
            return Err(StrataError::invalid_input(
                "source layer is part of a transformation cycle",
            ));
        }

        let mut transformation = Transformation::new(name, kind, source_layer_id, parameters);
        let derived = self.compute(store, &transformation)?;
        self.materialize(store, &mut transformation, derived, None)?;

        self.transformations
            .insert(transformation.id, transformation.clone());
        Ok(transformation)
    }

    /// Insert a fully-formed transformation (snapshot restore path).
    pub fn insert_transformation(&mut self, transformation: Transformation) {
        self.transformations
            .insert(transformation.id, transformation);
    }

    pub fn get_transformation(&self, transformation_id: TransformationId) -> Option<&Transformation> {
        self.transformations.get(&transformation_id)
    }

    pub fn list_transformations(&self) -> Vec<&Transformation> {
        self.transformations.values().collect()
    }

    /// Edit a transformation.
    ///
    /// Renaming alone never recomputes. Changing the kind or the parameters
    /// replaces the target layer (same name, new identity) and propagates
    /// the replacement downstream; the returned report says what moved.
    pub fn update_transformation(
        &mut self,
        store: &mut DataStore,
        projections: &mut ProjectionEngine,
        transformation_id: TransformationId,
        name: Option<String>,
        kind: Option<TransformationKind>,
        parameters: Option<ParamMap>,
    ) -> Result<(Transformation, Option<PropagationReport>)> {
        let current = self.transformations.get(&transformation_id).ok_or(
            StrataError::TransformationNotFound {
                id: transformation_id,
            },
        )?;

        let mut updated = current.clone();
        if let Some(name) = name {
            updated.name = name;
        }

        let recompute = kind.is_some() || parameters.is_some();
        if !recompute {
            self.transformations
                .insert(transformation_id, updated.clone());
            return Ok((updated, None));
        }

        if let Some(kind) = kind {
            updated.kind = kind;
            updated.is_invertible = kind.is_invertible();
        }
        if let Some(parameters) = parameters {
            updated.parameters = parameters;
        }

        // Re-derive the target under its preserved name. The new matrix is
        // computed before anything is committed or deleted, so a failing
        // edit leaves the graph exactly as it was.
        let old_target = updated.target_layer_id;
        let preserved_name = old_target
            .and_then(|id| store.get_layer(id))
            .map(|layer| layer.name.clone());

        let derived = self.compute(store, &updated)?;
        if let Some(old_target) = old_target {
            store.delete_layer(old_target).ok();
        }
        self.materialize(store, &mut updated, derived, preserved_name)?;
        let new_target = updated
            .target_layer_id
            .expect("materialize sets the target layer");
        self.transformations.insert(transformation_id, updated.clone());

        let report = match old_target {
            Some(old_target) => self.propagate(store, projections, old_target, new_target),
            None => PropagationReport::default(),
        };
        Ok((updated, Some(report)))
    }

    /// Delete a transformation, detaching (not deleting) its target layer.
    ///
    /// The target keeps its data and becomes an ordinary root-like layer;
    /// anything derived from it is untouched.
    pub fn delete_transformation(
        &mut self,
        store: &mut DataStore,
        transformation_id: TransformationId,
    ) -> Result<Transformation> {
        let transformation = self.transformations.remove(&transformation_id).ok_or(
            StrataError::TransformationNotFound {
                id: transformation_id,
            },
        )?;
        if let Some(target) = transformation.target_layer_id {
            store.detach_layer(target);
        }
        Ok(transformation)
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Re-derive everything downstream of a layer replacement.
    ///
    /// Explicit worklist, depth-first within a chain so a grandchild is
    /// always recomputed from its parent's fresh vectors, with a visited set
    /// keyed by replaced layer id so even a cyclic (invariant-violating)
    /// graph cannot hang the traversal. Nodes not reachable from the edit
    /// are left untouched.
    pub fn propagate(
        &mut self,
        store: &mut DataStore,
        projections: &mut ProjectionEngine,
        old_layer_id: LayerId,
        new_layer_id: LayerId,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        let mut visited: HashSet<LayerId> = HashSet::new();
        let mut worklist: Vec<(LayerId, LayerId)> = vec![(old_layer_id, new_layer_id)];

        while let Some((old_id, new_id)) = worklist.pop() {
            if !visited.insert(old_id) {
                warn!(
                    "propagation revisited layer {}; the graph has a cycle",
                    old_id
                );
                continue;
            }
            report.replaced_layers.push((old_id, new_id));

            // Views of the replaced layer follow it to the replacement.
            report
                .rebound_projections
                .extend(projections.rebind_layer(old_id, new_id));

            // Every transformation fed by the replaced layer is re-derived
            // from the replacement.
            let dependents: Vec<TransformationId> = self
                .transformations
                .values()
                .filter(|t| t.source_layer_id == old_id)
                .map(|t| t.id)
                .collect();

            for transformation_id in dependents {
                let mut entry = self.transformations[&transformation_id].clone();
                entry.source_layer_id = new_id;

                let old_target = entry.target_layer_id;
                let preserved_name = old_target
                    .and_then(|id| store.get_layer(id))
                    .map(|layer| layer.name.clone());

                match self.compute(store, &entry) {
                    Ok(derived) => {
                        if let Some(old_target) = old_target {
                            store.delete_layer(old_target).ok();
                        }
                        if let Err(err) =
                            self.materialize(store, &mut entry, derived, preserved_name)
                        {
                            warn!(
                                "propagation could not materialize target of {}: {}",
                                transformation_id, err
                            );
                            report
                                .failed_branches
                                .push((transformation_id, err.to_string()));
                            self.transformations.insert(transformation_id, entry);
                            continue;
                        }
                        let new_target = entry
                            .target_layer_id
                            .expect("materialize sets the target layer");
                        debug!(
                            "propagation re-derived {} ({} -> {})",
                            transformation_id,
                            old_target.map(|id| id.to_string()).unwrap_or_default(),
                            new_target
                        );
                        self.transformations.insert(transformation_id, entry);
                        report.reapplied_transformations.push(transformation_id);
                        if let Some(old_target) = old_target {
                            worklist.push((old_target, new_target));
                        }
                    }
                    Err(err) => {
                        // Halt this branch only: the stale target layer and
                        // everything below it stay as they were.
                        warn!(
                            "propagation halted at transformation {}: {}",
                            transformation_id, err
                        );
                        report
                            .failed_branches
                            .push((transformation_id, err.to_string()));
                        self.transformations.insert(transformation_id, entry);
                    }
                }
            }
        }
        report
    }

    /// True if walking the producer chain up from `layer_id` revisits a
    /// layer. A healthy graph always returns false; this guards the
    /// acyclicity invariant instead of trusting callers.
    pub fn ancestry_has_cycle(&self, layer_id: LayerId) -> bool {
        let mut seen = HashSet::new();
        let mut current = layer_id;
        while seen.insert(current) {
            let producer = self
                .transformations
                .values()
                .find(|t| t.target_layer_id == Some(current));
            match producer {
                Some(t) => current = t.source_layer_id,
                None => return false,
            }
        }
        true
    }

    /// True if `descendant` is derived, transitively, from `ancestor`.
    pub fn layer_depends_on(&self, descendant: LayerId, ancestor: LayerId) -> bool {
        let mut seen = HashSet::new();
        let mut current = descendant;
        while seen.insert(current) {
            let producer = self
                .transformations
                .values()
                .find(|t| t.target_layer_id == Some(current));
            match producer {
                Some(t) if t.source_layer_id == ancestor => return true,
                Some(t) => current = t.source_layer_id,
                None => return false,
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Derivation
    // ------------------------------------------------------------------

    /// Run the transformation's algorithm against its source layer.
    ///
    /// Pure with respect to the store: nothing is created or deleted here,
    /// so callers can order deletion of stale layers after the point where
    /// failure is still harmless.
    fn compute(&self, store: &DataStore, transformation: &Transformation) -> Result<DerivedMatrix> {
        let source_layer_id = transformation.source_layer_id;
        if store.get_layer(source_layer_id).is_none() {
            return Err(StrataError::LayerNotFound {
                id: source_layer_id,
            });
        }

        let (vectors, point_ids) = store.vectors_as_matrix(source_layer_id, None);
        if vectors.nrows() == 0 {
            return Err(StrataError::computation(format!(
                "source layer {} has no points to transform",
                source_layer_id
            )));
        }

        let mut parameters = transformation.parameters.clone();
        let matrix = algorithms::apply(transformation.kind, &vectors, &mut parameters)?;
        Ok(DerivedMatrix {
            matrix,
            point_ids,
            parameters,
        })
    }

    /// Materialize a computed matrix as the transformation's target layer:
    /// create the layer, copy point identities with their new vectors, and
    /// copy the source layer's custom axes (directions recomputed from the
    /// transformed endpoints).
    fn materialize(
        &self,
        store: &mut DataStore,
        transformation: &mut Transformation,
        derived: DerivedMatrix,
        preserved_name: Option<String>,
    ) -> Result<()> {
        let source_layer_id = transformation.source_layer_id;
        let source_name = store
            .get_layer(source_layer_id)
            .map(|layer| layer.name.clone())
            .ok_or(StrataError::LayerNotFound {
                id: source_layer_id,
            })?;

        let target_name =
            preserved_name.unwrap_or_else(|| format!("{}_{}", source_name, transformation.name));
        let target = store.create_layer(
            target_name,
            derived.matrix.ncols(),
            Some(format!(
                "Result of {} transformation",
                transformation.kind
            )),
            Some(transformation.id),
        );

        let mut points = Vec::with_capacity(derived.point_ids.len());
        for (i, point_id) in derived.point_ids.iter().enumerate() {
            let source_point = store
                .get_point(source_layer_id, *point_id)
                .ok_or(StrataError::PointNotFound {
                    layer_id: source_layer_id,
                    point_id: *point_id,
                })?;
            let vector: Vec<f64> = derived.matrix.row(i).iter().copied().collect();
            points.push(
                PointData::new(source_point.label.clone(), vector)
                    .with_id(*point_id)
                    .with_metadata(source_point.metadata.clone())
                    .virtual_flag(source_point.is_virtual),
            );
        }
        store.add_points_bulk(target.id, points)?;

        // Axes travel with the data: same endpoints, fresh direction.
        let source_axes: Vec<(String, PointId, PointId)> = store
            .list_custom_axes(source_layer_id)
            .into_iter()
            .map(|axis| (axis.name.clone(), axis.point_a_id, axis.point_b_id))
            .collect();
        for (axis_name, point_a, point_b) in source_axes {
            if let Err(err) = store.create_custom_axis(axis_name, target.id, point_a, point_b) {
                warn!(
                    "could not copy custom axis onto layer {}: {}",
                    target.id, err
                );
            }
        }

        transformation.parameters = derived.parameters;
        transformation.target_layer_id = Some(target.id);
        Ok(())
    }
}

/// Output of [`TransformEngine::compute`]: the transformed matrix with its
/// row-parallel point ids and the (possibly enriched) parameter map.
struct DerivedMatrix {
    matrix: DMatrix<f64>,
    point_ids: Vec<PointId>,
    parameters: ParamMap,
}
