//! Entity Store
//!
//! In-memory ground truth for layers, points, selections, and custom axes.
//! Pure state: nothing in this module triggers recomputation, and it knows
//! nothing about transformations or projections beyond the opaque
//! `source_transformation_id` it carries on derived layers.

use std::collections::HashMap;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde_json::json;

use crate::error::{Result, StrataError};
use crate::model::{
    AxisId, CustomAxis, Layer, LayerId, Point, PointData, PointId, Selection, SelectionId,
    TransformationId,
};

/// Seed for synthetic dataset generation, fixed for reproducible fixtures.
const SYNTHETIC_SEED: u64 = 42;

/// Points of one layer, insertion-ordered with an id index.
///
/// Insertion order is what makes matrix extraction deterministic; a bare
/// id-keyed map would shuffle row order between runs.
#[derive(Debug, Default)]
struct PointSet {
    points: Vec<Point>,
    index: HashMap<PointId, usize>,
}

impl PointSet {
    fn get(&self, id: &PointId) -> Option<&Point> {
        self.index.get(id).map(|&i| &self.points[i])
    }

    fn contains(&self, id: &PointId) -> bool {
        self.index.contains_key(id)
    }

    fn push(&mut self, point: Point) {
        self.index.insert(point.id, self.points.len());
        self.points.push(point);
    }
}

/// In-memory store for layers, points, selections, and custom axes.
#[derive(Debug, Default)]
pub struct DataStore {
    layers: HashMap<LayerId, Layer>,
    layer_order: Vec<LayerId>,
    points: HashMap<LayerId, PointSet>,
    selections: HashMap<SelectionId, Selection>,
    axes: HashMap<AxisId, CustomAxis>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all state. Used when activating a snapshot.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.layer_order.clear();
        self.points.clear();
        self.selections.clear();
        self.axes.clear();
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Create a new empty layer and return a copy of it.
    pub fn create_layer(
        &mut self,
        name: impl Into<String>,
        dimensionality: usize,
        description: Option<String>,
        source_transformation_id: Option<TransformationId>,
    ) -> Layer {
        let layer = Layer::new(name, dimensionality, description, source_transformation_id);
        self.insert_layer(layer.clone());
        layer
    }

    /// Insert a fully-formed layer (snapshot restore path). The point count
    /// is reset and re-established as points are admitted.
    pub fn insert_layer(&mut self, mut layer: Layer) {
        layer.point_count = self.points.get(&layer.id).map_or(0, |s| s.points.len());
        self.layer_order.push(layer.id);
        self.points.entry(layer.id).or_default();
        self.layers.insert(layer.id, layer);
    }

    pub fn get_layer(&self, layer_id: LayerId) -> Option<&Layer> {
        self.layers.get(&layer_id)
    }

    /// All layers in creation order.
    pub fn list_layers(&self) -> Vec<&Layer> {
        self.layer_order
            .iter()
            .filter_map(|id| self.layers.get(id))
            .collect()
    }

    /// Rename a layer or replace its description. Never touches points.
    pub fn update_layer(
        &mut self,
        layer_id: LayerId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<&Layer> {
        let layer = self
            .layers
            .get_mut(&layer_id)
            .ok_or(StrataError::LayerNotFound { id: layer_id })?;
        if let Some(name) = name {
            layer.name = name;
        }
        if let Some(description) = description {
            layer.description = Some(description);
        }
        Ok(layer)
    }

    /// Forget a layer's producing transformation, turning it into an
    /// ordinary root-like layer. Used when a transformation is deleted
    /// without deleting its output data.
    pub fn detach_layer(&mut self, layer_id: LayerId) {
        if let Some(layer) = self.layers.get_mut(&layer_id) {
            layer.source_transformation_id = None;
        }
    }

    /// Delete a layer together with its points and its custom axes.
    ///
    /// Selections referencing the layer are left alone: they are independent
    /// of the computation graph and their point ids stay meaningful on
    /// replacement layers.
    pub fn delete_layer(&mut self, layer_id: LayerId) -> Result<Layer> {
        let layer = self
            .layers
            .remove(&layer_id)
            .ok_or(StrataError::LayerNotFound { id: layer_id })?;
        self.layer_order.retain(|id| *id != layer_id);
        self.points.remove(&layer_id);
        self.axes.retain(|_, axis| axis.layer_id != layer_id);
        Ok(layer)
    }

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    /// Add a single point to a layer.
    pub fn add_point(&mut self, layer_id: LayerId, point: PointData) -> Result<Point> {
        let mut admitted = self.add_points_bulk(layer_id, vec![point])?;
        Ok(admitted.pop().expect("bulk add of one point admits one point"))
    }

    /// Add a batch of points atomically: either every point is admitted and
    /// the layer's point count grows by the batch size, or none are.
    ///
    /// Rejected batches: unknown layer, a vector whose length differs from
    /// the layer dimensionality, or a duplicate point id (within the batch
    /// or against points already stored).
    pub fn add_points_bulk(
        &mut self,
        layer_id: LayerId,
        points: Vec<PointData>,
    ) -> Result<Vec<Point>> {
        let dimensionality = self
            .layers
            .get(&layer_id)
            .ok_or(StrataError::LayerNotFound { id: layer_id })?
            .dimensionality;

        let mut admitted: Vec<Point> = Vec::with_capacity(points.len());
        {
            let set = self.points.entry(layer_id).or_default();
            for data in points {
                let point = data.into_point();
                if point.vector.len() != dimensionality {
                    return Err(StrataError::invalid_input(format!(
                        "point {} has {} coordinates, layer expects {}",
                        point.id,
                        point.vector.len(),
                        dimensionality
                    )));
                }
                if set.contains(&point.id) || admitted.iter().any(|p| p.id == point.id) {
                    return Err(StrataError::invalid_input(format!(
                        "duplicate point id {} in layer {}",
                        point.id, layer_id
                    )));
                }
                admitted.push(point);
            }
            for point in &admitted {
                set.push(point.clone());
            }
        }

        let layer = self.layers.get_mut(&layer_id).expect("layer checked above");
        layer.point_count += admitted.len();
        Ok(admitted)
    }

    /// Get points from a layer, optionally filtered by an id set.
    ///
    /// With a filter, points come back in the requested order and unknown
    /// ids are skipped. Unknown layers yield an empty list.
    pub fn get_points(&self, layer_id: LayerId, point_ids: Option<&[PointId]>) -> Vec<&Point> {
        let Some(set) = self.points.get(&layer_id) else {
            return Vec::new();
        };
        match point_ids {
            None => set.points.iter().collect(),
            Some(ids) => ids.iter().filter_map(|id| set.get(id)).collect(),
        }
    }

    pub fn get_point(&self, layer_id: LayerId, point_id: PointId) -> Option<&Point> {
        self.points.get(&layer_id)?.get(&point_id)
    }

    /// Extract a layer's vectors as a dense row-per-point matrix plus the
    /// parallel list of point ids. Zero points yield a 0-row matrix.
    pub fn vectors_as_matrix(
        &self,
        layer_id: LayerId,
        point_ids: Option<&[PointId]>,
    ) -> (DMatrix<f64>, Vec<PointId>) {
        let dimensionality = self
            .layers
            .get(&layer_id)
            .map_or(0, |layer| layer.dimensionality);
        let points = self.get_points(layer_id, point_ids);
        if points.is_empty() {
            return (DMatrix::zeros(0, dimensionality), Vec::new());
        }

        let ids = points.iter().map(|p| p.id).collect();
        let matrix = DMatrix::from_row_iterator(
            points.len(),
            dimensionality,
            points.iter().flat_map(|p| p.vector.iter().copied()),
        );
        (matrix, ids)
    }

    // ------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------

    /// Create a named selection of point ids on a layer.
    pub fn create_selection(
        &mut self,
        name: impl Into<String>,
        layer_id: LayerId,
        point_ids: Vec<PointId>,
    ) -> Result<Selection> {
        if !self.layers.contains_key(&layer_id) {
            return Err(StrataError::LayerNotFound { id: layer_id });
        }
        let selection = Selection::new(name, layer_id, point_ids);
        self.selections.insert(selection.id, selection.clone());
        Ok(selection)
    }

    /// Insert a fully-formed selection (snapshot restore path).
    pub fn insert_selection(&mut self, selection: Selection) {
        self.selections.insert(selection.id, selection);
    }

    pub fn get_selection(&self, selection_id: SelectionId) -> Option<&Selection> {
        self.selections.get(&selection_id)
    }

    pub fn list_selections(&self) -> Vec<&Selection> {
        self.selections.values().collect()
    }

    pub fn delete_selection(&mut self, selection_id: SelectionId) -> Result<()> {
        self.selections
            .remove(&selection_id)
            .map(|_| ())
            .ok_or(StrataError::SelectionNotFound { id: selection_id })
    }

    // ------------------------------------------------------------------
    // Custom axes
    // ------------------------------------------------------------------

    /// Create a custom axis between two points of a layer, caching the raw
    /// direction `vector(b) - vector(a)`.
    pub fn create_custom_axis(
        &mut self,
        name: impl Into<String>,
        layer_id: LayerId,
        point_a_id: PointId,
        point_b_id: PointId,
    ) -> Result<CustomAxis> {
        if !self.layers.contains_key(&layer_id) {
            return Err(StrataError::LayerNotFound { id: layer_id });
        }
        let a = self
            .get_point(layer_id, point_a_id)
            .ok_or(StrataError::PointNotFound {
                layer_id,
                point_id: point_a_id,
            })?;
        let b = self
            .get_point(layer_id, point_b_id)
            .ok_or(StrataError::PointNotFound {
                layer_id,
                point_id: point_b_id,
            })?;

        let vector = b
            .vector
            .iter()
            .zip(a.vector.iter())
            .map(|(bv, av)| bv - av)
            .collect();
        let axis = CustomAxis::new(name, layer_id, point_a_id, point_b_id, vector);
        self.axes.insert(axis.id, axis.clone());
        Ok(axis)
    }

    /// Insert a fully-formed axis (snapshot restore and axis-copy paths).
    pub fn insert_custom_axis(&mut self, axis: CustomAxis) {
        self.axes.insert(axis.id, axis);
    }

    pub fn get_custom_axis(&self, axis_id: AxisId) -> Option<&CustomAxis> {
        self.axes.get(&axis_id)
    }

    /// All axes defined on a layer.
    pub fn list_custom_axes(&self, layer_id: LayerId) -> Vec<&CustomAxis> {
        self.axes
            .values()
            .filter(|axis| axis.layer_id == layer_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Barycenters
    // ------------------------------------------------------------------

    /// Add a virtual point at the mean of the given point subset.
    pub fn create_barycenter(
        &mut self,
        layer_id: LayerId,
        point_ids: &[PointId],
        name: impl Into<String>,
    ) -> Result<Point> {
        if point_ids.is_empty() {
            return Err(StrataError::invalid_input(
                "barycenter requires at least one point",
            ));
        }
        let layer = self
            .layers
            .get(&layer_id)
            .ok_or(StrataError::LayerNotFound { id: layer_id })?;
        let dimensionality = layer.dimensionality;

        let mut mean = vec![0.0; dimensionality];
        for point_id in point_ids {
            let point =
                self.get_point(layer_id, *point_id)
                    .ok_or(StrataError::PointNotFound {
                        layer_id,
                        point_id: *point_id,
                    })?;
            for (acc, v) in mean.iter_mut().zip(point.vector.iter()) {
                *acc += v;
            }
        }
        for acc in mean.iter_mut() {
            *acc /= point_ids.len() as f64;
        }

        let mut data = PointData::new(name, mean);
        data.is_virtual = true;
        self.add_point(layer_id, data)
    }

    // ------------------------------------------------------------------
    // Synthetic data
    // ------------------------------------------------------------------

    /// Generate a clustered synthetic dataset for demos and tests.
    ///
    /// Deterministic: a fixed seed drives cluster centers (Gaussian, scaled
    /// by 3) and per-point noise (sigma 0.5).
    pub fn generate_synthetic_data(
        &mut self,
        n_points: usize,
        dimensionality: usize,
        n_clusters: usize,
        layer_name: impl Into<String>,
    ) -> Result<Layer> {
        if n_clusters == 0 || dimensionality == 0 {
            return Err(StrataError::invalid_input(
                "synthetic data needs at least one cluster and one dimension",
            ));
        }

        let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);
        let normal = Normal::new(0.0, 1.0).expect("unit normal is valid");

        let centers: Vec<Vec<f64>> = (0..n_clusters)
            .map(|_| {
                (0..dimensionality)
                    .map(|_| normal.sample(&mut rng) * 3.0)
                    .collect()
            })
            .collect();

        let layer = self.create_layer(
            layer_name,
            dimensionality,
            Some(format!("Synthetic dataset with {} clusters", n_clusters)),
            None,
        );

        let mut points = Vec::with_capacity(n_points);
        for i in 0..n_points {
            let cluster = rng.gen_range(0..n_clusters);
            let vector: Vec<f64> = centers[cluster]
                .iter()
                .map(|c| c + normal.sample(&mut rng) * 0.5)
                .collect();
            let mut metadata = crate::model::ParamMap::new();
            metadata.insert("cluster".to_string(), json!(cluster));
            metadata.insert("index".to_string(), json!(i));
            points.push(PointData::new(format!("point_{}", i), vector).with_metadata(metadata));
        }
        self.add_points_bulk(layer.id, points)?;

        Ok(self
            .get_layer(layer.id)
            .expect("layer created above")
            .clone())
    }
}
