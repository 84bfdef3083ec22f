//! Layers and points.
//!
//! A layer is a named, immutable-once-populated collection of
//! same-dimensionality vectors. Derived layers remember the transformation
//! that produced them. A point's id is stable across derivations: the "same"
//! item keeps its id from layer to layer while its vector changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ParamMap, TransformationId};

/// Unique identifier of a layer (UUID v4).
pub type LayerId = Uuid;

/// Unique identifier of a point (UUID v4), shared across derived layers.
pub type PointId = Uuid;

/// A single vector with identity, owned by exactly one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable identity, preserved across transformations.
    pub id: PointId,
    /// Display label.
    pub label: String,
    /// Free-form metadata (class tags, source indices, ...).
    #[serde(default)]
    pub metadata: ParamMap,
    /// Position in the layer's vector space.
    pub vector: Vec<f64>,
    /// True for derived points such as barycenters that are not part of the
    /// original dataset.
    #[serde(default)]
    pub is_virtual: bool,
}

/// Payload for admitting a point into a layer.
///
/// Identical to [`Point`] except that the id may be omitted, in which case
/// the store assigns a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointData {
    #[serde(default)]
    pub id: Option<PointId>,
    pub label: String,
    #[serde(default)]
    pub metadata: ParamMap,
    pub vector: Vec<f64>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl PointData {
    /// Create a plain point payload with a label and vector.
    pub fn new(label: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            id: None,
            label: label.into(),
            metadata: ParamMap::new(),
            vector,
            is_virtual: false,
        }
    }

    /// Keep a specific id (used when deriving layers and restoring snapshots).
    pub fn with_id(mut self, id: PointId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach metadata to the payload.
    pub fn with_metadata(mut self, metadata: ParamMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the virtual-point flag.
    pub fn virtual_flag(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }

    /// Materialize into a [`Point`], assigning a fresh id if none was given.
    pub fn into_point(self) -> Point {
        Point {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            label: self.label,
            metadata: self.metadata,
            vector: self.vector,
            is_virtual: self.is_virtual,
        }
    }
}

impl From<&Point> for PointData {
    fn from(point: &Point) -> Self {
        Self {
            id: Some(point.id),
            label: point.label.clone(),
            metadata: point.metadata.clone(),
            vector: point.vector.clone(),
            is_virtual: point.is_virtual,
        }
    }
}

/// A named collection of same-dimensionality point vectors.
///
/// The point set and dimensionality are immutable once transformed data is
/// in the layer; editing an upstream transformation replaces the layer with
/// a new object (new id) rather than mutating it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Number of coordinates per point vector.
    pub dimensionality: usize,
    /// Number of points currently stored under this layer.
    #[serde(default)]
    pub point_count: usize,
    /// True if this layer was produced by a transformation.
    #[serde(default)]
    pub is_derived: bool,
    /// The transformation that produced this layer, if any.
    #[serde(default)]
    pub source_transformation_id: Option<TransformationId>,
}

impl Layer {
    /// Create a new empty layer.
    pub fn new(
        name: impl Into<String>,
        dimensionality: usize,
        description: Option<String>,
        source_transformation_id: Option<TransformationId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            dimensionality,
            point_count: 0,
            is_derived: source_transformation_id.is_some(),
            source_transformation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_data_assigns_id() {
        let point = PointData::new("a", vec![1.0, 2.0]).into_point();
        assert_eq!(point.label, "a");
        assert!(!point.is_virtual);
    }

    #[test]
    fn test_point_data_keeps_id() {
        let id = Uuid::new_v4();
        let point = PointData::new("a", vec![1.0]).with_id(id).into_point();
        assert_eq!(point.id, id);
    }

    #[test]
    fn test_derived_flag_follows_source() {
        let plain = Layer::new("base", 4, None, None);
        assert!(!plain.is_derived);

        let derived = Layer::new("base_scaled", 4, None, Some(Uuid::new_v4()));
        assert!(derived.is_derived);
    }
}
