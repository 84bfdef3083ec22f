//! Data Model Module
//!
//! Plain data types for the dataset graph: layers of points, the
//! transformations that derive new layers, the projections that view them,
//! and the user-defined selections and custom axes that annotate them.

mod axis;
mod layer;
mod projection;
mod selection;
mod transformation;

pub use axis::{AxisId, CustomAxis};
pub use layer::{Layer, LayerId, Point, PointData, PointId};
pub use projection::{ProjectedPoint, Projection, ProjectionId, ProjectionKind};
pub use selection::{Selection, SelectionId};
pub use transformation::{Transformation, TransformationId, TransformationKind};

/// Free-form metadata / parameter mapping attached to points,
/// transformations, and projections.
pub type ParamMap = serde_json::Map<String, serde_json::Value>;
