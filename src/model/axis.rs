//! User-defined direction axes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LayerId, PointId};

/// Unique identifier of a custom axis (UUID v4).
pub type AxisId = Uuid;

/// A user-defined direction in a layer's vector space, anchored on two of
/// the layer's points.
///
/// The cached `vector` is the raw (unnormalized) direction
/// `vector(b) - vector(a)`. It doubles as a named UI object and as the input
/// to custom-axes transformations and projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAxis {
    pub id: AxisId,
    pub name: String,
    pub layer_id: LayerId,
    pub point_a_id: PointId,
    pub point_b_id: PointId,
    /// Cached direction, recomputed whenever the axis is copied onto a
    /// derived layer.
    pub vector: Vec<f64>,
}

impl CustomAxis {
    pub fn new(
        name: impl Into<String>,
        layer_id: LayerId,
        point_a_id: PointId,
        point_b_id: PointId,
        vector: Vec<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            layer_id,
            point_a_id,
            point_b_id,
            vector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_keeps_raw_direction() {
        let axis = CustomAxis::new(
            "a-to-b",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![3.0, 0.0, 4.0],
        );
        // Raw direction, not normalized.
        assert_eq!(axis.vector, vec![3.0, 0.0, 4.0]);
    }
}
