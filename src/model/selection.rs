//! Named point selections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LayerId, PointId};

/// Unique identifier of a selection (UUID v4).
pub type SelectionId = Uuid;

/// A named subset of a layer's point ids.
///
/// Selections are independent of the computation graph: they are never
/// rewritten by propagation. Because point ids are preserved across layer
/// derivations, a selection's id set stays meaningful on derived layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub id: SelectionId,
    pub name: String,
    pub layer_id: LayerId,
    pub point_ids: Vec<PointId>,
    pub point_count: usize,
}

impl Selection {
    pub fn new(name: impl Into<String>, layer_id: LayerId, point_ids: Vec<PointId>) -> Self {
        let point_count = point_ids.len();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            layer_id,
            point_ids,
            point_count,
        }
    }
}
