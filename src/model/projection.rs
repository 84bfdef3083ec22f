//! Projections: low-dimensional views of a layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LayerId, ParamMap, PointId};

/// Unique identifier of a projection (UUID v4).
pub type ProjectionId = Uuid;

/// The algorithm a projection uses to place points on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    Pca,
    Tsne,
    Umap,
    /// Oblique projection onto user-defined axes, display only.
    CustomAxes,
    /// Raw dimension values used verbatim as coordinates.
    Direct,
    /// One dimension's values plus jitter, for density charts.
    Density,
    /// One dimension's values plus jitter, for box plots.
    #[serde(rename = "boxplot")]
    BoxPlot,
    /// One dimension's values plus jitter, for violin plots.
    Violin,
}

impl ProjectionKind {
    /// Lowercase tag used for reducer lookup and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            ProjectionKind::Pca => "pca",
            ProjectionKind::Tsne => "tsne",
            ProjectionKind::Umap => "umap",
            ProjectionKind::CustomAxes => "custom_axes",
            ProjectionKind::Direct => "direct",
            ProjectionKind::Density => "density",
            ProjectionKind::BoxPlot => "boxplot",
            ProjectionKind::Violin => "violin",
        }
    }
}

impl std::fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A lazily computed, cached low-dimensional (or statistical) view of a
/// layer's vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub id: ProjectionId,
    pub name: String,
    pub kind: ProjectionKind,
    pub layer_id: LayerId,
    /// Output dimensionality, usually 2 or 3.
    pub dimensions: usize,
    #[serde(default)]
    pub parameters: ParamMap,
    /// Fixed at creation so stochastic algorithms are reproducible.
    pub random_seed: u64,
}

impl Projection {
    pub fn new(
        name: impl Into<String>,
        kind: ProjectionKind,
        layer_id: LayerId,
        dimensions: usize,
        parameters: ParamMap,
        random_seed: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            layer_id,
            dimensions,
            parameters,
            random_seed,
        }
    }
}

/// A point's placement under a projection.
///
/// Ephemeral: recomputed on demand, never persisted beyond the cache. The id
/// equals the source point's id so the client can track items across views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub id: PointId,
    pub label: String,
    #[serde(default)]
    pub metadata: ParamMap,
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub is_virtual: bool,
}
