//! Transformations between layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LayerId, ParamMap};

/// Unique identifier of a transformation (UUID v4).
pub type TransformationId = Uuid;

/// The algorithm a transformation applies to its source layer.
///
/// A closed set so dispatch is an exhaustive `match`; adding an algorithm is
/// a compile-checked change, not a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    /// Elementwise multiply by a per-axis factor vector.
    Scaling,
    /// Planar rotation on a chosen pair of axes.
    Rotation,
    /// Matrix multiply plus optional translation.
    Affine,
    /// Matrix multiply only.
    Linear,
    /// PCA re-expression; fitted components are written back into the
    /// parameter map.
    Pca,
    /// Oblique projection onto 1-2 user axes, output is 2-dimensional.
    #[serde(rename = "custom_axes_2d")]
    CustomAxes2d,
    /// Full-rank change of basis whose first two coordinates follow the user
    /// axes and whose remaining coordinates follow the standard basis.
    CustomAxesFull,
}

impl TransformationKind {
    /// Lowercase tag used in derived-layer descriptions and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            TransformationKind::Scaling => "scaling",
            TransformationKind::Rotation => "rotation",
            TransformationKind::Affine => "affine",
            TransformationKind::Linear => "linear",
            TransformationKind::Pca => "pca",
            TransformationKind::CustomAxes2d => "custom_axes_2d",
            TransformationKind::CustomAxesFull => "custom_axes_full",
        }
    }

    /// Whether applying this kind can be undone by another linear map.
    ///
    /// PCA with fewer components than dimensions and the 2D custom-axes
    /// projection discard information, so they are not invertible.
    pub fn is_invertible(&self) -> bool {
        !matches!(
            self,
            TransformationKind::Pca | TransformationKind::CustomAxes2d
        )
    }
}

impl std::fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named function instance mapping one source layer to one target layer.
///
/// The target reference always points at exactly one currently-valid layer;
/// editing the transformation's kind or parameters replaces that layer with
/// a freshly derived one (new id, preserved name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    pub id: TransformationId,
    pub name: String,
    pub kind: TransformationKind,
    pub source_layer_id: LayerId,
    /// Target layer; `None` only before first application.
    #[serde(default)]
    pub target_layer_id: Option<LayerId>,
    /// Algorithm parameters; derived values (fitted PCA components, mean)
    /// are written back here after application.
    #[serde(default)]
    pub parameters: ParamMap,
    #[serde(default = "default_true")]
    pub is_invertible: bool,
}

fn default_true() -> bool {
    true
}

impl Transformation {
    /// Create a transformation that has not yet been applied.
    pub fn new(
        name: impl Into<String>,
        kind: TransformationKind,
        source_layer_id: LayerId,
        parameters: ParamMap,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            source_layer_id,
            target_layer_id: None,
            parameters,
            is_invertible: kind.is_invertible(),
        }
    }
}
