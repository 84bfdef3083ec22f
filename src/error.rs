//! Error types for Strata.
//!
//! The taxonomy mirrors how callers are expected to react: `*NotFound`
//! variants map to an absent-resource response at the API boundary,
//! `InvalidInput` covers malformed parameters that were rejected (as opposed
//! to the ones handled in place with a fallback), and `Computation` covers
//! numeric work that could not produce a result.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors that can occur in the Strata engine.
#[derive(Error, Debug)]
pub enum StrataError {
    // Lookup Errors
    #[error("Layer not found: {id}")]
    LayerNotFound { id: Uuid },

    #[error("Transformation not found: {id}")]
    TransformationNotFound { id: Uuid },

    #[error("Projection not found: {id}")]
    ProjectionNotFound { id: Uuid },

    #[error("Selection not found: {id}")]
    SelectionNotFound { id: Uuid },

    #[error("Point {point_id} not found in layer {layer_id}")]
    PointNotFound { layer_id: Uuid, point_id: Uuid },

    // Input Errors
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // Computation Errors
    #[error("Computation failed: {reason}")]
    Computation { reason: String },

    #[error("No reducer registered for algorithm: {algorithm}")]
    ReducerMissing { algorithm: String },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrataError {
    /// Shorthand for an [`StrataError::InvalidInput`] with a formatted reason.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        StrataError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`StrataError::Computation`] with a formatted reason.
    pub fn computation(reason: impl Into<String>) -> Self {
        StrataError::Computation {
            reason: reason.into(),
        }
    }

    /// True for errors the API boundary should surface as "not found"
    /// rather than as a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StrataError::LayerNotFound { .. }
                | StrataError::TransformationNotFound { .. }
                | StrataError::ProjectionNotFound { .. }
                | StrataError::SelectionNotFound { .. }
                | StrataError::PointNotFound { .. }
        )
    }

    /// True for errors caused by a numeric computation that could not
    /// produce a result. These leave graph state untouched.
    pub fn is_computation(&self) -> bool {
        matches!(
            self,
            StrataError::Computation { .. } | StrataError::ReducerMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StrataError::LayerNotFound { id: Uuid::new_v4() };
        assert!(err.is_not_found());
        assert!(!err.is_computation());
    }

    #[test]
    fn test_computation_classification() {
        let err = StrataError::computation("layer has no points");
        assert!(err.is_computation());
        assert!(!err.is_not_found());

        let err = StrataError::ReducerMissing {
            algorithm: "tsne".to_string(),
        };
        assert!(err.is_computation());
    }

    #[test]
    fn test_invalid_input_message() {
        let err = StrataError::invalid_input("axes must be non-zero");
        assert_eq!(err.to_string(), "Invalid input: axes must be non-zero");
    }
}
