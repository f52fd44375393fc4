//! Error types for asset resolution, joint construction and scene management.

use crate::segment::SegmentId;

/// Identifier of an assembly inside a scene.
pub type AssemblyId = u32;

/// Failure to resolve a single image from the asset provider.
///
/// Always recovered inside the loader by substituting fallback geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("asset {path} is invalid: {reason}")]
    Invalid { path: String, reason: String },
    #[error("asset provider unavailable")]
    Unavailable,
}

/// Failure to wire an assembly's joint chain. Fatal for that assembly only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JointError {
    #[error("joint chain needs at least two segments, got {0}")]
    TooFewSegments(usize),
    #[error("segment {0} is out of order (expected ring first and body last)")]
    UnexpectedOrder(SegmentId),
    #[error("segment {0} has a non-finite position")]
    NonFinitePosition(SegmentId),
    #[error("segments {a} and {b} coincide")]
    CoincidentSegments { a: SegmentId, b: SegmentId },
    #[error("segment {0} has no physics body")]
    MissingBody(SegmentId),
}

/// Errors returned by scene-level operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("unknown assembly {0}")]
    UnknownAssembly(AssemblyId),
    #[error("assembly {id} failed to build joints: {source}")]
    JointConstruction {
        id: AssemblyId,
        #[source]
        source: JointError,
    },
}

/// Errors raised while reading configuration or manifest files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
}
