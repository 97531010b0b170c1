// Core modules for toolpath-to-volume mesh generation
pub mod bead;
pub mod export;
pub mod extrude;
pub mod geometry;
pub mod profile;
pub mod program;
pub mod trace;

// Re-export commonly used types
pub use bead::{
    calibrate_trace, BeadParams, CalibratedSample, CalibratedTrace, Calibration, Feedstock,
    FeedstockShape,
};
pub use extrude::{extrude_trace, LevelOfDetail, MeshBuffers, ScalarField};
pub use geometry::{Point3D, Vector3D};
pub use program::parse_program;
pub use trace::{MotionSample, MotionTrace, TelemetryRow, TraceSource};

/// Shared tolerance for degeneracy tests and velocity floors.
pub const EPSILON: f64 = 1e-9;

/// Main result type for the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structurally unusable input: empty program, no motion tokens, fewer
    /// than two resulting samples. Geometric degeneracies (zero-length
    /// segments, near-vertical tangents, out-of-range thickness) are handled
    /// by silent fallbacks, never surfaced here.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
