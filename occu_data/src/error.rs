//! Error types for dataset preparation.
//!
//! Failures here are deterministic functions of the input, so nothing is
//! retried; the caller decides whether to skip the offending example or
//! abort the run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while assembling training examples.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A required asset is missing or malformed for one subject/view.
    #[error("bad input for subject {subject} view {view:03} ({path:?}): {message}")]
    InputData {
        /// Subject identifier.
        subject: String,
        /// View angle in degrees.
        view: u32,
        /// Path of the offending asset.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Surface sampling could not produce the requested point count.
    #[error("sampling failed for subject {subject}: {reason}")]
    SamplingFailure {
        /// Subject identifier.
        subject: String,
        /// Description of the failure.
        reason: String,
    },

    /// Mutually-required options are inconsistent. Raised before any
    /// sampling work begins.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Buffer shape mismatch.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Geometry error from occu_core.
    #[error("geometry error: {0}")]
    Core(#[from] occu_core::CoreError),

    /// Raster decode/encode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Camera parameter JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// Convenience constructor for [`DatasetError::InputData`].
    pub fn input(
        subject: impl Into<String>,
        view: u32,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::InputData {
            subject: subject.into(),
            view,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
