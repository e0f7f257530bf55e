//! Error types for occu_core operations.

use thiserror::Error;

/// Errors that can occur during mesh construction and geometric queries.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A triangle references a vertex index outside the vertex array.
    #[error("triangle {triangle} references vertex {index} but mesh has {vertex_count} vertices")]
    InvalidTriangleIndex {
        /// Index of the offending triangle.
        triangle: usize,
        /// The out-of-range vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// The mesh surface cannot be sampled (no faces or zero total area).
    #[error("degenerate surface: {faces} faces with total area {total_area}")]
    DegenerateSurface {
        /// Number of faces in the mesh.
        faces: usize,
        /// Total surface area.
        total_area: f32,
    },

    /// Malformed OBJ input.
    #[error("OBJ parse error at line {line}: {message}")]
    ObjParse {
        /// 1-based line number in the input.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// I/O error while reading mesh data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for occu_core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
