//! Error taxonomy for the geometry core.

use thiserror::Error;

/// Errors a [`crate::Geometry::build`] (or the evaluation cache dispatching
/// it to the kernel) can report. Everything else — empty results,
/// zero-sized shapes, degenerate offsets — produces `Empty` nodes, never
/// an error.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A precondition the caller controls was violated (e.g. a fillet
    /// radius larger than the edge it rounds). Surfaced as a programmer
    /// error, not a recoverable condition.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// An import factory (STL/3MF/SVG/font) failed to read its source.
    #[error("import of {source} failed: {reason}")]
    ImportFailed {
        /// The path or identifier that was being imported.
        source: String,
        /// Why the import failed.
        reason: String,
    },
    /// The kernel rejected a user-supplied mesh as non-manifold.
    #[error("mesh is not manifold")]
    MeshNotManifold,
    /// The kernel reported an internal fault.
    #[error("kernel internal error: {0}")]
    KernelInternal(String),
}

impl From<vcad_kernel::KernelError> for GeometryError {
    fn from(e: vcad_kernel::KernelError) -> Self {
        match e {
            vcad_kernel::KernelError::NotManifold => GeometryError::MeshNotManifold,
            vcad_kernel::KernelError::KernelInternal(msg) => GeometryError::KernelInternal(msg),
        }
    }
}

/// Errors raised while writing an exported file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The geometry that was asked to export had no content.
    #[error("empty geometry, nothing to export")]
    EmptyGeometry,
    /// An I/O error occurred while writing the output file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A format-level serialization error (XML/zip) occurred.
    #[error("export serialization error: {0}")]
    Serialization(String),
}
