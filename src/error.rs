//! Error types for the Wirebench circuit solver.
//!
//! Very little in the core is fallible: integrity problems and numerical
//! faults are reported on the solve result instead of failing it. The
//! [`WirebenchError`] type covers what remains (snapshot I/O, queries for
//! missing elements, invalid solver configuration).

use thiserror::Error;

use crate::circuit::ElementId;

/// Result type alias using [`WirebenchError`].
pub type Result<T> = std::result::Result<T, WirebenchError>;

/// Unified error type for all Wirebench operations.
#[derive(Error, Debug)]
pub enum WirebenchError {
    // ============ Snapshot Errors ============
    /// Error reading a snapshot file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON could not be decoded or encoded
    #[error("Invalid circuit snapshot: {source}")]
    SnapshotFormat {
        #[source]
        source: serde_json::Error,
    },

    // ============ Query Errors ============
    /// No element with this id in the published result
    #[error("Element '{id}' not found")]
    ElementNotFound { id: ElementId },

    // ============ Solver Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit contains a loop of ideal sources")]
    SingularMatrix,

    /// Invalid solver configuration
    #[error("Invalid solver configuration: {message}")]
    InvalidConfig { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl WirebenchError {
    /// Create an element-not-found error
    pub fn element_not_found(id: &ElementId) -> Self {
        Self::ElementNotFound { id: id.clone() }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
