//! Error types for engine array access

use snapview_sdk::DType;

/// Error type for engine-side operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A fetch or exit was issued without an open scope
    #[error("Cannot access {0} data outside of a local access scope")]
    NotInScope(&'static str),

    /// Enter was called twice on the same local data object
    #[error("Local access scope for {0} is already open")]
    AlreadyInScope(&'static str),

    /// Another scope holds the entity store
    #[error("{0} data is locked by another access scope")]
    Busy(&'static str),

    /// The array is not available in this engine build
    #[error("Array {0} is not supported by this engine")]
    Unsupported(&'static str),

    /// Engine-side bulk set with the wrong number of elements
    #[error("Array {array} holds {expected} elements, got {actual}")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Engine-side typed access with the wrong element type
    #[error("Array {array} stores {stored}, requested {requested}")]
    DTypeMismatch {
        array: &'static str,
        stored: DType,
        requested: DType,
    },

    /// Device memory was requested but the state has no device
    #[error("No device available for device-memory access")]
    NoDevice,
}
