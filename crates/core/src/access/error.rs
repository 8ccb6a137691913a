//! Error types for local access

use snapview_engine::EngineError;
use snapview_sdk::{DType, MemoryLocation};

/// Misuse of the scope state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeViolation {
    /// A view was used after its scope exited
    #[error("View {0} was used after its local access scope exited")]
    Expired(String),

    /// Enter was called while a scope is open
    #[error("Local access to {0} is already open")]
    AlreadyOpen(&'static str),

    /// An attribute was requested, or exit called, with no open scope
    #[error("No local access scope is open")]
    NotOpen,

    /// A snapshot was entered a second time
    #[error("Snapshot has already been used; create a new one")]
    Finished,

    /// Shared and exclusive access to scope memory overlapped
    #[error("Access to {0} overlaps an outstanding borrow of the same scope")]
    Aliased(String),

    /// Exit was called from inside a view callback
    #[error("Cannot exit a local access scope while a view is borrowed")]
    BorrowedAtExit,
}

/// Error type for attribute resolution and view access
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Name (after ghost prefix/suffix stripping) is not registered
    #[error("{entity} has no field {name}")]
    FieldNotFound { entity: &'static str, name: String },

    /// Write attempted on a read-only buffer
    #[error("Field {0} is read-only")]
    ReadOnlyField(String),

    #[error(transparent)]
    ScopeViolation(#[from] ScopeViolation),

    #[error(transparent)]
    EngineFetch(#[from] EngineError),

    /// Typed access with the wrong element type
    #[error("Field {name} holds {stored}, requested {requested}")]
    DTypeMismatch {
        name: String,
        stored: DType,
        requested: DType,
    },

    /// Bulk assignment with the wrong number of elements
    #[error("Field {name} holds {expected} elements, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Buffer lives somewhere the view type cannot address
    #[error("Field {name} is in {location:?} memory, which this view cannot address")]
    LocationMismatch {
        name: String,
        location: MemoryLocation,
    },

    /// Element lookup past the end of a view
    #[error("Index ({row}, {col}) is out of bounds for {name} with shape {shape:?}")]
    OutOfBounds {
        name: String,
        row: usize,
        col: usize,
        shape: (usize, usize),
    },
}

/// Result type for local access
pub type AccessResult<T> = Result<T, AccessError>;
