//! snapview core - Scoped zero-copy access to engine arrays
//!
//! This crate exposes engine-owned particle and bond buffers as typed array
//! views that are only valid inside an explicit scope.
//!
//! # Example
//!
//! ```ignore
//! use snapview_core::{LocalArray, LocalSnapshot};
//!
//! LocalSnapshot::scope(&state, |snap| {
//!     let tags = snap.particles().get("tag")?;            // local rows
//!     let ghosts = snap.particles().get("ghost_tag")?;    // ghost rows
//!     let all = snap.particles().get("tag_with_ghosts")?; // both
//!     snap.particles().set("velocity", &velocities)?;      // writes through
//!     Ok::<_, snapview_core::AccessError>(())
//! })?;
//! ```
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Buffer handles, dtypes and engine array identifiers
//! - [`engine`] - Array storage, states and local data sources

// Allow the crate to refer to itself as `snapview_core` for proc macro compatibility
extern crate self as snapview_core;

pub use snapview_engine as engine;
pub use snapview_sdk as sdk;

pub mod access;
pub mod action;
pub mod config;
pub mod logging;
pub mod simulation;
pub mod snapshot;

// Re-export commonly used items
pub use access::{
    AccessError, AccessMode, AccessResult, ArrayBackend, ArrayInterface, BondFields, Device,
    DeviceArray, FieldRegistry, Host, HostArray, LocalAccess, LocalArray, ParticleFields,
    ScopeToken, ScopeViolation,
};
pub use action::{
    Action, ActionError, ActionFlags, Attachment, AttributeConflict, CustomOperation, Operation,
    OperationKind, Trigger,
};
pub use config::{ConfigError, ConfigResult, CoreConfig};
pub use simulation::{OperationKey, Simulation, SimulationError};
pub use snapshot::{BondAccess, LocalSnapshot, LocalSnapshotGpu, ParticleAccess, Snapshot};

// Re-export macros
pub use snapview_macros::FieldRegistry;
