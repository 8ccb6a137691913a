//! snapview Engine - Array Storage and Local Data Access
//!
//! This crate is the native side of the scoped access layer. It handles:
//! - Storing per-entity arrays with local rows followed by ghost rows
//! - Sharing that storage through a cloneable simulation [`State`]
//! - Handing out raw [`BufferHandle`](snapview_sdk::BufferHandle)s inside an
//!   explicit enter/exit scope via the [`LocalData`] capability
//!
//! # Architecture
//!
//! Two [`LocalData`] implementations exist per entity kind:
//! [`HostLocalData`] lends host memory directly, [`DeviceLocalData`] stages
//! the store into device buffers on enter and copies writable arrays back on
//! exit. Both hold the entity store's write lock for the whole scope.
//!
//! # Thread Safety
//!
//! Stores live behind `parking_lot::RwLock`s. Entering a scope never blocks:
//! a store already held by another scope reports [`EngineError::Busy`].

pub mod device;
pub mod element;
pub mod error;
pub mod local_data;
pub mod state;
pub mod store;

pub use device::{DeviceLocalData, DeviceTransfer, SimulatedDevice};
pub use element::Element;
pub use error::EngineError;
pub use local_data::{HostLocalData, LocalData};
pub use state::{State, SystemArrays};
pub use store::ArrayStore;
