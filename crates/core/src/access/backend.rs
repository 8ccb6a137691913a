//! Memory backends
//!
//! The accessor is written once and parameterised by an [`ArrayBackend`],
//! which supplies the engine data source for a state and turns fetched
//! buffers into views.

use std::sync::Arc;

use snapview_engine::{
    DeviceLocalData, DeviceTransfer, EngineError, HostLocalData, LocalData, State, SystemArrays,
};
use snapview_sdk::{BufferHandle, MemoryLocation};

use super::array::{HostArray, LocalArray};
use super::device::DeviceArray;
use super::error::{AccessError, AccessResult};
use super::token::ScopeToken;

/// Capability that selects engine data and view type for one memory space
pub trait ArrayBackend: 'static {
    type Array: LocalArray;

    /// Engine data source for entity kind `K`
    type Source<K: SystemArrays>: LocalData<K> + 'static;

    /// Memory space every fetched buffer must live in
    const LOCATION: MemoryLocation;

    fn source<K: SystemArrays>(state: &State) -> Result<Self::Source<K>, EngineError>;

    /// Wrap a fetched buffer as a view tied to `token`
    fn wrap(
        label: String,
        buffer: BufferHandle,
        token: ScopeToken,
        transfer: Option<Arc<dyn DeviceTransfer>>,
    ) -> AccessResult<Self::Array>;
}

fn check_location(label: &str, buffer: &BufferHandle, expected: MemoryLocation) -> AccessResult<()> {
    if buffer.location() == expected {
        Ok(())
    } else {
        Err(AccessError::LocationMismatch {
            name: label.to_string(),
            location: buffer.location(),
        })
    }
}

/// Host memory; views are free to build
#[derive(Debug, Clone, Copy)]
pub enum Host {}

impl ArrayBackend for Host {
    type Array = HostArray;
    type Source<K: SystemArrays> = HostLocalData<K>;

    const LOCATION: MemoryLocation = MemoryLocation::Host;

    fn source<K: SystemArrays>(state: &State) -> Result<Self::Source<K>, EngineError> {
        Ok(HostLocalData::new(state))
    }

    fn wrap(
        label: String,
        buffer: BufferHandle,
        token: ScopeToken,
        _transfer: Option<Arc<dyn DeviceTransfer>>,
    ) -> AccessResult<Self::Array> {
        check_location(&label, &buffer, Self::LOCATION)?;
        // SAFETY: the engine fetched this host buffer inside the scope `token`
        // belongs to and keeps it locked until that scope exits
        Ok(unsafe { HostArray::new(label, buffer, token) })
    }
}

/// Device memory; host access is staged through the engine's transfer
#[derive(Debug, Clone, Copy)]
pub enum Device {}

impl ArrayBackend for Device {
    type Array = DeviceArray;
    type Source<K: SystemArrays> = DeviceLocalData<K>;

    const LOCATION: MemoryLocation = MemoryLocation::Device;

    fn source<K: SystemArrays>(state: &State) -> Result<Self::Source<K>, EngineError> {
        DeviceLocalData::new(state)
    }

    fn wrap(
        label: String,
        buffer: BufferHandle,
        token: ScopeToken,
        transfer: Option<Arc<dyn DeviceTransfer>>,
    ) -> AccessResult<Self::Array> {
        check_location(&label, &buffer, Self::LOCATION)?;
        let transfer = transfer.ok_or(AccessError::EngineFetch(EngineError::NoDevice))?;
        // SAFETY: the engine fetched this device buffer inside the scope
        // `token` belongs to and frees it only when that scope exits
        Ok(unsafe { DeviceArray::new(label, buffer, token, transfer) })
    }
}
