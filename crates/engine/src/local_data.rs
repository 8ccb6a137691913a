//! Scoped local data access
//!
//! [`LocalData`] is the capability the access layer needs from the engine:
//! an enter hook, an exit hook, and a fetch that turns an array identifier
//! plus ghost flags into a [`BufferHandle`]. Fetches are only legal between
//! enter and exit.

use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::{ArcRwLockWriteGuard, RawRwLock, RwLock};
use tracing::debug;

use snapview_sdk::{ArrayLayout, BufferHandle, GhostFlags, MemoryLocation};

use crate::device::DeviceTransfer;
use crate::error::EngineError;
use crate::state::{State, SystemArrays};
use crate::store::ArrayStore;

/// Engine-side buffer provider for one entity kind
pub trait LocalData<K: ArrayLayout> {
    /// Where fetched buffers live
    fn location(&self) -> MemoryLocation;

    /// Begin a scope. May lock or synchronize engine memory.
    fn enter(&mut self) -> Result<(), EngineError>;

    /// End a scope. Every handle fetched since `enter` becomes dangling.
    fn exit(&mut self) -> Result<(), EngineError>;

    /// Describe the rows of `array` selected by `flags`
    fn fetch(&mut self, array: K, flags: GhostFlags) -> Result<BufferHandle, EngineError>;

    /// Whether a scope is currently open
    fn is_entered(&self) -> bool;

    /// Transfer capability for device buffers
    fn transfer(&self) -> Option<Arc<dyn DeviceTransfer>> {
        None
    }
}

/// Write guard held for the duration of a scope
pub(crate) type ScopeGuard<K> = ArcRwLockWriteGuard<RawRwLock, ArrayStore<K>>;

/// Acquire a store for a scope without blocking
pub(crate) fn lock_store<K: SystemArrays>(
    store: &Arc<RwLock<ArrayStore<K>>>,
) -> Result<ScopeGuard<K>, EngineError> {
    store.try_write_arc().ok_or(EngineError::Busy(K::ENTITY))
}

/// Build a handle for `flags`' rows of a column starting at `base`
///
/// # Safety
/// `base` must be the start of a live column of `array` holding
/// `(n_local + n_ghost) * array.width()` elements.
pub(crate) unsafe fn column_handle<K: ArrayLayout>(
    base: NonNull<u8>,
    array: K,
    flags: GhostFlags,
    (n_local, n_ghost): (usize, usize),
    location: MemoryLocation,
) -> BufferHandle {
    let rows = flags.row_range(n_local, n_ghost);
    let offset = rows.start * array.width() * array.dtype().size();
    // SAFETY: rows.start <= n_local + n_ghost, so the offset stays within
    // (or one past the end of) the column allocation
    let ptr = NonNull::new_unchecked(base.as_ptr().add(offset));
    BufferHandle::from_raw_parts(
        ptr,
        rows.len(),
        array.width(),
        array.dtype(),
        array.read_only(),
        location,
    )
}

/// Host-memory local data
///
/// Buffers point straight into the engine's columns, so writes through them
/// are visible to the engine immediately.
pub struct HostLocalData<K: SystemArrays> {
    store: Arc<RwLock<ArrayStore<K>>>,
    guard: Option<ScopeGuard<K>>,
    bases: Vec<NonNull<u8>>,
    extent: (usize, usize),
    fetches: usize,
}

impl<K: SystemArrays> HostLocalData<K> {
    pub fn new(state: &State) -> Self {
        Self {
            store: Arc::clone(K::store(state)),
            guard: None,
            bases: Vec::new(),
            extent: (0, 0),
            fetches: 0,
        }
    }

    /// Number of fetches served over this object's lifetime
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

impl<K: SystemArrays> LocalData<K> for HostLocalData<K> {
    fn location(&self) -> MemoryLocation {
        MemoryLocation::Host
    }

    fn enter(&mut self) -> Result<(), EngineError> {
        if self.guard.is_some() {
            return Err(EngineError::AlreadyInScope(K::ENTITY));
        }

        let mut guard = lock_store(&self.store)?;
        self.extent = (guard.n_local(), guard.n_ghost());
        self.bases = guard.base_ptrs();
        self.guard = Some(guard);

        debug!(
            "Entered host {} scope (n_local={}, n_ghost={})",
            K::ENTITY,
            self.extent.0,
            self.extent.1
        );
        Ok(())
    }

    fn exit(&mut self) -> Result<(), EngineError> {
        let guard = self.guard.take().ok_or(EngineError::NotInScope(K::ENTITY))?;
        self.bases.clear();
        drop(guard);
        debug!("Exited host {} scope", K::ENTITY);
        Ok(())
    }

    fn fetch(&mut self, array: K, flags: GhostFlags) -> Result<BufferHandle, EngineError> {
        if self.guard.is_none() {
            return Err(EngineError::NotInScope(K::ENTITY));
        }
        let base = *self
            .bases
            .get(array.index())
            .ok_or(EngineError::Unsupported(array.accessor_name()))?;

        self.fetches += 1;
        // SAFETY: the bases were taken from the store we hold locked
        Ok(unsafe { column_handle(base, array, flags, self.extent, MemoryLocation::Host) })
    }

    fn is_entered(&self) -> bool {
        self.guard.is_some()
    }
}
