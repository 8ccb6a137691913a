//! Device memory staging
//!
//! Device buffers are not addressable from the host. [`DeviceLocalData`]
//! copies the entity store into device allocations when a scope opens, hands
//! out device pointers while it is open, and copies writable arrays back when
//! it closes. All copies go through a [`DeviceTransfer`].

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use snapview_sdk::{BufferHandle, GhostFlags, MemoryLocation};

use crate::error::EngineError;
use crate::local_data::{column_handle, lock_store, LocalData, ScopeGuard};
use crate::state::{State, SystemArrays};
use crate::store::ArrayStore;

/// Copies between host memory and device memory
pub trait DeviceTransfer: fmt::Debug + Send + Sync {
    /// Copy `dst.len()` bytes from device memory at `src` into `dst`
    ///
    /// # Safety
    /// `src` must be a live device allocation of at least `dst.len()` bytes.
    unsafe fn copy_to_host(&self, src: NonNull<u8>, dst: &mut [u8]);

    /// Copy `src` into device memory at `dst`
    ///
    /// # Safety
    /// `dst` must be a live device allocation of at least `src.len()` bytes
    /// that no host reference aliases.
    unsafe fn copy_to_device(&self, src: &[u8], dst: NonNull<u8>);
}

/// Device whose memory is an ordinary, separately allocated heap region
///
/// Stands in for an accelerator in builds and tests without one, and counts
/// the bytes moved in each direction.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    to_host: AtomicU64,
    to_device: AtomicU64,
}

impl SimulatedDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bytes copied device -> host so far
    pub fn bytes_to_host(&self) -> u64 {
        self.to_host.load(Ordering::Relaxed)
    }

    /// Bytes copied host -> device so far
    pub fn bytes_to_device(&self) -> u64 {
        self.to_device.load(Ordering::Relaxed)
    }
}

impl DeviceTransfer for SimulatedDevice {
    unsafe fn copy_to_host(&self, src: NonNull<u8>, dst: &mut [u8]) {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr(), dst.len());
        self.to_host.fetch_add(dst.len() as u64, Ordering::Relaxed);
    }

    unsafe fn copy_to_device(&self, src: &[u8], dst: NonNull<u8>) {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), src.len());
        self.to_device.fetch_add(src.len() as u64, Ordering::Relaxed);
    }
}

/// One device allocation, 8-byte aligned for every element type
struct DeviceBuffer {
    words: Vec<u64>,
}

impl DeviceBuffer {
    fn with_len(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes.div_ceil(8)],
        }
    }

    fn ptr(&mut self) -> NonNull<u8> {
        // SAFETY: Vec::as_mut_ptr is never null
        unsafe { NonNull::new_unchecked(self.words.as_mut_ptr().cast::<u8>()) }
    }
}

/// Device-memory local data
pub struct DeviceLocalData<K: SystemArrays> {
    store: Arc<RwLock<ArrayStore<K>>>,
    device: Arc<SimulatedDevice>,
    guard: Option<ScopeGuard<K>>,
    buffers: Vec<DeviceBuffer>,
    bases: Vec<NonNull<u8>>,
    extent: (usize, usize),
    fetches: usize,
}

impl<K: SystemArrays> DeviceLocalData<K> {
    /// Fails with [`EngineError::NoDevice`] when the state has no device
    pub fn new(state: &State) -> Result<Self, EngineError> {
        let device = state.device().cloned().ok_or(EngineError::NoDevice)?;
        Ok(Self {
            store: Arc::clone(K::store(state)),
            device,
            guard: None,
            buffers: Vec::new(),
            bases: Vec::new(),
            extent: (0, 0),
            fetches: 0,
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    pub fn device(&self) -> &Arc<SimulatedDevice> {
        &self.device
    }
}

impl<K: SystemArrays> LocalData<K> for DeviceLocalData<K> {
    fn location(&self) -> MemoryLocation {
        MemoryLocation::Device
    }

    fn enter(&mut self) -> Result<(), EngineError> {
        if self.guard.is_some() {
            return Err(EngineError::AlreadyInScope(K::ENTITY));
        }

        let guard = lock_store(&self.store)?;
        self.extent = (guard.n_local(), guard.n_ghost());

        let mut buffers = Vec::with_capacity(K::ALL.len());
        let mut bases = Vec::with_capacity(K::ALL.len());
        for &array in K::ALL {
            let host = guard.column_bytes(array);
            let mut buffer = DeviceBuffer::with_len(host.len());
            let base = buffer.ptr();
            // SAFETY: `base` is a fresh allocation of at least host.len() bytes
            unsafe { self.device.copy_to_device(host, base) };
            buffers.push(buffer);
            bases.push(base);
        }

        self.buffers = buffers;
        self.bases = bases;
        self.guard = Some(guard);

        debug!(
            "Entered device {} scope (n_local={}, n_ghost={})",
            K::ENTITY,
            self.extent.0,
            self.extent.1
        );
        Ok(())
    }

    fn exit(&mut self) -> Result<(), EngineError> {
        let mut guard = self.guard.take().ok_or(EngineError::NotInScope(K::ENTITY))?;

        for &array in K::ALL.iter().filter(|array| !array.read_only()) {
            let base = self.bases[array.index()];
            let host = guard.column_bytes_mut(array);
            // SAFETY: the device buffers stay allocated until cleared below
            unsafe { self.device.copy_to_host(base, host) };
            trace!("Copied {} back to host", array.accessor_name());
        }

        self.bases.clear();
        self.buffers.clear();
        drop(guard);
        debug!("Exited device {} scope", K::ENTITY);
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
        // SAFETY: the device buffers mirror the locked store's columns
        Ok(unsafe { column_handle(base, array, flags, self.extent, MemoryLocation::Device) })
    }

    fn is_entered(&self) -> bool {
        self.guard.is_some()
    }

    fn transfer(&self) -> Option<Arc<dyn DeviceTransfer>> {
        Some(self.device.clone() as Arc<dyn DeviceTransfer>)
    }
}
