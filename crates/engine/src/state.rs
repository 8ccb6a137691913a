//! Shared simulation state
//!
//! A [`State`] is a cheap, cloneable handle to the engine's entity stores.
//! Each entity kind sits behind its own lock so particle and bond scopes can
//! be open at the same time.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use snapview_sdk::{ArrayLayout, BondArray, ParticleArray};

use crate::device::SimulatedDevice;
use crate::error::EngineError;
use crate::store::ArrayStore;

/// Entity kinds whose arrays live in a [`State`]
pub trait SystemArrays: ArrayLayout {
    /// Entity kind name used in errors and logs
    const ENTITY: &'static str;

    /// Select this kind's store from the state
    fn store(state: &State) -> &Arc<RwLock<ArrayStore<Self>>>;
}

impl SystemArrays for ParticleArray {
    const ENTITY: &'static str = "particles";

    fn store(state: &State) -> &Arc<RwLock<ArrayStore<Self>>> {
        &state.particles
    }
}

impl SystemArrays for BondArray {
    const ENTITY: &'static str = "bonds";

    fn store(state: &State) -> &Arc<RwLock<ArrayStore<Self>>> {
        &state.bonds
    }
}

/// Handle to the engine's particle and bond data
#[derive(Clone)]
pub struct State {
    particles: Arc<RwLock<ArrayStore<ParticleArray>>>,
    bonds: Arc<RwLock<ArrayStore<BondArray>>>,
    device: Option<Arc<SimulatedDevice>>,
}

impl State {
    /// Create a host-only state
    pub fn new(particles: ArrayStore<ParticleArray>, bonds: ArrayStore<BondArray>) -> Self {
        Self {
            particles: Arc::new(RwLock::new(particles)),
            bonds: Arc::new(RwLock::new(bonds)),
            device: None,
        }
    }

    /// State with particles only
    pub fn from_particles(particles: ArrayStore<ParticleArray>) -> Self {
        Self::new(particles, ArrayStore::new(0, 0))
    }

    /// Make device memory available to this state
    pub fn with_device(mut self, device: Arc<SimulatedDevice>) -> Self {
        self.device = Some(device);
        self
    }

    /// Device backing device-memory access, if any
    pub fn device(&self) -> Option<&Arc<SimulatedDevice>> {
        self.device.as_ref()
    }

    /// Read particle data outside of a local access scope
    pub fn particles(&self) -> Result<RwLockReadGuard<'_, ArrayStore<ParticleArray>>, EngineError> {
        self.read::<ParticleArray>()
    }

    /// Modify particle data outside of a local access scope
    pub fn particles_mut(
        &self,
    ) -> Result<RwLockWriteGuard<'_, ArrayStore<ParticleArray>>, EngineError> {
        self.write::<ParticleArray>()
    }

    /// Read bond data outside of a local access scope
    pub fn bonds(&self) -> Result<RwLockReadGuard<'_, ArrayStore<BondArray>>, EngineError> {
        self.read::<BondArray>()
    }

    /// Modify bond data outside of a local access scope
    pub fn bonds_mut(&self) -> Result<RwLockWriteGuard<'_, ArrayStore<BondArray>>, EngineError> {
        self.write::<BondArray>()
    }

    /// Non-blocking read of any entity store
    ///
    /// Fails with [`EngineError::Busy`] while a local access scope holds it.
    pub fn read<K: SystemArrays>(&self) -> Result<RwLockReadGuard<'_, ArrayStore<K>>, EngineError> {
        K::store(self).try_read().ok_or(EngineError::Busy(K::ENTITY))
    }

    /// Non-blocking write of any entity store
    pub fn write<K: SystemArrays>(
        &self,
    ) -> Result<RwLockWriteGuard<'_, ArrayStore<K>>, EngineError> {
        K::store(self).try_write().ok_or(EngineError::Busy(K::ENTITY))
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("particles", &format_args!("{:p}", Arc::as_ptr(&self.particles)))
            .field("bonds", &format_args!("{:p}", Arc::as_ptr(&self.bonds)))
            .field("device", &self.device.is_some())
            .finish()
    }
}
