//! Local snapshots
//!
//! A [`Snapshot`] is the scope manager for one state: it opens particle and
//! bond access together, and closes both on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use snapview_core::{LocalArray, LocalSnapshot};
//!
//! LocalSnapshot::scope(&state, |snap| {
//!     let position = snap.particles().get("position")?;
//!     let ghosts = snap.particles().get("ghost_position")?;
//!     snap.particles().fill("velocity", 0.0f64)?;
//!     Ok::<_, snapview_core::AccessError>(position.len() + ghosts.len())
//! })?;
//! ```

use tracing::{debug, error};

use snapview_engine::State;
use snapview_sdk::{BondArray, ParticleArray};

use crate::access::{
    AccessError, AccessResult, ArrayBackend, BondFields, Device, Host, LocalAccess,
    ParticleFields, ScopeViolation,
};

/// Particle accessor for backend `B`
pub type ParticleAccess<B> =
    LocalAccess<ParticleFields, <B as ArrayBackend>::Source<ParticleArray>, B>;

/// Bond accessor for backend `B`
pub type BondAccess<B> = LocalAccess<BondFields, <B as ArrayBackend>::Source<BondArray>, B>;

/// Host-memory snapshot
pub type LocalSnapshot = Snapshot<Host>;

/// Device-memory snapshot
pub type LocalSnapshotGpu = Snapshot<Device>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Open,
    Finished,
}

/// Single-use scope over a state's local data
pub struct Snapshot<B: ArrayBackend> {
    particles: ParticleAccess<B>,
    bonds: BondAccess<B>,
    phase: Phase,
}

impl<B: ArrayBackend> Snapshot<B> {
    /// Bind to `state` without opening
    pub fn new(state: &State) -> AccessResult<Self> {
        Ok(Self {
            particles: LocalAccess::new(B::source::<ParticleArray>(state)?),
            bonds: LocalAccess::new(B::source::<BondArray>(state)?),
            phase: Phase::Ready,
        })
    }

    /// Open a snapshot, run `body`, and close it again
    ///
    /// The snapshot is closed even when `body` fails; the body's error wins
    /// over any error from closing, which is logged.
    pub fn scope<T, E>(state: &State, body: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<AccessError>,
    {
        let mut snapshot = Self::new(state)?;
        snapshot.enter()?;
        let result = body(&mut snapshot);
        let closed = snapshot.exit();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close)) => {
                error!("Failed to close local snapshot after body error: {}", close);
                Err(e)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// Open particle and bond access
    pub fn enter(&mut self) -> AccessResult<()> {
        match self.phase {
            Phase::Open => return Err(ScopeViolation::AlreadyOpen("snapshot").into()),
            Phase::Finished => return Err(ScopeViolation::Finished.into()),
            Phase::Ready => {}
        }

        self.particles.enter()?;
        if let Err(e) = self.bonds.enter() {
            if let Err(rollback) = self.particles.exit() {
                error!("Failed to roll back particle access: {}", rollback);
            }
            return Err(e);
        }

        self.phase = Phase::Open;
        debug!("Entered local snapshot");
        Ok(())
    }

    /// Close particle and bond access
    ///
    /// If one side cannot close yet (a view callback is running), the other
    /// side still closes and the snapshot stays open until a later exit
    /// succeeds.
    pub fn exit(&mut self) -> AccessResult<()> {
        if self.phase != Phase::Open {
            return Err(ScopeViolation::NotOpen.into());
        }

        let particles = if self.particles.is_open() {
            self.particles.exit()
        } else {
            Ok(())
        };
        let bonds = if self.bonds.is_open() {
            self.bonds.exit()
        } else {
            Ok(())
        };

        if !self.particles.is_open() && !self.bonds.is_open() {
            self.phase = Phase::Finished;
            debug!("Exited local snapshot");
        }
        particles.and(bonds)
    }

    /// Particle local access
    pub fn particles(&mut self) -> &mut ParticleAccess<B> {
        &mut self.particles
    }

    /// Bond local access
    pub fn bonds(&mut self) -> &mut BondAccess<B> {
        &mut self.bonds
    }
}

impl<B: ArrayBackend> Drop for Snapshot<B> {
    fn drop(&mut self) {
        // each accessor closes itself, after any running callback returns
        if self.phase == Phase::Open {
            error!("Local snapshot dropped while open; closing");
            self.phase = Phase::Finished;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::LocalArray;
    use snapview_engine::{ArrayStore, EngineError, SimulatedDevice};
    use std::rc::Rc;

    const POSITIONS: [f64; 15] = [
        0.0, 0.1, 0.2, // local 0
        1.0, 1.1, 1.2, // local 1
        2.0, 2.1, 2.2, // local 2
        3.0, 3.1, 3.2, // ghost 0
        4.0, 4.1, 4.2, // ghost 1
    ];

    /// Three local particles followed by two ghosts
    fn state() -> State {
        let mut particles = ArrayStore::<ParticleArray>::new(3, 2);
        particles.set(ParticleArray::Position, &POSITIONS).unwrap();
        particles.set(ParticleArray::Tag, &[10u32, 11, 12, 13, 14]).unwrap();
        let mut bonds = ArrayStore::<BondArray>::new(1, 1);
        bonds.set(BondArray::Members, &[0u32, 1, 2, 3]).unwrap();
        State::new(particles, bonds)
    }

    #[test]
    fn test_local_ghost_and_combined_positions() {
        let state = state();
        LocalSnapshot::scope(&state, |snap| {
            let local = snap.particles().get("position")?;
            let ghost = snap.particles().get("ghost_position")?;
            let all = snap.particles().get("position_with_ghosts")?;
            assert_eq!((local.len(), ghost.len(), all.len()), (3, 2, 5));

            let local = local.to_vec::<f64>()?;
            let ghost = ghost.to_vec::<f64>()?;
            let all = all.to_vec::<f64>()?;
            assert_eq!(&all[..9], &local[..]);
            assert_eq!(&all[9..], &ghost[..]);
            assert_eq!(&all[..], &POSITIONS[..]);
            Ok::<_, AccessError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_tag_is_read_only_and_velocity_writes_through() {
        let state = state();
        let mut snap = LocalSnapshot::new(&state).unwrap();
        snap.enter().unwrap();

        let tags = snap.particles().get("tag").unwrap();
        assert_eq!(
            snap.particles().set("tag", &[0u32, 0, 0]),
            Err(AccessError::ReadOnlyField("tag".to_string()))
        );
        assert_eq!(tags.to_vec::<u32>().unwrap(), vec![10, 11, 12]);

        let velocity: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        snap.particles().set("velocity", &velocity).unwrap();
        let seen = snap
            .particles()
            .get("velocity_with_ghosts")
            .unwrap()
            .read(|all: &[f64]| all[..9].to_vec())
            .unwrap();
        assert_eq!(seen, velocity);

        snap.exit().unwrap();
        let particles = state.particles().unwrap();
        assert_eq!(particles.local::<f64>(ParticleArray::Velocity).unwrap(), &velocity);
        assert_eq!(particles.get::<u32>(ParticleArray::Tag).unwrap(), &[10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_bonds_share_the_scope() {
        let state = state();
        LocalSnapshot::scope(&state, |snap| {
            let group = snap.bonds().get("group_with_ghosts")?;
            assert_eq!(group.shape(), (2, 2));
            assert_eq!(group.row::<u32>(1)?, vec![2, 3]);
            assert_eq!(
                snap.bonds().fill("ghost_rtag", 0u32),
                Err(AccessError::ReadOnlyField("ghost_rtag".to_string()))
            );
            assert!(matches!(
                snap.bonds().get("position"),
                Err(AccessError::FieldNotFound { entity: "bonds", .. })
            ));
            Ok::<_, AccessError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_snapshot_is_single_use() {
        let state = state();
        let mut snap = LocalSnapshot::new(&state).unwrap();
        snap.enter().unwrap();
        assert_eq!(
            snap.enter(),
            Err(AccessError::ScopeViolation(ScopeViolation::AlreadyOpen("snapshot")))
        );
        let view = snap.particles().get("mass").unwrap();
        snap.exit().unwrap();

        assert!(!view.is_valid());
        assert_eq!(
            snap.exit(),
            Err(AccessError::ScopeViolation(ScopeViolation::NotOpen))
        );
        assert_eq!(
            snap.enter(),
            Err(AccessError::ScopeViolation(ScopeViolation::Finished))
        );
        assert!(state.particles().is_ok());
    }

    #[test]
    fn test_scope_closes_on_error() {
        let state = state();
        let mut escaped = None;
        let result = LocalSnapshot::scope(&state, |snap| {
            escaped = Some(snap.particles().get("charge")?);
            snap.particles().get("spin")?;
            Ok::<_, AccessError>(())
        });
        assert!(matches!(result, Err(AccessError::FieldNotFound { .. })));

        let escaped = escaped.unwrap();
        assert!(!escaped.is_valid());
        assert!(escaped.to_vec::<f64>().is_err());
        assert!(state.particles_mut().is_ok());
    }

    #[test]
    fn test_concurrent_snapshot_is_busy() {
        let state = state();
        let mut first = LocalSnapshot::new(&state).unwrap();
        first.enter().unwrap();

        let mut second = LocalSnapshot::new(&state).unwrap();
        assert!(matches!(second.enter(), Err(AccessError::EngineFetch(_))));
        assert!(!second.is_open());
        first.exit().unwrap();
    }

    #[test]
    fn test_drop_releases_engine() {
        let state = state();
        {
            let mut snap = LocalSnapshot::new(&state).unwrap();
            snap.enter().unwrap();
            assert!(state.particles().is_err());
        }
        assert!(state.particles().is_ok());
        assert!(state.bonds().is_ok());
    }

    #[test]
    fn test_reentered_access_yields_fresh_views() {
        let state = state();
        let first = LocalSnapshot::scope(&state, |snap| snap.particles().get("image")).unwrap();
        let second = LocalSnapshot::scope(&state, |snap| snap.particles().get("image")).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(!first.is_valid() && !second.is_valid());
    }

    #[test]
    fn test_gpu_snapshot_requires_device() {
        let state = state();
        assert_eq!(
            LocalSnapshotGpu::new(&state).err(),
            Some(AccessError::EngineFetch(snapview_engine::EngineError::NoDevice))
        );
    }

    #[test]
    fn test_gpu_snapshot_stages_and_writes_back() {
        let device = SimulatedDevice::new();
        let state = state().with_device(device.clone());

        LocalSnapshotGpu::scope(&state, |snap| {
            let ghost = snap.particles().get("ghost_position")?;
            let interface = ghost.array_interface()?;
            assert_eq!(interface.shape, vec![2, 3]);
            assert_eq!(ghost.to_vec::<f64>()?, POSITIONS[9..].to_vec());

            snap.particles().fill("charge", -1.0f64)?;
            assert_eq!(
                snap.particles().set("net_virial", &[0.0f64; 18]),
                Err(AccessError::ReadOnlyField("net_virial".to_string()))
            );
            Ok::<_, AccessError>(())
        })
        .unwrap();

        assert!(device.bytes_to_device() > 0);
        assert!(device.bytes_to_host() > 0);
        let particles = state.particles().unwrap();
        assert_eq!(particles.local::<f64>(ParticleArray::Charge).unwrap(), &[-1.0; 3]);
        assert_eq!(particles.get::<f64>(ParticleArray::Position).unwrap(), &POSITIONS);
    }

    #[test]
    fn test_drop_inside_read_keeps_engine_locked() {
        let state = state();
        let engine = state.clone();
        let mut snap = LocalSnapshot::new(&state).unwrap();
        snap.enter().unwrap();
        let position = snap.particles().get("position").unwrap();

        let (locked, values) = position
            .read(move |values: &[f64]| {
                drop(snap);
                let locked = matches!(engine.particles_mut(), Err(EngineError::Busy(_)));
                (locked, values.to_vec())
            })
            .unwrap();

        assert!(locked);
        assert_eq!(values, POSITIONS[..9].to_vec());
        assert!(!position.is_valid());
        assert!(state.particles_mut().is_ok());
        assert!(state.bonds_mut().is_ok());
    }

    #[test]
    fn test_body_error_wins_over_close_error() {
        let state = state();
        let result = LocalSnapshot::scope(&state, |snap| {
            snap.exit()?;
            Err::<(), _>(AccessError::ReadOnlyField("tag".to_string()))
        });
        assert_eq!(result, Err(AccessError::ReadOnlyField("tag".to_string())));
        assert!(state.particles_mut().is_ok());
    }

    #[test]
    fn test_write_inside_read_is_aliased_across_columns() {
        let state = state();
        LocalSnapshot::scope(&state, |snap| {
            let position = snap.particles().get("position")?;
            let nested = position.read(|_: &[f64]| snap.particles().fill("velocity", 1.0f64))?;
            assert_eq!(
                nested,
                Err(AccessError::ScopeViolation(ScopeViolation::Aliased(
                    "velocity".to_string()
                )))
            );
            snap.particles().fill("velocity", 1.0f64)?;
            Ok::<_, AccessError>(())
        })
        .unwrap();
    }
}
