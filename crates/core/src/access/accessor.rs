//! The generic local access accessor

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use snapview_engine::{Element, LocalData};

use super::array::LocalArray;
use super::backend::ArrayBackend;
use super::error::{AccessError, AccessResult, ScopeViolation};
use super::registry::FieldRegistry;
use super::resolve::resolve;
use super::token::ScopeToken;

/// Resolves field names to views of one entity kind's engine arrays
///
/// Views are only handed out while a scope is open and are cached by the
/// exact request name, so repeated requests return the same [`Rc`].
/// Exiting the scope invalidates every view and empties the cache.
///
/// Dropping an open accessor invalidates its views at once. If a view
/// callback is still running, the engine scope stays held until it returns.
pub struct LocalAccess<R, S, B>
where
    R: FieldRegistry,
    S: LocalData<R::Key> + 'static,
    B: ArrayBackend,
{
    data: ManuallyDrop<S>,
    cache: HashMap<String, Rc<B::Array>>,
    token: Option<ScopeToken>,
    _marker: PhantomData<(R, B)>,
}

impl<R, S, B> LocalAccess<R, S, B>
where
    R: FieldRegistry,
    S: LocalData<R::Key> + 'static,
    B: ArrayBackend,
{
    pub fn new(data: S) -> Self {
        Self {
            data: ManuallyDrop::new(data),
            cache: HashMap::new(),
            token: None,
            _marker: PhantomData,
        }
    }

    pub fn entity(&self) -> &'static str {
        R::ENTITY
    }

    /// Engine data source
    pub fn source(&self) -> &S {
        &self.data
    }

    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    /// Token of the open scope, if any
    pub fn token(&self) -> Option<&ScopeToken> {
        self.token.as_ref()
    }

    /// Number of views resolved in the open scope
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Base field names this accessor understands
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        R::names()
    }

    /// Open a scope
    pub fn enter(&mut self) -> AccessResult<()> {
        if self.token.is_some() {
            return Err(ScopeViolation::AlreadyOpen(R::ENTITY).into());
        }
        let location = self.data.location();
        if location != B::LOCATION {
            return Err(AccessError::LocationMismatch {
                name: R::ENTITY.to_string(),
                location,
            });
        }
        self.data.enter()?;
        self.token = Some(ScopeToken::open());
        debug!("Opened local access to {}", R::ENTITY);
        Ok(())
    }

    /// Close the scope, invalidating every view it produced
    ///
    /// Views are invalidated before the engine exit hook runs, so an engine
    /// error still leaves the accessor closed.
    pub fn exit(&mut self) -> AccessResult<()> {
        let token = self.token.as_ref().ok_or(ScopeViolation::NotOpen)?;
        token.revoke()?;
        self.token = None;
        self.cache.clear();
        self.data.exit()?;
        debug!("Closed local access to {}", R::ENTITY);
        Ok(())
    }

    /// Resolve `name` to a view
    ///
    /// `name` is a registered field, optionally with a `ghost_` prefix
    /// (ghost rows) or a `_with_ghosts` suffix (local then ghost rows).
    pub fn get(&mut self, name: &str) -> AccessResult<Rc<B::Array>> {
        let token = self.token.as_ref().ok_or(ScopeViolation::NotOpen)?;

        if let Some(view) = self.cache.get(name) {
            trace!("Cache hit for {}.{}", R::ENTITY, name);
            return Ok(Rc::clone(view));
        }

        let (key, mode) = resolve::<R>(name)?;
        let buffer = self.data.fetch(key, mode.flags())?;
        let view = Rc::new(B::wrap(
            name.to_string(),
            buffer,
            token.clone(),
            self.data.transfer(),
        )?);

        debug!(
            "Resolved {}.{} ({:?}, {} rows)",
            R::ENTITY,
            name,
            mode,
            buffer.rows()
        );
        self.cache.insert(name.to_string(), Rc::clone(&view));
        Ok(view)
    }

    /// Overwrite every element of `name`
    ///
    /// Fails with [`AccessError::ReadOnlyField`] before any mutation when the
    /// engine marks the buffer read-only.
    pub fn set<T: Element>(&mut self, name: &str, values: &[T]) -> AccessResult<()> {
        let view = self.get(name)?;
        if view.is_read_only() {
            return Err(AccessError::ReadOnlyField(name.to_string()));
        }
        view.assign(values)
    }

    /// Set every element of `name` to `value`
    pub fn fill<T: Element>(&mut self, name: &str, value: T) -> AccessResult<()> {
        let view = self.get(name)?;
        if view.is_read_only() {
            return Err(AccessError::ReadOnlyField(name.to_string()));
        }
        view.fill(value)
    }
}

impl<R, S, B> Drop for LocalAccess<R, S, B>
where
    R: FieldRegistry,
    S: LocalData<R::Key> + 'static,
    B: ArrayBackend,
{
    fn drop(&mut self) {
        self.cache.clear();
        // SAFETY: `data` is never touched again after this
        let mut data = unsafe { ManuallyDrop::take(&mut self.data) };
        let Some(token) = self.token.take() else {
            return;
        };

        warn!("Local access to {} dropped while open; closing", R::ENTITY);
        token.force_revoke();
        if token.is_borrowed() {
            debug!("Deferring {} engine exit until the running callback returns", R::ENTITY);
        }
        let entity = R::ENTITY;
        token.release_when_unborrowed(Box::new(move || {
            if let Err(e) = data.exit() {
                error!("Engine exit hook for {} failed during cleanup: {}", entity, e);
            }
        }));
    }
}

impl<R, S, B> fmt::Debug for LocalAccess<R, S, B>
where
    R: FieldRegistry,
    S: LocalData<R::Key> + 'static,
    B: ArrayBackend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccess")
            .field("entity", &R::ENTITY)
            .field("location", &B::LOCATION)
            .field("open", &self.token.is_some())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessMode, Device, Host, HostArray, ParticleFields};
    use snapview_engine::EngineError;
    use snapview_sdk::{ArrayLayout, BufferHandle, GhostFlags, MemoryLocation, ParticleArray};
    use std::ptr::NonNull;

    const N_LOCAL: usize = 2;
    const N_GHOST: usize = 1;

    /// Engine stand-in that records every fetch
    struct CountingData {
        memory: Box<[u64; 64]>,
        entered: bool,
        fetches: Vec<(ParticleArray, GhostFlags)>,
    }

    impl CountingData {
        fn new() -> Self {
            Self {
                memory: Box::new([0; 64]),
                entered: false,
                fetches: Vec::new(),
            }
        }
    }

    impl LocalData<ParticleArray> for CountingData {
        fn location(&self) -> MemoryLocation {
            MemoryLocation::Host
        }

        fn enter(&mut self) -> Result<(), EngineError> {
            self.entered = true;
            Ok(())
        }

        fn exit(&mut self) -> Result<(), EngineError> {
            self.entered = false;
            Ok(())
        }

        fn fetch(
            &mut self,
            array: ParticleArray,
            flags: GhostFlags,
        ) -> Result<BufferHandle, EngineError> {
            if !self.entered {
                return Err(EngineError::NotInScope("particles"));
            }
            self.fetches.push((array, flags));
            let ptr = NonNull::new(self.memory.as_mut_ptr().cast::<u8>())
                .ok_or(EngineError::Unsupported("null"))?;
            let rows = flags.row_range(N_LOCAL, N_GHOST).len();
            Ok(unsafe {
                BufferHandle::from_raw_parts(
                    ptr,
                    rows,
                    array.width(),
                    array.dtype(),
                    array.read_only(),
                    MemoryLocation::Host,
                )
            })
        }

        fn is_entered(&self) -> bool {
            self.entered
        }
    }

    type Access = LocalAccess<ParticleFields, CountingData, Host>;

    fn open() -> Access {
        let mut access = Access::new(CountingData::new());
        access.enter().unwrap();
        access
    }

    #[test]
    fn test_repeated_reads_share_one_view_and_one_fetch() {
        let mut access = open();
        let names: Vec<_> = ParticleFields::names().collect();
        for name in &names {
            let first = access.get(name).unwrap();
            let second = access.get(name).unwrap();
            assert!(Rc::ptr_eq(&first, &second), "{name} resolved twice");
        }
        assert_eq!(access.source().fetches.len(), names.len());
        assert_eq!(access.cached(), names.len());
    }

    #[test]
    fn test_variants_pass_matching_flags() {
        let mut access = open();
        for (name, array) in ParticleFields::FIELDS {
            for mode in AccessMode::ALL {
                let request = mode.request_name(name);
                access.get(&request).unwrap();
                assert_eq!(
                    access.source().fetches.last(),
                    Some(&(*array, mode.flags())),
                    "{request}"
                );
            }
        }
        let last = access.get("ghost_position").unwrap();
        assert_eq!(last.len(), N_GHOST);
    }

    #[test]
    fn test_unregistered_field_variants_fail() {
        let mut access = open();
        for mode in AccessMode::ALL {
            let name = mode.request_name("spin");
            assert!(matches!(
                access.get(&name),
                Err(AccessError::FieldNotFound { entity: "particles", .. })
            ));
        }
        assert!(access.source().fetches.is_empty());
    }

    #[test]
    fn test_access_outside_scope() {
        let mut access = Access::new(CountingData::new());
        assert_eq!(
            access.get("position").unwrap_err(),
            AccessError::ScopeViolation(ScopeViolation::NotOpen)
        );
        assert!(access.source().fetches.is_empty());
    }

    #[test]
    fn test_double_enter_and_stray_exit() {
        let mut access = Access::new(CountingData::new());
        assert_eq!(
            access.exit().unwrap_err(),
            AccessError::ScopeViolation(ScopeViolation::NotOpen)
        );
        access.enter().unwrap();
        assert_eq!(
            access.enter().unwrap_err(),
            AccessError::ScopeViolation(ScopeViolation::AlreadyOpen("particles"))
        );
        access.exit().unwrap();
        assert!(!access.source().is_entered());
    }

    #[test]
    fn test_exit_invalidates_and_clears_cache() {
        let mut access = open();
        let before = access.get("velocity").unwrap();
        access.exit().unwrap();
        assert!(!before.is_valid());
        assert_eq!(access.cached(), 0);

        access.enter().unwrap();
        let after = access.get("velocity").unwrap();
        assert!(after.is_valid());
        assert!(!Rc::ptr_eq(&before, &after));
        assert!(!before.token().same_scope(after.token()));
        assert!(!before.is_valid());
    }

    #[test]
    fn test_read_only_set_rejected_before_write() {
        let mut access = open();
        access.memory_mut()[0] = 42;
        assert_eq!(
            access.set("net_force", &[1.0f64; 6]),
            Err(AccessError::ReadOnlyField("net_force".to_string()))
        );
        assert_eq!(
            access.fill("ghost_tag", 0u32),
            Err(AccessError::ReadOnlyField("ghost_tag".to_string()))
        );
        assert_eq!(access.memory_mut()[0], 42);
    }

    #[test]
    fn test_exit_from_view_callback_is_rejected() {
        let mut access = open();
        let view: Rc<HostArray> = access.get("mass").unwrap();
        let inner = view
            .read(|_: &[f64]| access.exit())
            .unwrap();
        assert_eq!(
            inner,
            Err(AccessError::ScopeViolation(ScopeViolation::BorrowedAtExit))
        );
        assert!(access.is_open());
        access.exit().unwrap();
    }

    #[test]
    fn test_drop_closes_engine_scope() {
        let mut access = open();
        let view = access.get("charge").unwrap();
        drop(access);
        assert!(!view.is_valid());
    }

    #[test]
    fn test_enter_rejects_source_in_wrong_memory() {
        let mut access = LocalAccess::<ParticleFields, CountingData, Device>::new(CountingData::new());
        assert_eq!(
            access.enter(),
            Err(AccessError::LocationMismatch {
                name: "particles".to_string(),
                location: MemoryLocation::Host,
            })
        );
        assert!(!access.is_open());
        assert!(!access.source().is_entered());
    }

    #[test]
    fn test_drop_inside_callback_expires_views() {
        let mut access = open();
        let view: Rc<HostArray> = access.get("mass").unwrap();
        let other = access.get("charge").unwrap();
        let seen = view
            .read(move |values: &[f64]| {
                drop(access);
                (values.len(), other.is_valid())
            })
            .unwrap();
        assert_eq!(seen, (N_LOCAL, false));
        assert!(!view.is_valid());
    }

    impl Access {
        fn memory_mut(&mut self) -> &mut [u64; 64] {
            &mut self.data.memory
        }
    }
}
