//! Scope liveness tokens
//!
//! Every open scope gets a fresh [`ScopeToken`]. Views hold a clone and check
//! it before every access; the accessor revokes it on exit. The token also
//! tracks a scope-wide borrow state so two views over the same engine memory
//! (`position` and `position_with_ghosts`, say) never hand out a mutable
//! slice while any other slice is alive.
//!
//! A scope dropped from inside a view callback is revoked at once, but its
//! engine release is parked on the token and runs when the last borrow ends.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::error::ScopeViolation;

/// Borrow state: 0 free, >0 shared count, -1 exclusive
type BorrowFlag = isize;

const EXCLUSIVE: BorrowFlag = -1;

/// Engine release waiting for outstanding borrows
type Release = Box<dyn FnOnce()>;

struct ScopeState {
    live: Cell<bool>,
    borrow: Cell<BorrowFlag>,
    deferred: Cell<Option<Release>>,
}

/// Shared liveness flag for one scope instance
#[derive(Clone)]
pub struct ScopeToken(Rc<ScopeState>);

impl ScopeToken {
    /// Token for a newly opened scope
    pub(crate) fn open() -> Self {
        Self(Rc::new(ScopeState {
            live: Cell::new(true),
            borrow: Cell::new(0),
            deferred: Cell::new(None),
        }))
    }

    /// Whether the owning scope is still open
    pub fn is_live(&self) -> bool {
        self.0.live.get()
    }

    /// Whether both tokens belong to the same scope instance
    pub fn same_scope(&self, other: &ScopeToken) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Mark the scope closed
    ///
    /// Fails without closing while a view callback is running.
    pub(crate) fn revoke(&self) -> Result<(), ScopeViolation> {
        if self.0.borrow.get() != 0 {
            return Err(ScopeViolation::BorrowedAtExit);
        }
        self.0.live.set(false);
        Ok(())
    }

    /// Mark the scope closed regardless of outstanding borrows
    ///
    /// A running callback keeps its slice; only new accesses fail.
    pub(crate) fn force_revoke(&self) {
        self.0.live.set(false);
    }

    /// Whether a view callback is running
    pub(crate) fn is_borrowed(&self) -> bool {
        self.0.borrow.get() != 0
    }

    /// Run `release` now, or once the last outstanding borrow ends
    pub(crate) fn release_when_unborrowed(&self, release: Release) {
        if self.is_borrowed() {
            self.0.deferred.set(Some(release));
        } else {
            release();
        }
    }

    /// Begin a read of scope memory
    pub(crate) fn shared(&self, label: &str) -> Result<ScopeBorrow<'_>, ScopeViolation> {
        self.check_live(label)?;
        let flag = self.0.borrow.get();
        if flag == EXCLUSIVE {
            return Err(ScopeViolation::Aliased(label.to_string()));
        }
        self.0.borrow.set(flag + 1);
        Ok(ScopeBorrow {
            state: &self.0,
            exclusive: false,
        })
    }

    /// Begin a write of scope memory
    pub(crate) fn exclusive(&self, label: &str) -> Result<ScopeBorrow<'_>, ScopeViolation> {
        self.check_live(label)?;
        if self.0.borrow.get() != 0 {
            return Err(ScopeViolation::Aliased(label.to_string()));
        }
        self.0.borrow.set(EXCLUSIVE);
        Ok(ScopeBorrow {
            state: &self.0,
            exclusive: true,
        })
    }

    pub(crate) fn check_live(&self, label: &str) -> Result<(), ScopeViolation> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ScopeViolation::Expired(label.to_string()))
        }
    }
}

impl fmt::Debug for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeToken")
            .field("scope", &Rc::as_ptr(&self.0))
            .field("live", &self.0.live.get())
            .field("borrow", &self.0.borrow.get())
            .finish()
    }
}

/// Outstanding borrow of scope memory, released on drop
pub(crate) struct ScopeBorrow<'a> {
    state: &'a ScopeState,
    exclusive: bool,
}

impl Drop for ScopeBorrow<'_> {
    fn drop(&mut self) {
        if self.exclusive {
            self.state.borrow.set(0);
        } else {
            self.state.borrow.set(self.state.borrow.get() - 1);
        }
        if self.state.borrow.get() == 0 && !self.state.live.get() {
            if let Some(release) = self.state.deferred.take() {
                release();
            }
        }
    }
}
