//! Scoped local access to engine arrays
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ LocalAccess<Registry, LocalData, Backend>                    │
//! │                                                              │
//! │  get("ghost_position")                                       │
//! │    ├─ cache hit? ──────────────────────────► Rc<View>        │
//! │    ├─ resolve: FieldRequest::parse → (Position, GhostOnly)   │
//! │    ├─ LocalData::fetch(Position, GHOST_ONLY) → BufferHandle  │
//! │    └─ Backend::wrap(handle, ScopeToken) ───► Rc<View>        │
//! │                                                              │
//! │  exit(): revoke ScopeToken → clear cache → engine exit hook  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Views never own the accessor. They hold a clone of the scope's
//! [`ScopeToken`], which the accessor revokes on exit.

mod accessor;
mod array;
mod backend;
mod device;
mod error;
mod fields;
mod registry;
mod resolve;
mod token;

pub use accessor::LocalAccess;
pub use array::{HostArray, LocalArray};
pub use backend::{ArrayBackend, Device, Host};
pub use device::{ArrayInterface, DeviceArray, ARRAY_INTERFACE_VERSION};
pub use error::{AccessError, AccessResult, ScopeViolation};
pub use fields::{BondFields, ParticleFields};
pub use registry::FieldRegistry;
pub use resolve::{resolve, AccessMode, FieldRequest, GHOST_PREFIX, WITH_GHOSTS_SUFFIX};
pub use token::ScopeToken;
