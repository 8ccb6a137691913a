//! Actions and operations
//!
//! An [`Action`] is user code that runs against a simulation state, usually
//! by opening a [`LocalSnapshot`](crate::LocalSnapshot) inside
//! [`Action::act`]. A [`CustomOperation`] wraps an action with a trigger and
//! a role (updater or analyzer) so a [`Simulation`](crate::Simulation) can
//! schedule it.
//!
//! # Example
//!
//! ```ignore
//! use snapview_core::action::{Action, ActionError, ActionFlags, Attachment};
//! use snapview_core::{LocalArray, LocalSnapshot};
//!
//! #[derive(Default)]
//! struct ZeroMomentum {
//!     attachment: Attachment,
//! }
//!
//! impl Action for ZeroMomentum {
//!     fn attach(&mut self, state: &State) -> Result<(), ActionError> {
//!         self.attachment.attach(state);
//!         Ok(())
//!     }
//!
//!     fn detach(&mut self) {
//!         self.attachment.detach();
//!     }
//!
//!     fn is_attached(&self) -> bool {
//!         self.attachment.is_attached()
//!     }
//!
//!     fn act(&mut self, _timestep: u64) -> Result<(), ActionError> {
//!         LocalSnapshot::scope(self.attachment.state()?, |snap| {
//!             snap.particles().fill("velocity", 0.0f64)?;
//!             Ok(())
//!         })
//!     }
//! }
//! ```

mod custom;
mod trigger;

use std::any::Any;

use bitflags::bitflags;
use serde_json::Value;

use snapview_engine::State;

use crate::access::AccessError;
use crate::config::CoreConfig;

pub use custom::{AttributeConflict, CustomOperation, OperationKind};
pub use trigger::Trigger;

bitflags! {
    /// Extra quantities an action needs the engine to compute
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActionFlags: u32 {
        /// Full pressure tensor
        const PRESSURE_TENSOR = 0x01;
        /// Rotational kinetic energy
        const ROTATIONAL_KINETIC_ENERGY = 0x02;
        /// Virial contribution of external fields
        const EXTERNAL_FIELD_VIRIAL = 0x04;
    }
}

/// Error type for actions and operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// `act` or a state accessor was called while detached
    #[error("Action is not attached to a simulation")]
    NotAttached,

    #[error(transparent)]
    Access(#[from] AccessError),

    /// Parameter exposed by both the operation and its action
    #[error("Parameter {0} is defined by both the operation and its action")]
    AttributeConflict(String),

    #[error("Unknown parameter {0}")]
    UnknownParam(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    /// Failure reported by user code
    #[error("{0}")]
    Failed(String),
}

/// User code run by a custom operation
pub trait Action {
    /// Quantities this action needs
    fn flags(&self) -> ActionFlags {
        ActionFlags::empty()
    }

    /// Bind to a simulation state
    fn attach(&mut self, state: &State) -> Result<(), ActionError>;

    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Run at `timestep`
    fn act(&mut self, timestep: u64) -> Result<(), ActionError>;

    /// Names accepted by [`param`](Self::param) and
    /// [`set_param`](Self::set_param)
    fn param_names(&self) -> &[&'static str] {
        &[]
    }

    fn param(&self, name: &str) -> Result<Value, ActionError> {
        Err(ActionError::UnknownParam(name.to_string()))
    }

    fn set_param(&mut self, name: &str, _value: Value) -> Result<(), ActionError> {
        Err(ActionError::UnknownParam(name.to_string()))
    }
}

/// The state an action is bound to
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    state: Option<State>,
}

impl Attachment {
    pub fn attach(&mut self, state: &State) {
        self.state = Some(state.clone());
    }

    pub fn detach(&mut self) {
        self.state = None;
    }

    pub fn is_attached(&self) -> bool {
        self.state.is_some()
    }

    /// Bound state, or [`ActionError::NotAttached`]
    pub fn state(&self) -> Result<&State, ActionError> {
        self.state.as_ref().ok_or(ActionError::NotAttached)
    }
}

/// A schedulable unit owned by a [`Simulation`](crate::Simulation)
pub trait Operation: Any {
    fn kind(&self) -> OperationKind;

    fn trigger(&self) -> Trigger;

    fn flags(&self) -> ActionFlags;

    fn attach(&mut self, state: &State) -> Result<(), ActionError>;

    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Run unconditionally at `timestep`
    fn run(&mut self, timestep: u64) -> Result<(), ActionError>;

    /// Pick up simulation-wide settings when added
    fn configure(&mut self, _config: &CoreConfig) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
