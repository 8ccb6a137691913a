//! Custom operations

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use snapview_engine::State;

use super::{Action, ActionError, ActionFlags, Operation, Trigger};
use crate::config::CoreConfig;

/// Name of the operation's own trigger parameter
const TRIGGER_PARAM: &str = "trigger";

/// When an operation runs within a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Modifies the state; runs after analyzers
    Updater,
    /// Observes the state; runs first
    Analyzer,
}

/// How a parameter name exposed by both an operation and its action resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeConflict {
    /// The operation's own parameter shadows the action's
    #[default]
    PreferOperation,
    /// The action's parameter shadows the operation's
    PreferAction,
    /// Access fails with [`ActionError::AttributeConflict`]
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Operation,
    Action,
}

/// An [`Action`] scheduled by a trigger
#[derive(Debug)]
pub struct CustomOperation<A> {
    kind: OperationKind,
    trigger: Trigger,
    action: A,
    conflict: Option<AttributeConflict>,
    configured: AttributeConflict,
}

impl<A: Action> CustomOperation<A> {
    pub fn new(kind: OperationKind, trigger: Trigger, action: A) -> Self {
        Self {
            kind,
            trigger,
            action,
            conflict: None,
            configured: AttributeConflict::default(),
        }
    }

    pub fn updater(trigger: Trigger, action: A) -> Self {
        Self::new(OperationKind::Updater, trigger, action)
    }

    pub fn analyzer(trigger: Trigger, action: A) -> Self {
        Self::new(OperationKind::Analyzer, trigger, action)
    }

    /// Override the configured conflict policy for this operation
    pub fn with_conflict_policy(mut self, policy: AttributeConflict) -> Self {
        self.conflict = Some(policy);
        self
    }

    pub fn conflict_policy(&self) -> AttributeConflict {
        self.conflict.unwrap_or(self.configured)
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn action_mut(&mut self) -> &mut A {
        &mut self.action
    }

    pub fn into_action(self) -> A {
        self.action
    }

    pub fn set_trigger(&mut self, trigger: Trigger) {
        self.trigger = trigger;
    }

    fn target(&self, name: &str) -> Result<Target, ActionError> {
        if name != TRIGGER_PARAM {
            return Ok(Target::Action);
        }
        let action_has = self.action.param_names().contains(&name);
        match (action_has, self.conflict_policy()) {
            (false, _) | (true, AttributeConflict::PreferOperation) => Ok(Target::Operation),
            (true, AttributeConflict::PreferAction) => Ok(Target::Action),
            (true, AttributeConflict::Reject) => {
                Err(ActionError::AttributeConflict(name.to_string()))
            }
        }
    }

    /// Read a parameter of the operation or, failing that, of its action
    pub fn param(&self, name: &str) -> Result<Value, ActionError> {
        match self.target(name)? {
            Target::Operation => Ok(self.trigger.to_value()),
            Target::Action => self.action.param(name),
        }
    }

    /// Set a parameter of the operation or, failing that, of its action
    pub fn set_param(&mut self, name: &str, value: Value) -> Result<(), ActionError> {
        match self.target(name)? {
            Target::Operation => {
                self.trigger = Trigger::from_value(value)?;
                debug!("Trigger set to {:?}", self.trigger);
                Ok(())
            }
            Target::Action => self.action.set_param(name, value),
        }
    }
}

impl<A: Action + 'static> Operation for CustomOperation<A> {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn trigger(&self) -> Trigger {
        self.trigger
    }

    fn flags(&self) -> ActionFlags {
        self.action.flags()
    }

    fn attach(&mut self, state: &State) -> Result<(), ActionError> {
        self.action.attach(state)
    }

    fn detach(&mut self) {
        self.action.detach();
    }

    fn is_attached(&self) -> bool {
        self.action.is_attached()
    }

    fn run(&mut self, timestep: u64) -> Result<(), ActionError> {
        if !self.action.is_attached() {
            return Err(ActionError::NotAttached);
        }
        self.action.act(timestep)
    }

    fn configure(&mut self, config: &CoreConfig) {
        self.configured = config.attribute_conflict;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
