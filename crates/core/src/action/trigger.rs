//! Periodic triggers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ActionError;

/// Fires every `period` steps starting at `phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    period: u64,
    #[serde(default)]
    phase: u64,
}

impl Trigger {
    /// Fire every `period` steps from timestep 0
    pub fn periodic(period: u64) -> Result<Self, ActionError> {
        Self::with_phase(period, 0)
    }

    pub fn with_phase(period: u64, phase: u64) -> Result<Self, ActionError> {
        if period == 0 {
            return Err(ActionError::InvalidParam {
                name: "trigger".to_string(),
                reason: "period must be positive".to_string(),
            });
        }
        Ok(Self { period, phase })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn phase(&self) -> u64 {
        self.phase
    }

    /// Whether the trigger fires at `timestep`
    pub fn fires(&self, timestep: u64) -> bool {
        timestep >= self.phase && (timestep - self.phase) % self.period == 0
    }

    /// Parameter value, `{"period": .., "phase": ..}`
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "period": self.period, "phase": self.phase })
    }

    /// Parse a parameter value
    ///
    /// Accepts a bare period or a `{"period", "phase"}` object.
    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        if let Some(period) = value.as_u64() {
            return Self::periodic(period);
        }
        let parsed: Trigger =
            serde_json::from_value(value).map_err(|e| ActionError::InvalidParam {
                name: "trigger".to_string(),
                reason: e.to_string(),
            })?;
        Self::with_phase(parsed.period, parsed.phase)
    }
}
