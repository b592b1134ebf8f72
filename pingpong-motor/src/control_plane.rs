//! Control-plane variable store
//!
//! The feeder is driven remotely through four named variables. The
//! [`VariableStore`] trait is the seam to whatever key-value service hosts
//! them; [`InMemoryVariableStore`] is the local implementation.

use crate::error::MotorError;
use crate::state::ActuatorState;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const ENABLED: &str = "enabled";
pub const SPEED_PERCENT: &str = "speedPercent";
pub const MIN_ANGLE: &str = "minAngle";
pub const MAX_ANGLE: &str = "maxAngle";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl VariableValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of a numeric value; floats are rounded
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            VariableValue::Integer(i) => Some(*i),
            VariableValue::Float(f) if f.is_finite() => Some(f.round() as i64),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VariableValue::Bool(_) => "bool",
            VariableValue::Integer(_) => "integer",
            VariableValue::Float(_) => "float",
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Bool(b) => write!(f, "{}", b),
            VariableValue::Integer(i) => write!(f, "{}", i),
            VariableValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Key-value access to the control variables
pub trait VariableStore: Send + Sync {
    fn read_variable(&self, name: &str) -> Result<VariableValue, MotorError>;

    fn write_variable(&self, name: &str, value: VariableValue) -> Result<(), MotorError>;

    /// All variables, sorted by name
    fn variables(&self) -> Vec<(String, VariableValue)>;
}

/// Variables held in process memory.
///
/// Only registered names can be written, and a write must keep the kind of
/// the registered value: booleans stay booleans, numbers stay numbers.
#[derive(Debug, Default)]
pub struct InMemoryVariableStore {
    variables: RwLock<BTreeMap<String, VariableValue>>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the four feeder variables registered from `state`
    pub fn with_actuator_state(state: &ActuatorState) -> Self {
        let store = Self::new();
        store.register(ENABLED, VariableValue::Bool(state.enabled));
        store.register(SPEED_PERCENT, VariableValue::Integer(state.speed_percent as i64));
        store.register(MIN_ANGLE, VariableValue::Integer(state.min_angle as i64));
        store.register(MAX_ANGLE, VariableValue::Integer(state.max_angle as i64));
        store
    }

    pub fn register(&self, name: &str, value: VariableValue) {
        self.variables.write().insert(name.to_string(), value);
    }
}

impl VariableStore for InMemoryVariableStore {
    fn read_variable(&self, name: &str) -> Result<VariableValue, MotorError> {
        self.variables
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| MotorError::UnknownVariable(name.to_string()))
    }

    fn write_variable(&self, name: &str, value: VariableValue) -> Result<(), MotorError> {
        let mut variables = self.variables.write();
        let slot = variables
            .get_mut(name)
            .ok_or_else(|| MotorError::UnknownVariable(name.to_string()))?;

        let coerced = match (*slot, value) {
            (VariableValue::Bool(_), VariableValue::Bool(_)) => value,
            (VariableValue::Integer(_), VariableValue::Integer(_)) => value,
            (VariableValue::Float(_), VariableValue::Float(_)) => value,
            (VariableValue::Integer(_), VariableValue::Float(f)) if f.is_finite() => {
                VariableValue::Integer(f.round() as i64)
            }
            (VariableValue::Float(_), VariableValue::Integer(i)) => VariableValue::Float(i as f64),
            (current, _) => {
                return Err(MotorError::Validation(format!(
                    "Variable '{}' holds a {}, cannot write {} value {}",
                    name,
                    current.kind(),
                    value.kind(),
                    value
                )))
            }
        };
        *slot = coerced;
        Ok(())
    }

    fn variables(&self) -> Vec<(String, VariableValue)> {
        self.variables
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

/// Read the four feeder variables into an [`ActuatorState`].
///
/// The speed is clamped to 0..=100 and angles are read as integers.
pub fn read_actuator_state(store: &dyn VariableStore) -> Result<ActuatorState, MotorError> {
    let enabled = store
        .read_variable(ENABLED)?
        .as_bool()
        .ok_or_else(|| MotorError::ControlPlane(format!("'{}' is not a boolean", ENABLED)))?;

    let integer = |name: &str| -> Result<i64, MotorError> {
        store
            .read_variable(name)?
            .as_i64()
            .ok_or_else(|| MotorError::ControlPlane(format!("'{}' is not a number", name)))
    };

    let speed_percent = integer(SPEED_PERCENT)?.clamp(0, 100) as u8;
    let min_angle = integer(MIN_ANGLE)?.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    let max_angle = integer(MAX_ANGLE)?.clamp(i32::MIN as i64, i32::MAX as i64) as i32;

    Ok(ActuatorState {
        enabled,
        speed_percent,
        min_angle,
        max_angle,
    })
}
