use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snack_data::args::SetVariableOp;
use thiserror::Error;

/// Identifies one self-switch of one concrete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelfSwitchKey {
    pub map_id: i32,
    pub room_id: i32,
    pub event_id: i32,
    pub id: i32,
}

impl fmt::Display for SelfSwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.map_id, self.room_id, self.event_id, self.id
        )
    }
}

impl FromStr for SelfSwitchKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(':').collect();
        let [map_id, room_id, event_id, id] = parts.as_slice() else {
            return Err(format!("self switch key {value:?} needs four fields"));
        };
        let parse = |field: &str| {
            field
                .parse::<i32>()
                .map_err(|err| format!("self switch key {value:?}: {err}"))
        };
        Ok(Self {
            map_id: parse(*map_id)?,
            room_id: parse(*room_id)?,
            event_id: parse(*event_id)?,
            id: parse(*id)?,
        })
    }
}

// Encoded as "map:room:event:id" so the map stays string-keyed in every
// format.
impl Serialize for SelfSwitchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SelfSwitchKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Switches and variables. Unset entries read as false / 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variables {
    switches: BTreeMap<i32, bool>,
    internal_switches: BTreeMap<i32, bool>,
    variables: BTreeMap<i32, i64>,
    internal_variables: BTreeMap<i32, i64>,
    self_switches: BTreeMap<SelfSwitchKey, bool>,
}

impl Variables {
    pub fn switch_value(&self, id: i32) -> bool {
        self.switches.get(&id).copied().unwrap_or(false)
    }

    pub fn set_switch_value(&mut self, id: i32, value: bool) {
        self.switches.insert(id, value);
    }

    /// Switches reserved for the host (title menus and the like).
    pub fn internal_switch_value(&self, id: i32) -> bool {
        self.internal_switches.get(&id).copied().unwrap_or(false)
    }

    pub fn set_internal_switch_value(&mut self, id: i32, value: bool) {
        self.internal_switches.insert(id, value);
    }

    pub fn variable_value(&self, id: i32) -> i64 {
        self.variables.get(&id).copied().unwrap_or(0)
    }

    pub fn set_variable_value(&mut self, id: i32, value: i64) {
        self.variables.insert(id, value);
    }

    pub fn internal_variable_value(&self, id: i32) -> i64 {
        self.internal_variables.get(&id).copied().unwrap_or(0)
    }

    pub fn set_internal_variable_value(&mut self, id: i32, value: i64) {
        self.internal_variables.insert(id, value);
    }

    pub fn self_switch_value(&self, key: SelfSwitchKey) -> bool {
        self.self_switches.get(&key).copied().unwrap_or(false)
    }

    pub fn set_self_switch_value(&mut self, key: SelfSwitchKey, value: bool) {
        self.self_switches.insert(key, value);
    }

    /// Reads a variable id stored in another variable.
    pub fn variable_ref_value(&self, id: i32) -> i64 {
        self.variable_value(ref_id(self.variable_value(id)))
    }

    pub fn switch_ref_value(&self, id: i32) -> bool {
        self.switch_value(ref_id(self.variable_value(id)))
    }
}

/// Narrows a variable value used as an id. Out-of-range values map to an id
/// that is never set.
pub(crate) fn ref_id(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
}

/// Combines the current value with the resolved right-hand side. Integer
/// division truncates toward zero; overflow wraps.
pub fn apply_op(op: SetVariableOp, lhs: i64, rhs: i64) -> Result<i64, ArithmeticFault> {
    match op {
        SetVariableOp::Assign => Ok(rhs),
        SetVariableOp::Add => Ok(lhs.wrapping_add(rhs)),
        SetVariableOp::Sub => Ok(lhs.wrapping_sub(rhs)),
        SetVariableOp::Mul => Ok(lhs.wrapping_mul(rhs)),
        SetVariableOp::Div if rhs == 0 => Err(ArithmeticFault::DivisionByZero),
        SetVariableOp::Div => Ok(lhs.wrapping_div(rhs)),
        SetVariableOp::Mod if rhs == 0 => Err(ArithmeticFault::ModuloByZero),
        SetVariableOp::Mod => Ok(lhs.wrapping_rem(rhs)),
    }
}
