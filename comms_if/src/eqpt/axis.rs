//! # Axis Equipment Definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of actuated axes on the robot.
pub const NUM_AXES: usize = 3;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of the three proximal-arm axes, at 0, 120 and 240 degrees around the base.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum AxisId {
    A,
    B,
    C,
}

/// Constants of a motor board's position controller, numbered as on the wire.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum PidConstant {
    P = 0,
    I = 1,
    D = 2,
    Tau = 3,
}

/// A decoded motor-board command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisCommand {
    /// Move to an absolute angle.
    ///
    /// Units: degrees
    Position { angle_deg: f64 },

    /// Drive against the homing reference with the given voltage.
    ///
    /// Units: volts
    Homing { voltage_v: f64 },

    /// Set one controller constant.
    SetConstant { constant: PidConstant, value: f64 },
}

#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid PID constant index (expected 0 to 3)")]
pub struct InvalidConstantIndex(pub u8);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AxisId {
    /// All axes in wire/bit order.
    pub const ALL: [AxisId; NUM_AXES] = [AxisId::A, AxisId::B, AxisId::C];

    /// Index of the axis, also its bit position in failure masks.
    pub fn index(self) -> usize {
        match self {
            AxisId::A => 0,
            AxisId::B => 1,
            AxisId::C => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisId::A => write!(f, "A"),
            AxisId::B => write!(f, "B"),
            AxisId::C => write!(f, "C"),
        }
    }
}

impl TryFrom<u8> for PidConstant {
    type Error = InvalidConstantIndex;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PidConstant::P),
            1 => Ok(PidConstant::I),
            2 => Ok(PidConstant::D),
            3 => Ok(PidConstant::Tau),
            v => Err(InvalidConstantIndex(v)),
        }
    }
}
