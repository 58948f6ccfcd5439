//! # Test console commands
//!
//! The operator console takes one command per line. The first character selects the command and
//! the rest of the line is a comma separated list of numbers:
//!
//! | Line              | Command                                           |
//! |-------------------|---------------------------------------------------|
//! | `p x,y,z`         | Move the platform to a point (m)                  |
//! | `c`               | Centre the platform at working height             |
//! | `f x,y`           | Move in the working plane (m)                     |
//! | `a a,b,c`         | Move the axes to angles (deg)                     |
//! | `h axis,voltage`  | Home one axis (axis is 0 to 2, or A to C)         |
//! | `h voltage`       | Home all axes                                     |
//! | `k axis,idx,val`  | Set PID constant `idx` (0 P, 1 I, 2 D, 3 Tau)     |
//! | `k idx,val`       | Set a PID constant on all axes                    |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::eqpt::axis::{AxisId, InvalidConstantIndex, PidConstant};

use crate::geom::CartesianPoint;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCmd {
    MoveBase(CartesianPoint),
    Centre,
    MovePlane { x_m: f64, y_m: f64 },
    MoveAxes { angles_deg: [f64; 3] },
    Home { axis: Option<AxisId>, voltage_v: f64 },
    SetConstant {
        axis: Option<AxisId>,
        constant: PidConstant,
        value: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleParseError {
    #[error("Unknown command '{0}', expected one of p, c, f, a, h, k")]
    UnknownCommand(char),

    #[error("Command '{cmd}' takes {expected} arguments, found {found}")]
    WrongArgCount {
        cmd: char,
        expected: &'static str,
        found: usize,
    },

    #[error("\"{0}\" is not a number")]
    InvalidNumber(String),

    #[error("\"{0}\" is not an axis, expected 0 to 2 or A to C")]
    InvalidAxis(String),

    #[error("{0}")]
    InvalidConstant(InvalidConstantIndex),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse one console line. Blank lines give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCmd>, ConsoleParseError> {
    let line = line.trim();

    let mut chars = line.chars();
    let cmd = match chars.next() {
        Some(c) => c.to_ascii_lowercase(),
        None => return Ok(None),
    };

    let args: Vec<&str> = chars
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();

    let cmd = match (cmd, args.len()) {
        ('p', 3) => ConsoleCmd::MoveBase(CartesianPoint::new(
            number(args[0])?,
            number(args[1])?,
            number(args[2])?,
        )),
        ('c', 0) => ConsoleCmd::Centre,
        ('f', 2) => ConsoleCmd::MovePlane {
            x_m: number(args[0])?,
            y_m: number(args[1])?,
        },
        ('a', 3) => ConsoleCmd::MoveAxes {
            angles_deg: [number(args[0])?, number(args[1])?, number(args[2])?],
        },
        ('h', 1) => ConsoleCmd::Home {
            axis: None,
            voltage_v: number(args[0])?,
        },
        ('h', 2) => ConsoleCmd::Home {
            axis: Some(axis(args[0])?),
            voltage_v: number(args[1])?,
        },
        ('k', 2) => ConsoleCmd::SetConstant {
            axis: None,
            constant: constant(args[0])?,
            value: number(args[1])?,
        },
        ('k', 3) => ConsoleCmd::SetConstant {
            axis: Some(axis(args[0])?),
            constant: constant(args[1])?,
            value: number(args[2])?,
        },
        (c, found) => {
            let expected = match c {
                'p' | 'a' => "3",
                'c' => "0",
                'f' => "2",
                'h' => "1 or 2",
                'k' => "2 or 3",
                _ => return Err(ConsoleParseError::UnknownCommand(c)),
            };
            return Err(ConsoleParseError::WrongArgCount {
                cmd: c,
                expected,
                found,
            });
        }
    };

    Ok(Some(cmd))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn number(arg: &str) -> Result<f64, ConsoleParseError> {
    arg.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConsoleParseError::InvalidNumber(arg.into()))
}

fn axis(arg: &str) -> Result<AxisId, ConsoleParseError> {
    let axis = match arg.to_ascii_uppercase().as_str() {
        "A" => Some(AxisId::A),
        "B" => Some(AxisId::B),
        "C" => Some(AxisId::C),
        s => s.parse::<usize>().ok().and_then(AxisId::from_index),
    };

    axis.ok_or_else(|| ConsoleParseError::InvalidAxis(arg.into()))
}

fn constant(arg: &str) -> Result<PidConstant, ConsoleParseError> {
    let idx = arg
        .parse::<u8>()
        .map_err(|_| ConsoleParseError::InvalidNumber(arg.into()))?;

    PidConstant::try_from(idx).map_err(ConsoleParseError::InvalidConstant)
}
