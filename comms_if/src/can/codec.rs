//! # Frame Codec
//!
//! Fixed 8-byte payload layouts exchanged with the motor-driver and encoder boards.
//!
//! Motor commands use a tagged fixed-point layout:
//!
//! | Byte | Position      | Homing        | SetConstant    |
//! |------|---------------|---------------|----------------|
//! | 0    | `0x03`        | `0x01`        | `0x02`         |
//! | 1    | sign          | sign          | constant index |
//! | 2    | integer (MSB) | integer (MSB) | sign           |
//! | 3    | integer (LSB) | integer (LSB) | integer (MSB)  |
//! | 4    | hundredths    | hundredths    | integer (LSB)  |
//! | 5    | `0`           | `0`           | hundredths     |
//! | 6-7  | `0`           | `0`           | `0`            |
//!
//! where sign is `0xFF` for negative values and `0x00` otherwise, integer is the integer part of
//! the magnitude and hundredths is the truncated (not rounded) fractional part. Encoder feedback
//! is a little-endian IEEE-754 double filling the whole payload.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use super::{Payload, PAYLOAD_LEN};
use crate::eqpt::axis::{AxisCommand, PidConstant};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Control type tag of a homing command
pub const CTRL_HOMING: u8 = 0x01;

/// Control type tag of a set-constant command
pub const CTRL_SET_CONSTANT: u8 = 0x02;

/// Control type tag of a position command
pub const CTRL_POSITION: u8 = 0x03;

const SIGN_NEGATIVE: u8 = 0xFF;
const SIGN_POSITIVE: u8 = 0x00;

/// Guards the hundredths truncation against binary representation error, e.g. `12.34 - 12.0`
/// being `0.33999...`.
const CENTI_EPSILON: f64 = 1e-6;

/// Largest magnitude representable in hundredths.
const MAX_CENTI: f64 = u16::MAX as f64 * 100.0 + 99.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The sign / integer / hundredths split of a value as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint {
    pub negative: bool,
    pub integer: u16,
    pub hundredths: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Layout of position commands expected by the installed motor firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionProfile {
    /// Control tag followed by sign, integer and hundredths.
    Tagged,

    /// Superseded layout: the angle as a little-endian double with no control tag.
    RawDouble,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FixedPoint {
    /// Split a value, truncating below hundredths and saturating the integer part at `u16::MAX`.
    ///
    /// `NaN` encodes as zero.
    pub fn from_f64(value: f64) -> Self {
        let centi = if value.is_nan() {
            0.0
        } else {
            (value.abs() * 100.0 + CENTI_EPSILON).floor().min(MAX_CENTI)
        };
        let centi = centi as u32;

        Self {
            negative: value < 0.0,
            integer: (centi / 100) as u16,
            hundredths: (centi % 100) as u8,
        }
    }

    pub fn to_f64(self) -> f64 {
        let magnitude = self.integer as f64 + self.hundredths as f64 / 100.0;

        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Write as sign, big-endian integer and hundredths into the first 4 bytes of `buf`.
    fn write(&self, buf: &mut [u8]) {
        buf[0] = if self.negative {
            SIGN_NEGATIVE
        } else {
            SIGN_POSITIVE
        };
        BigEndian::write_u16(&mut buf[1..3], self.integer);
        buf[3] = self.hundredths;
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            negative: buf[0] == SIGN_NEGATIVE,
            integer: BigEndian::read_u16(&buf[1..3]),
            hundredths: buf[3],
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a position command in the tagged layout.
pub fn encode_position(angle_deg: f64) -> Payload {
    tagged(CTRL_POSITION, angle_deg)
}

/// Encode a position command in the superseded raw-double layout.
pub fn encode_position_raw(angle: f64) -> Payload {
    let mut buf = [0u8; PAYLOAD_LEN];
    LittleEndian::write_f64(&mut buf, angle);
    buf
}

/// Encode a position command for the given firmware profile.
pub fn encode_position_with(profile: PositionProfile, angle_deg: f64) -> Payload {
    match profile {
        PositionProfile::Tagged => encode_position(angle_deg),
        PositionProfile::RawDouble => encode_position_raw(angle_deg),
    }
}

/// Encode a homing command.
pub fn encode_homing(voltage_v: f64) -> Payload {
    tagged(CTRL_HOMING, voltage_v)
}

/// Encode a command setting one constant of the board's position controller.
pub fn encode_set_constant(constant: PidConstant, value: f64) -> Payload {
    let mut buf = [0u8; PAYLOAD_LEN];
    buf[0] = CTRL_SET_CONSTANT;
    buf[1] = constant as u8;
    FixedPoint::from_f64(value).write(&mut buf[2..6]);
    buf
}

/// Decode a tagged command, or `None` if the tag or constant index is unknown.
pub fn decode_command(data: &Payload) -> Option<AxisCommand> {
    match data[0] {
        CTRL_POSITION => Some(AxisCommand::Position {
            angle_deg: FixedPoint::read(&data[1..5]).to_f64(),
        }),
        CTRL_HOMING => Some(AxisCommand::Homing {
            voltage_v: FixedPoint::read(&data[1..5]).to_f64(),
        }),
        CTRL_SET_CONSTANT => Some(AxisCommand::SetConstant {
            constant: PidConstant::try_from(data[1]).ok()?,
            value: FixedPoint::read(&data[2..6]).to_f64(),
        }),
        _ => None,
    }
}

/// Decode an encoder feedback payload into the reported angle.
pub fn decode_feedback(data: &Payload) -> f64 {
    LittleEndian::read_f64(data)
}

/// Encode an encoder feedback payload. Only encoder boards (or stand-ins for them) send these.
pub fn encode_feedback(angle: f64) -> Payload {
    encode_position_raw(angle)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn tagged(tag: u8, value: f64) -> Payload {
    let mut buf = [0u8; PAYLOAD_LEN];
    buf[0] = tag;
    FixedPoint::from_f64(value).write(&mut buf[1..5]);
    buf
}
