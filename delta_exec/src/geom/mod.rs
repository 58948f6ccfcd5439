//! # Geometric Model
//!
//! Closed form kinematics of the three arm delta mechanism. The inverse model (IGM) gives the
//! proximal arm angles needed to place the centre of the moving platform at a cartesian point, the
//! direct model (DGM) gives the platform position reached for a set of arm angles.
//!
//! The base frame has its origin at the centre of the motor plane with z pointing up, so every
//! reachable platform position has a negative z. Arms sit at 0, 120 and 240 degrees around z,
//! and an arm angle of zero means the proximal arm is horizontal.
//!
//! Both directions round their inputs and outputs to [`ROUND_DP`] decimal places, which makes
//! them deterministic on the rounded input and lets [`CachedGeometry`] memoise them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cached;
pub mod calib;
mod direct;
mod inverse;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt};

pub use cached::CachedGeometry;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of decimal places all geometric quantities are rounded to.
pub const ROUND_DP: i32 = 3;

/// Angular positions of the three arms around the base, in axis order.
///
/// Units: radians
pub const ARM_POSITIONS_RAD: [f64; 3] = [0.0, 2.0 * PI / 3.0, 4.0 * PI / 3.0];

/// Largest allowed out of plane swing of a distal parallelogram.
///
/// Units: degrees
pub const MAX_GAMMA_DEG: f64 = 40.0;

/// Allowed range of the elbow angle, the sum of the proximal arm angle and the parallelogram
/// angle.
///
/// Units: degrees
pub const ELBOW_RANGE_DEG: (f64, f64) = (30.0, 180.0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Dimensions of the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaGeometry {
    /// Length of the proximal (motor driven) arms.
    ///
    /// Units: meters
    pub proximal_length_m: f64,

    /// Length of the distal parallelograms.
    ///
    /// Units: meters
    pub distal_length_m: f64,

    /// Distance from the base centre to each motor axis, less the platform's own radius.
    ///
    /// Units: meters
    pub base_radius_m: f64,
}

/// Position of the centre of the moving platform in the base frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianPoint {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

/// The three proximal arm angles, in axis order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    pub a_rad: f64,
    pub b_rad: f64,
    pub c_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a geometric computation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeomError {
    #[error("The point cannot be reached by the mechanism")]
    DomainError,

    #[error("The inverse model is degenerate for this point")]
    Degenerate,

    #[error("The direct model is singular for these angles")]
    Singular,

    #[error("The pose would exceed a mechanical joint limit")]
    JointLimit,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DeltaGeometry {
    fn default() -> Self {
        Self {
            proximal_length_m: 0.091,
            distal_length_m: 0.166,
            base_radius_m: 0.100,
        }
    }
}

impl CartesianPoint {
    pub fn new(x_m: f64, y_m: f64, z_m: f64) -> Self {
        Self { x_m, y_m, z_m }
    }

    /// The point with every coordinate rounded to [`ROUND_DP`] places.
    pub fn rounded(&self) -> Self {
        Self {
            x_m: round(self.x_m),
            y_m: round(self.y_m),
            z_m: round(self.z_m),
        }
    }

    /// Horizontal (x-y plane) distance to another point.
    ///
    /// Units: meters
    pub fn planar_distance_to(&self, other: &CartesianPoint) -> f64 {
        ((self.x_m - other.x_m).powi(2) + (self.y_m - other.y_m).powi(2)).sqrt()
    }
}

impl fmt::Display for CartesianPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}) m",
            self.x_m, self.y_m, self.z_m
        )
    }
}

impl JointAngles {
    pub fn new(a_rad: f64, b_rad: f64, c_rad: f64) -> Self {
        Self {
            a_rad,
            b_rad,
            c_rad,
        }
    }

    pub fn from_array(angles_rad: [f64; 3]) -> Self {
        Self::new(angles_rad[0], angles_rad[1], angles_rad[2])
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.a_rad, self.b_rad, self.c_rad]
    }

    /// The angles converted to degrees, in axis order.
    pub fn as_degrees(&self) -> [f64; 3] {
        [
            self.a_rad.to_degrees(),
            self.b_rad.to_degrees(),
            self.c_rad.to_degrees(),
        ]
    }

    pub fn rounded(&self) -> Self {
        Self {
            a_rad: round(self.a_rad),
            b_rad: round(self.b_rad),
            c_rad: round(self.c_rad),
        }
    }
}

impl fmt::Display for JointAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deg = self.as_degrees();
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}] rad ([{:.1}, {:.1}, {:.1}] deg)",
            self.a_rad, self.b_rad, self.c_rad, deg[0], deg[1], deg[2]
        )
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn round(value: f64) -> f64 {
    util::maths::round_dp(value, ROUND_DP)
}
