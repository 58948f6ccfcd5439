//! Parameters structure for RobotCtrl

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::{
    can::{codec::PositionProfile, IdProfile},
    eqpt::axis::NUM_AXES,
};

use crate::geom::CartesianPoint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the robot controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotCtrlParams {
    // ---- ADDRESSING ----
    /// Addressing profile of the bus, shared by motor and encoder boards.
    pub id_profile: IdProfile,

    /// Framing of position commands expected by the motor boards' firmware.
    #[serde(default = "default_position_profile")]
    pub position_profile: PositionProfile,

    /// Arbitration IDs of the motor boards, in axis order.
    pub motor_ids: [u32; NUM_AXES],

    /// Arbitration IDs of the encoder boards, in axis order.
    pub encoder_ids: [u32; NUM_AXES],

    // ---- CAPABILITIES ----
    /// Lowest angle the motor boards will be commanded to.
    ///
    /// Units: degrees
    #[serde(default = "default_min_axis_angle_deg")]
    pub min_axis_angle_deg: f64,

    /// Highest angle the motor boards will be commanded to.
    ///
    /// Units: degrees
    #[serde(default = "default_max_axis_angle_deg")]
    pub max_axis_angle_deg: f64,

    /// Region the platform is allowed to be moved within.
    pub op_space: OperationalSpace,
}

/// An axis aligned box of the base frame.
///
/// Units: meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalSpace {
    pub x_min_m: f64,
    pub x_max_m: f64,
    pub y_min_m: f64,
    pub y_max_m: f64,
    pub z_min_m: f64,
    pub z_max_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RobotCtrlParams {
    fn default() -> Self {
        Self {
            id_profile: IdProfile::Extended,
            position_profile: default_position_profile(),
            motor_ids: [0x11, 0x12, 0x13],
            encoder_ids: [0x01, 0x02, 0x03],
            min_axis_angle_deg: default_min_axis_angle_deg(),
            max_axis_angle_deg: default_max_axis_angle_deg(),
            op_space: OperationalSpace::default(),
        }
    }
}

impl Default for OperationalSpace {
    fn default() -> Self {
        Self {
            x_min_m: -0.05,
            x_max_m: 0.05,
            y_min_m: -0.05,
            y_max_m: 0.05,
            z_min_m: -0.17,
            z_max_m: -0.10,
        }
    }
}

impl OperationalSpace {
    /// Returns true if the point is inside the box, bounds included.
    pub fn contains(&self, point: &CartesianPoint) -> bool {
        (self.x_min_m..=self.x_max_m).contains(&point.x_m)
            && (self.y_min_m..=self.y_max_m).contains(&point.y_m)
            && (self.z_min_m..=self.z_max_m).contains(&point.z_m)
    }

    /// The point of the box closest to `point`.
    pub fn clamp(&self, point: &CartesianPoint) -> CartesianPoint {
        use util::maths::clamp;

        CartesianPoint::new(
            clamp(point.x_m, self.x_min_m, self.x_max_m),
            clamp(point.y_m, self.y_min_m, self.y_max_m),
            clamp(point.z_m, self.z_min_m, self.z_max_m),
        )
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_position_profile() -> PositionProfile {
    PositionProfile::Tagged
}

fn default_min_axis_angle_deg() -> f64 {
    -100.0
}

fn default_max_axis_angle_deg() -> f64 {
    30.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_op_space() {
        let space = OperationalSpace::default();

        assert!(space.contains(&CartesianPoint::new(0.0, 0.0, -0.13)));
        assert!(space.contains(&CartesianPoint::new(0.05, -0.05, -0.10)));
        assert!(!space.contains(&CartesianPoint::new(0.0, 0.0, 0.0)));
        assert!(!space.contains(&CartesianPoint::new(0.051, 0.0, -0.13)));

        assert_eq!(
            space.clamp(&CartesianPoint::new(0.2, -0.01, 0.0)),
            CartesianPoint::new(0.05, -0.01, -0.10)
        );
    }

    #[test]
    fn test_params_from_toml() {
        let params: RobotCtrlParams = util::params::from_str(
            r#"
            id_profile = "Standard"
            motor_ids = [16, 17, 18]
            encoder_ids = [1, 2, 3]

            [op_space]
            x_min_m = -0.04
            x_max_m = 0.04
            y_min_m = -0.04
            y_max_m = 0.04
            z_min_m = -0.16
            z_max_m = -0.10
            "#,
        )
        .unwrap();

        assert_eq!(params.id_profile, IdProfile::Standard);
        assert_eq!(params.position_profile, PositionProfile::Tagged);
        assert_eq!(params.motor_ids, [16, 17, 18]);
        assert_eq!(params.op_space.x_max_m, 0.04);
    }
}
