//! # ModeMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::pointer::{PointerKind, ScreenArea};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeMgrParams {
    // ---- ROBOT POSITIONS ----
    /// Height of the working plane, just above the screen.
    ///
    /// Units: meters
    pub working_height_m: f64,

    /// Arm angle at which the robot is retracted clear of the screen, on the centre column.
    ///
    /// Units: degrees
    pub retract_arm_angle_deg: f64,

    /// Time given to the robot to reach the working height before retracting in Idle.
    ///
    /// Units: seconds
    pub settle_s: f64,

    /// Voltage used to home the axes the first time Idle is entered. No homing if unset.
    ///
    /// Units: volts
    #[serde(default)]
    pub homing_voltage_v: Option<f64>,

    /// Time allowed for homing to complete.
    ///
    /// Units: seconds
    #[serde(default)]
    pub homing_s: f64,

    // ---- SCREEN ----
    pub screen: ScreenArea,

    pub pointer_kind: PointerKind,

    /// Radius of the disc of the working plane the robot is kept within.
    ///
    /// Units: meters
    pub usable_radius_m: f64,

    /// Pointer movement below which the robot is not sent a new target.
    ///
    /// Units: pixels
    pub pointer_deadband_px: f64,

    // ---- ROUNDS ----
    /// Units: seconds
    pub robot_follows_duration_s: f64,

    /// Units: seconds
    pub user_follows_duration_s: f64,

    /// Pointer to robot distance above which the player has escaped the robot in RobotFollows.
    ///
    /// Units: pixels
    pub user_wins_distance_px: f64,

    /// Pointer to robot distance above which the player has lost the robot in UserFollows.
    ///
    /// Units: pixels
    pub robot_wins_distance_px: f64,

    // ---- PATH PLAYBACK ----
    /// Time between the first two waypoints.
    ///
    /// Units: seconds
    pub path_initial_interval_s: f64,

    /// Factor applied to the interval after each waypoint.
    pub path_interval_decay: f64,

    /// Shortest interval between waypoints.
    ///
    /// Units: seconds
    pub path_min_interval_s: f64,

    /// Restart the path from its beginning once finished, rather than holding the last point.
    pub path_wrap: bool,
}

/// A parameter outside the range the modes can work with.
#[derive(Debug, thiserror::Error)]
#[error("Invalid ModeMgr parameter {name}: {reason}")]
pub struct InvalidParam {
    pub name: &'static str,
    pub reason: &'static str,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ModeMgrParams {
    /// Check the parameters the mode timers depend on.
    pub fn validate(&self) -> Result<(), InvalidParam> {
        let checks = [
            (
                "path_initial_interval_s",
                self.path_initial_interval_s > 0.0,
                "must be positive",
            ),
            (
                "path_min_interval_s",
                self.path_min_interval_s > 0.0,
                "must be positive",
            ),
            (
                "path_interval_decay",
                self.path_interval_decay > 0.0 && self.path_interval_decay <= 1.0,
                "must be in (0, 1]",
            ),
            (
                "pointer_deadband_px",
                self.pointer_deadband_px >= 0.0,
                "must not be negative",
            ),
            (
                "usable_radius_m",
                self.usable_radius_m > 0.0,
                "must be positive",
            ),
        ];

        // Comparisons with NaN are false, so NaN fails too
        match checks.iter().find(|(_, ok, _)| !ok) {
            Some(&(name, _, reason)) => Err(InvalidParam { name, reason }),
            None => Ok(()),
        }
    }
}

impl Default for ModeMgrParams {
    fn default() -> Self {
        Self {
            working_height_m: -0.13,
            retract_arm_angle_deg: -40.0,
            settle_s: 1.0,
            homing_voltage_v: None,
            homing_s: 0.0,
            screen: ScreenArea::default(),
            pointer_kind: PointerKind::Mouse,
            usable_radius_m: 0.04,
            pointer_deadband_px: 5.0,
            robot_follows_duration_s: 30.0,
            user_follows_duration_s: 30.0,
            user_wins_distance_px: 200.0,
            robot_wins_distance_px: 200.0,
            path_initial_interval_s: 0.5,
            path_interval_decay: 0.98,
            path_min_interval_s: 0.05,
            path_wrap: true,
        }
    }
}
