//! # Defines Telemetry Pack for the ModeMgr

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::CartesianPoint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of the mode manager's state, for the renderer and the session archive.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModeTm {
    pub mode: ModeKind,

    /// Seconds since the current mode was entered.
    pub mode_elapsed_s: f64,

    pub outcome: Option<Outcome>,

    /// Outcome of the last round finished, kept across mode changes.
    pub last_round: Option<Outcome>,

    pub robot_leads: bool,
    pub user_leads: bool,

    /// Last pose computed from the encoders.
    pub pose: Option<CartesianPoint>,

    /// Last target successfully commanded.
    pub target: Option<CartesianPoint>,

    pub pointer_px: Option<(f64, f64)>,
    pub robot_px: Option<(f64, f64)>,

    /// Index of the next path waypoint during playback.
    pub path_index: Option<usize>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    RobotFollows,
    UserFollows,
    TestConsole,
}

/// Result of a competitive round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    UserWins,
    RobotWins,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ModeKind {
    fn default() -> Self {
        ModeKind::Idle
    }
}

impl std::str::FromStr for ModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "idle" => Ok(ModeKind::Idle),
            "robot-follows" => Ok(ModeKind::RobotFollows),
            "user-follows" => Ok(ModeKind::UserFollows),
            "test-console" | "console" => Ok(ModeKind::TestConsole),
            _ => Err(format!(
                "Unknown mode \"{}\", expected idle, robot-follows, user-follows or test-console",
                s
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mode_kind_from_str() {
        assert_eq!("robot-follows".parse::<ModeKind>(), Ok(ModeKind::RobotFollows));
        assert_eq!("User_Follows".parse::<ModeKind>(), Ok(ModeKind::UserFollows));
        assert_eq!("console".parse::<ModeKind>(), Ok(ModeKind::TestConsole));
        assert!("attract".parse::<ModeKind>().is_err());
    }
}
