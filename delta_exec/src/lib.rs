//! # Delta library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the delta robot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator console command parsing
pub mod console;

/// Geometric model - converts between platform positions and arm angles
pub mod geom;

/// Mode manager - sequences the game modes and drives the robot
pub mod mode_mgr;

/// Push button and indicator lamps
pub mod panel;

/// Paths played back by the robot
pub mod path;

/// Player pointer and screen mapping
pub mod pointer;

/// Robot control - sends axis commands and tracks the robot's pose
pub mod robot_ctrl;
