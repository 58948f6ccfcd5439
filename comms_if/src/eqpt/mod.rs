//! # Equipment Interface
//!
//! This module defines the identifiers and commands understood by the robot's boards.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod axis;
