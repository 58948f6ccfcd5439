//! # Communications interface crate.
//!
//! Provides the CAN bus protocol spoken between the controller and the motor-driver and encoder
//! boards of the delta robot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Identifiers and command definitions for robot equipment (axes, PID constants)
pub mod eqpt;

/// CAN framing, transports and the bus link
pub mod can;
