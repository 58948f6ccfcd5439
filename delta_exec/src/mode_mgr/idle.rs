//! # [`Idle`] mode implementation
//!
//! Homes the axes the first time it runs (if a homing voltage is configured), moves the robot to
//! the working height, parks it and waits for the panel button.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use std::time::Instant;

use super::{ModeKind, ModeMgrParams, ModeMgrPersistentData, StepInput, StepOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Idle {
    entered: bool,
    phase: IdlePhase,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum IdlePhase {
    /// Waiting for the homing commanded at the given time to complete.
    Homing { since: Instant },

    /// Waiting for the robot to reach the working height, commanded at the given time.
    Settling { since: Instant },

    /// Parked, waiting for the button.
    Parked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Idle {
    pub fn new() -> Self {
        Self {
            entered: false,
            phase: IdlePhase::Parked,
        }
    }

    pub fn step(
        &mut self,
        params: &ModeMgrParams,
        persistent: &mut ModeMgrPersistentData,
        input: &StepInput,
    ) -> StepOutput {
        if !self.entered {
            self.entered = true;
            persistent.set_indicators(false, false);

            self.phase = match params.homing_voltage_v {
                Some(voltage_v) if !persistent.homed => {
                    info!("Homing all axes at {:.2} V", voltage_v);
                    let failures = persistent.robot.move_home_all(voltage_v);
                    if !failures.is_empty() {
                        warn!("Homing not sent to axes {}", failures);
                    }
                    IdlePhase::Homing { since: input.now }
                }
                _ => self.start_settling(params, persistent, input.now),
            };
        }

        // The button is always read so that presses made while the robot is moving are dropped
        let pressed = persistent.panel.button_pressed();

        match self.phase {
            IdlePhase::Homing { since } => {
                if secs_since(since, input.now) >= params.homing_s {
                    persistent.homed = true;
                    self.phase = self.start_settling(params, persistent, input.now);
                }
            }
            IdlePhase::Settling { since } => {
                if secs_since(since, input.now) >= params.settle_s {
                    let retract = persistent.retract_point;
                    persistent.move_to(&retract);
                    self.phase = IdlePhase::Parked;
                    info!("Robot parked, waiting for the button");
                }
            }
            IdlePhase::Parked => {
                if pressed {
                    info!("Button pressed, starting a round");
                    return StepOutput::transition(ModeKind::RobotFollows);
                }
            }
        }

        StepOutput::none()
    }

    fn start_settling(
        &self,
        params: &ModeMgrParams,
        persistent: &mut ModeMgrPersistentData,
        now: Instant,
    ) -> IdlePhase {
        let working = persistent.working_point(params);
        persistent.move_to(&working);

        IdlePhase::Settling { since: now }
    }
}

fn secs_since(since: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(since).as_secs_f64()
}

#[cfg(test)]
mod test {
    use super::super::test_utils::*;
    use super::*;
    use crate::geom::CartesianPoint;

    #[test]
    fn test_idle_sequence() {
        let params = ModeMgrParams {
            settle_s: 2.0,
            ..Default::default()
        };
        let mut h = harness(params, ModeKind::Idle, false);

        h.step_at(0.0);
        let working = h.angles_for(CartesianPoint::new(0.0, 0.0, -0.13));
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], working);

        // Still settling
        h.step_at(1.0);
        assert!(h.take_moves().is_empty());

        h.step_at(2.0);
        let retract = h.angles_for(h.mgr.persistent.retract_point);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], retract);

        // Parked robots aren't sent anything more
        h.step_at(10.0);
        assert!(h.take_moves().is_empty());
        assert_eq!(h.mgr.mode(), ModeKind::Idle);
    }

    #[test]
    fn test_idle_homing_once() {
        let params = ModeMgrParams {
            homing_voltage_v: Some(2.5),
            homing_s: 3.0,
            settle_s: 1.0,
            robot_follows_duration_s: 1.0,
            user_follows_duration_s: 1.0,
            ..Default::default()
        };
        let mut h = harness(params, ModeKind::Idle, false);

        h.step_at(0.0);
        assert_eq!(h.bus.sent_frames().len(), 3);
        assert!(h.take_moves().is_empty());
        assert!(!h.mgr.persistent.homed);

        h.step_at(3.0);
        assert!(h.mgr.persistent.homed);
        assert_eq!(h.take_moves().len(), 1);

        // Run a round and come back, Idle must not home again
        h.step_at(4.0);
        h.panel.press();
        h.step_at(4.1);
        assert_eq!(h.mgr.mode(), ModeKind::RobotFollows);
        h.step_at(4.2);
        h.step_at(5.3);
        h.step_at(5.4);
        h.step_at(6.5);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);

        h.bus.clear_sent();
        h.step_at(6.6);
        let working = h.angles_for(CartesianPoint::new(0.0, 0.0, -0.13));
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], working);
    }
}
