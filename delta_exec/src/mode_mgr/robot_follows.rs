//! # [`RobotFollows`] mode implementation
//!
//! The robot chases the pointer across the working plane. If the player ever gets further than
//! `user_wins_distance_px` from the robot the round goes to the player, otherwise to the robot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};

use super::{ModeKind, ModeMgrParams, ModeMgrPersistentData, Outcome, StepInput, StepOutput};
use crate::pointer::distance_px;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct RobotFollows {
    entered: bool,

    /// Pointer position the robot was last sent towards, whether or not the move was accepted.
    last_commanded_px: Option<(f64, f64)>,

    user_won: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotFollows {
    pub fn new() -> Self {
        Self {
            entered: false,
            last_commanded_px: None,
            user_won: false,
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
            persistent.set_indicators(true, false);

            let working = persistent.working_point(params);
            persistent.move_to(&working);
        }

        if input.elapsed_s >= params.robot_follows_duration_s {
            let retract = persistent.retract_point;
            persistent.move_to(&retract);

            let outcome = if self.user_won {
                Outcome::UserWins
            } else {
                Outcome::RobotWins
            };
            persistent.finish_round(outcome);

            return StepOutput::transition(ModeKind::UserFollows);
        }

        let pointer_px = match persistent.pointer.position_px() {
            Some(p) => p,
            None => return StepOutput::none(),
        };

        let moved = match self.last_commanded_px {
            Some(last) => distance_px(last, pointer_px) > params.pointer_deadband_px,
            None => true,
        };

        if moved {
            let target = persistent.target_for_screen(params, pointer_px);
            persistent.move_to(&target);
            self.last_commanded_px = Some(pointer_px);
        }

        if !self.user_won {
            if let Some(robot_px) = persistent.robot_px(&params.screen) {
                let dist = distance_px(pointer_px, robot_px);
                debug!("Pointer {:.0} px from the robot", dist);

                if dist > params.user_wins_distance_px {
                    info!("Player escaped the robot ({:.0} px)", dist);
                    self.user_won = true;
                    persistent.tm.outcome = Some(Outcome::UserWins);
                }
            }
        }

        StepOutput::none()
    }
}

#[cfg(test)]
mod test {
    use super::super::test_utils::*;
    use super::*;
    use crate::{geom::CartesianPoint, panel::Indicator, robot_ctrl::RobotCtrlParams};
    use comms_if::{
        can::{CanId, IdProfile},
        eqpt::axis::AxisId,
    };

    fn params() -> ModeMgrParams {
        ModeMgrParams {
            robot_follows_duration_s: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_follows_pointer_with_deadband() {
        let mut h = harness(params(), ModeKind::RobotFollows, false);

        h.step_at(0.0);
        assert!(h.panel.indicator(Indicator::RobotLeads));
        assert!(!h.panel.indicator(Indicator::UserLeads));
        assert_eq!(h.take_moves().len(), 1);

        // (945, 450) px is 0.02 m along x
        h.pointer.push((945.0, 450.0));
        h.step_at(0.1);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.02, 0.0, -0.13)));

        // Inside the deadband
        h.pointer.push((948.0, 452.0));
        h.step_at(0.2);
        assert!(h.take_moves().is_empty());

        h.pointer.push((945.0, 562.5));
        h.step_at(0.3);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.02, -0.01, -0.13)));

        assert_eq!(h.mgr.get_tm().outcome, None);
    }

    #[test]
    fn test_user_wins_latched() {
        let mut h = harness(params(), ModeKind::RobotFollows, false);

        h.step_at(0.0);

        // The robot can't reach the screen's corner
        h.pointer.push((0.0, 0.0));
        h.step_at(1.0);
        assert_eq!(h.mgr.get_tm().outcome, Some(Outcome::UserWins));

        // Coming back doesn't undo it
        h.pointer.push((720.0, 450.0));
        h.step_at(2.0);
        h.step_at(3.0);
        assert_eq!(h.mgr.get_tm().outcome, Some(Outcome::UserWins));

        h.bus.clear_sent();
        h.step_at(10.0);
        assert_eq!(h.mgr.mode(), ModeKind::UserFollows);
        assert_eq!(h.mgr.get_tm().last_round, Some(Outcome::UserWins));

        // Retracted on the way out
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(h.mgr.persistent.retract_point));
    }

    #[test]
    fn test_robot_wins_when_caught() {
        let mut h = harness(params(), ModeKind::RobotFollows, false);

        h.step_at(0.0);
        h.pointer.push((800.0, 400.0));
        h.step_at(1.0);
        h.step_at(9.0);
        assert_eq!(h.mgr.get_tm().outcome, None);

        h.step_at(10.0);
        assert_eq!(h.mgr.mode(), ModeKind::UserFollows);
        assert_eq!(h.mgr.get_tm().last_round, Some(Outcome::RobotWins));

        // The new mode starts without an outcome
        assert_eq!(h.mgr.get_tm().outcome, None);
    }

    #[test]
    fn test_rejected_target_not_resent() {
        let mut h = harness(params(), ModeKind::RobotFollows, false);
        let motor_b = CanId::new(
            RobotCtrlParams::default().motor_ids[AxisId::B.index()],
            IdProfile::Extended,
        )
        .unwrap();

        h.step_at(0.0);
        h.bus.fail_sends_to(motor_b);
        h.bus.clear_sent();

        h.pointer.push((945.0, 450.0));
        h.step_at(0.1);
        assert_eq!(h.bus.sent_frames().len(), 2);

        // Same pointer position, the failed move is not retried every cycle
        h.bus.clear_sent();
        h.step_at(0.2);
        h.step_at(0.3);
        assert!(h.bus.sent_frames().is_empty());

        h.bus.restore_sends_to(motor_b);
        h.pointer.push((945.0, 562.5));
        h.step_at(0.4);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.02, -0.01, -0.13)));
    }
}
