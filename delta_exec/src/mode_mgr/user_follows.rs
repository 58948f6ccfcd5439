//! # [`UserFollows`] mode implementation
//!
//! The robot plays back the loaded path and the player has to keep the pointer on it. Waypoints
//! come faster and faster, until `path_min_interval_s` is reached. The robot wins if the player
//! ever falls more than `robot_wins_distance_px` behind.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{ModeKind, ModeMgrParams, ModeMgrPersistentData, Outcome, StepInput, StepOutput};
use crate::pointer::distance_px;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct UserFollows {
    entered: bool,

    playback: Playback,

    robot_won: bool,
}

/// Timing of the path playback, in seconds since the mode was entered.
#[derive(Debug, Clone, PartialEq)]
struct Playback {
    /// Index of the next waypoint to command, `None` once a non-wrapping path is finished.
    next_index: Option<usize>,

    next_at_s: f64,

    interval_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl UserFollows {
    pub fn new() -> Self {
        Self {
            entered: false,
            playback: Playback {
                next_index: Some(0),
                next_at_s: 0.0,
                interval_s: 0.0,
            },
            robot_won: false,
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
            persistent.set_indicators(false, true);

            let working = persistent.working_point(params);
            persistent.move_to(&working);

            self.playback = Playback::start(params, input.elapsed_s);
        }

        if input.elapsed_s >= params.user_follows_duration_s {
            let outcome = if self.robot_won {
                Outcome::RobotWins
            } else {
                Outcome::UserWins
            };
            persistent.finish_round(outcome);

            return StepOutput::transition(ModeKind::Idle);
        }

        if let Some(index) = self
            .playback
            .advance(params, persistent.path.len(), input.elapsed_s)
        {
            if let Some(waypoint_px) = persistent.path.get(index) {
                debug!("Path waypoint {} at {:?} px", index, waypoint_px);
                let target = persistent.target_for_screen(params, waypoint_px);
                persistent.move_to(&target);
            }
        }
        persistent.tm.path_index = self.playback.next_index;

        if !self.robot_won {
            let pointer_px = persistent.pointer.position_px();
            let robot_px = persistent.robot_px(&params.screen);

            if let (Some(pointer_px), Some(robot_px)) = (pointer_px, robot_px) {
                let dist = distance_px(pointer_px, robot_px);

                if dist > params.robot_wins_distance_px {
                    info!("Player lost the robot ({:.0} px)", dist);
                    self.robot_won = true;
                    persistent.tm.outcome = Some(Outcome::RobotWins);
                }
            }
        }

        StepOutput::none()
    }
}

impl Playback {
    fn start(params: &ModeMgrParams, now_s: f64) -> Self {
        Self {
            next_index: Some(0),
            next_at_s: now_s + params.path_initial_interval_s,
            interval_s: params.path_initial_interval_s,
        }
    }

    /// Move past every waypoint due by `now_s`, returning the latest one.
    ///
    /// At most one lap of the path is skipped per call. If the playback is still behind after
    /// that, the schedule restarts from `now_s`.
    fn advance(&mut self, params: &ModeMgrParams, path_len: usize, now_s: f64) -> Option<usize> {
        let mut due = None;

        for _ in 0..path_len {
            let index = match self.next_index {
                Some(i) if now_s >= self.next_at_s => i,
                _ => return due,
            };

            due = Some(index);

            self.interval_s =
                (self.interval_s * params.path_interval_decay).max(params.path_min_interval_s);
            self.next_at_s += self.interval_s;

            self.next_index = if index + 1 < path_len {
                Some(index + 1)
            } else if params.path_wrap {
                Some(0)
            } else {
                None
            };
        }

        if path_len > 0 && self.next_index.is_some() && now_s >= self.next_at_s {
            warn!("Path playback fell a lap behind, restarting the schedule");
            self.next_at_s = now_s + self.interval_s;
        }

        due
    }
}

#[cfg(test)]
mod test {
    use super::super::test_utils::*;
    use super::*;
    use crate::{geom::CartesianPoint, panel::Indicator};

    fn params() -> ModeMgrParams {
        ModeMgrParams {
            user_follows_duration_s: 20.0,
            path_initial_interval_s: 1.0,
            path_interval_decay: 0.5,
            path_min_interval_s: 0.25,
            ..Default::default()
        }
    }

    #[test]
    fn test_playback_timing() {
        let params = params();
        let mut pb = Playback::start(&params, 0.0);

        assert_eq!(pb.advance(&params, 4, 0.5), None);
        assert_eq!(pb.advance(&params, 4, 1.0), Some(0));
        // Interval halves to 0.5 s, then is held at 0.25 s
        assert_eq!(pb.advance(&params, 4, 1.4), None);
        assert_eq!(pb.advance(&params, 4, 1.5), Some(1));
        assert_eq!(pb.advance(&params, 4, 1.75), Some(2));
        assert_eq!(pb.advance(&params, 4, 2.0), Some(3));

        // Wraps, and late cycles skip to the latest due waypoint
        assert_eq!(pb.advance(&params, 4, 2.6), Some(1));
        assert_eq!(pb.next_index, Some(2));

        assert_eq!(pb.advance(&params, 0, 100.0), None);
    }

    #[test]
    fn test_playback_holds_last() {
        let params = ModeMgrParams {
            path_wrap: false,
            ..params()
        };
        let mut pb = Playback::start(&params, 0.0);

        assert_eq!(pb.advance(&params, 4, 10.0), Some(3));
        assert_eq!(pb.next_index, None);
        assert_eq!(pb.advance(&params, 4, 20.0), None);
    }

    #[test]
    fn test_playback_skips_at_most_one_lap() {
        // Degenerate timing, as if validation had been bypassed
        let params = ModeMgrParams {
            path_initial_interval_s: 0.0,
            path_min_interval_s: 0.0,
            ..params()
        };
        let mut pb = Playback::start(&params, 0.0);

        assert_eq!(pb.advance(&params, 4, 1.0), Some(3));
        assert_eq!(pb.next_index, Some(0));
        assert!(pb.next_at_s >= 1.0);

        // Far behind with a sane interval, the schedule restarts from now
        let params = self::params();
        let mut pb = Playback::start(&params, 0.0);
        assert_eq!(pb.advance(&params, 4, 1000.0), Some(3));
        assert!(pb.next_at_s > 1000.0);
        assert_eq!(pb.advance(&params, 4, 1000.0), None);
    }

    #[test]
    fn test_user_follows_path() {
        let mut h = harness(params(), ModeKind::UserFollows, false);

        h.step_at(0.0);
        assert!(h.panel.indicator(Indicator::UserLeads));
        assert!(!h.panel.indicator(Indicator::RobotLeads));
        assert_eq!(h.take_moves().len(), 1);

        // First waypoint is the screen centre, second is 0.02 m along x
        h.step_at(1.0);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.0, 0.0, -0.13)));

        h.step_at(1.5);
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.02, 0.0, -0.13)));
        assert_eq!(h.mgr.get_tm().path_index, Some(2));

        // Keeping up with the robot
        h.pointer.push((940.0, 455.0));
        h.step_at(1.6);
        assert_eq!(h.mgr.get_tm().outcome, None);

        // Falling behind
        h.pointer.push((300.0, 800.0));
        h.step_at(1.7);
        assert_eq!(h.mgr.get_tm().outcome, Some(Outcome::RobotWins));

        h.step_at(20.0);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);
        assert_eq!(h.mgr.get_tm().last_round, Some(Outcome::RobotWins));
    }

    #[test]
    fn test_user_wins_by_default() {
        let mut h = harness(params(), ModeKind::UserFollows, false);

        h.step_at(0.0);
        h.step_at(1.0);
        h.step_at(10.0);
        assert_eq!(h.mgr.get_tm().outcome, None);

        h.step_at(20.0);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);
        assert_eq!(h.mgr.get_tm().last_round, Some(Outcome::UserWins));
        assert_eq!(h.mgr.get_tm().outcome, None);
    }
}
