//! # [`TestConsole`] mode implementation
//!
//! Executes operator commands typed at the console directly on the robot. The mode is only
//! entered when selected at startup and never leaves by itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use comms_if::can::CanLinkError;

use super::{ModeMgrParams, ModeMgrPersistentData, StepInput, StepOutput};
use crate::{
    console::{self, ConsoleCmd, ConsoleParseError},
    geom::CartesianPoint,
    robot_ctrl::{AxisFailures, RobotCtrlError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct TestConsole {
    entered: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("{0}")]
    Parse(ConsoleParseError),

    #[error("{0}")]
    Robot(RobotCtrlError),

    #[error("{0}")]
    Link(CanLinkError),

    #[error("Command not sent to axes {0}")]
    Axes(AxisFailures),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TestConsole {
    pub fn new() -> Self {
        Self { entered: false }
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
            info!("Test console ready");
        }

        if let Some(line) = input.console_line {
            match execute(params, persistent, line) {
                Ok(true) => println!("ok"),
                Ok(false) => (),
                Err(e) => {
                    warn!("Console command \"{}\" failed: {}", line.trim(), e);
                    println!("error: {}", e);
                }
            }
        }

        StepOutput::none()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run one console line, returning `false` if it was blank.
fn execute(
    params: &ModeMgrParams,
    persistent: &mut ModeMgrPersistentData,
    line: &str,
) -> Result<bool, ConsoleError> {
    let cmd = match console::parse_line(line).map_err(ConsoleError::Parse)? {
        Some(c) => c,
        None => return Ok(false),
    };

    match cmd {
        ConsoleCmd::MoveBase(target) => move_base(persistent, target)?,
        ConsoleCmd::Centre => {
            let target = persistent.working_point(params);
            move_base(persistent, target)?
        }
        ConsoleCmd::MovePlane { x_m, y_m } => move_base(
            persistent,
            CartesianPoint::new(x_m, y_m, params.working_height_m),
        )?,
        ConsoleCmd::MoveAxes { angles_deg } => check_failures(persistent.robot.move_all_axes_to(
            angles_deg[0],
            angles_deg[1],
            angles_deg[2],
        ))?,
        ConsoleCmd::Home { axis, voltage_v } => match axis {
            Some(a) => persistent
                .robot
                .move_home_axis(a, voltage_v)
                .map_err(ConsoleError::Link)?,
            None => check_failures(persistent.robot.move_home_all(voltage_v))?,
        },
        ConsoleCmd::SetConstant {
            axis,
            constant,
            value,
        } => match axis {
            Some(a) => persistent
                .robot
                .set_constant(a, constant, value)
                .map_err(ConsoleError::Link)?,
            None => check_failures(persistent.robot.set_all_constant(constant, value))?,
        },
    }

    Ok(true)
}

fn move_base(
    persistent: &mut ModeMgrPersistentData,
    target: CartesianPoint,
) -> Result<(), ConsoleError> {
    persistent
        .robot
        .move_base_to(&target)
        .map_err(ConsoleError::Robot)?;
    persistent.last_target = Some(target.rounded());

    Ok(())
}

fn check_failures(failures: AxisFailures) -> Result<(), ConsoleError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ConsoleError::Axes(failures))
    }
}

#[cfg(test)]
mod test {
    use super::super::test_utils::*;
    use super::*;
    use crate::mode_mgr::ModeKind;
    use comms_if::{
        can::{codec, CanId, IdProfile},
        eqpt::axis::{AxisCommand, PidConstant},
    };

    #[test]
    fn test_console_moves() {
        let mut h = harness(ModeMgrParams::default(), ModeKind::TestConsole, false);

        h.step_with(0.0, Some("p 0.01,0.0,-0.12"));
        let moves = h.take_moves();
        assert_eq!(moves.len(), 1);
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.01, 0.0, -0.12)));

        h.step_with(0.1, Some("f 0.0, 0.02"));
        let moves = h.take_moves();
        assert_move(moves[0], h.angles_for(CartesianPoint::new(0.0, 0.02, -0.13)));

        h.step_with(0.2, Some("a -10,-20.5,5"));
        assert_move(h.take_moves()[0], [-10.0, -20.5, 5.0]);

        // Out of the operational space, nothing sent
        h.step_with(0.3, Some("p 0.2,0,-0.12"));
        assert!(h.bus.sent_frames().is_empty());

        // Garbage is reported, not acted on
        h.step_with(0.4, Some("x 1,2"));
        h.step_with(0.5, Some(""));
        assert!(h.bus.sent_frames().is_empty());

        h.step_at(1000.0);
        assert_eq!(h.mgr.mode(), ModeKind::TestConsole);
    }

    #[test]
    fn test_console_homing_and_tuning() {
        let mut h = harness(ModeMgrParams::default(), ModeKind::TestConsole, false);

        h.step_with(0.0, Some("h B,1.5"));
        let frames = h.bus.sent_frames();
        h.bus.clear_sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, CanId::new(0x12, IdProfile::Extended).unwrap());
        assert_eq!(
            codec::decode_command(&frames[0].data),
            Some(AxisCommand::Homing { voltage_v: 1.5 })
        );

        h.step_with(0.1, Some("k 3,0.25"));
        let frames = h.bus.sent_frames();
        assert_eq!(frames.len(), 3);
        for f in frames.iter() {
            assert_eq!(
                codec::decode_command(&f.data),
                Some(AxisCommand::SetConstant {
                    constant: PidConstant::Tau,
                    value: 0.25
                })
            );
        }
    }
}
