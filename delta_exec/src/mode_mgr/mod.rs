//! # ModeMgr module
//!
//! This module implements the [`ModeMgr`] state machine, which decides where the robot goes. It is
//! broken down into the following modes:
//!
//! - `Idle` - Homes the robot the first time it is entered, parks it clear of the screen and waits
//!   for the panel button.
//! - `RobotFollows` - The robot chases the player's pointer. The player wins by getting far enough
//!   away from it.
//! - `UserFollows` - The robot plays back a path, accelerating as it goes, and the player has to
//!   keep up with it.
//! - `TestConsole` - Operator commands are executed directly. Only entered when selected at
//!   startup, and never left.
//!
//! The production cycle is Idle -> RobotFollows -> UserFollows -> Idle. Each mode runs its entry
//! actions once when entered, guarded by its `entered` flag, and all timing is done by comparing
//! the cycle time given to [`ModeMgr::step`] with the time the mode was entered.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod idle;
mod params;
mod robot_follows;
mod test_console;
pub mod tm;
mod user_follows;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use std::{fmt::Display, time::Instant};

use crate::{
    geom::{calib, CartesianPoint},
    panel::{Indicator, Panel},
    path::Path,
    pointer::{PointerSource, ScreenArea},
    robot_ctrl::{RobotCtrl, RobotCtrlError},
};

pub use self::{
    params::{InvalidParam, ModeMgrParams},
    tm::{ModeKind, ModeTm, Outcome},
};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::idle::Idle;
    pub use super::robot_follows::RobotFollows;
    pub use super::test_console::TestConsole;
    pub use super::user_follows::UserFollows;
}

use states::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// File name the telemetry of each finished round is archived under, in the session directory.
const ROUND_TM_FILE: &str = "round_tm.json";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mode Manager
pub struct ModeMgr {
    /// Parameters for the ModeMgr and all its states.
    pub params: ModeMgrParams,

    /// Data valid over all states, including the robot itself.
    pub persistent: ModeMgrPersistentData,

    state: ModeState,

    /// Time at which the current state was entered.
    mode_start: Instant,

    /// Restart the first mode instead of leaving it.
    stay_in_first_mode: bool,
}

pub struct ModeMgrPersistentData {
    pub robot: RobotCtrl,

    pub panel: Box<dyn Panel>,

    pub pointer: Box<dyn PointerSource>,

    /// Path played back in UserFollows.
    pub path: Path,

    /// Telemetry of the current mode.
    pub tm: ModeTm,

    /// Position the robot is parked at, clear of the screen.
    pub retract_point: CartesianPoint,

    /// Set once the axes have been homed.
    pub homed: bool,

    /// Last target the robot was successfully sent to.
    pub last_target: Option<CartesianPoint>,
}

/// Inputs given to a state's step function.
pub struct StepInput<'a> {
    /// Current cycle time.
    pub now: Instant,

    /// Seconds since the state was entered.
    pub elapsed_s: f64,

    /// Line typed at the operator console this cycle, if any.
    pub console_line: Option<&'a str>,
}

/// Output of a state's step function.
pub struct StepOutput {
    pub action: ModeAction,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the mode manager.
#[derive(Debug, thiserror::Error)]
pub enum ModeMgrError {
    #[error("{0}")]
    InvalidParam(InvalidParam),

    #[error("No height on the centre column puts the arms at {0:.1} deg")]
    RetractHeightNotFound(f64),
}

#[derive(Debug)]
pub enum ModeState {
    Idle(Idle),
    RobotFollows(RobotFollows),
    UserFollows(UserFollows),
    TestConsole(TestConsole),
}

/// Actions that can be requested at the end of a state's step function.
#[derive(Debug)]
pub enum ModeAction {
    None,
    Transition(ModeKind),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ModeMgr {
    pub fn init(
        params: ModeMgrParams,
        persistent: ModeMgrPersistentData,
        first_mode: ModeKind,
        stay_in_first_mode: bool,
        now: Instant,
    ) -> Self {
        info!(
            "ModeMgr starting in {:?}{}",
            first_mode,
            if stay_in_first_mode {
                ", staying in the first mode"
            } else {
                ""
            }
        );

        let mut mgr = Self {
            params,
            persistent,
            state: ModeState::new(first_mode),
            mode_start: now,
            stay_in_first_mode,
        };
        mgr.persistent.tm.mode = first_mode;

        mgr
    }

    /// Run one cycle of the current state.
    pub fn step(&mut self, now: Instant, console_line: Option<&str>) {
        let input = StepInput {
            now,
            elapsed_s: now.saturating_duration_since(self.mode_start).as_secs_f64(),
            console_line,
        };

        self.persistent.refresh_tm(&self.params, &input);

        let output = self.state.step(&self.params, &mut self.persistent, &input);

        if let ModeAction::Transition(next) = output.action {
            let next = if self.stay_in_first_mode {
                info!("Restarting {}", self.state);
                self.state.kind()
            } else {
                next
            };

            self.state = ModeState::new(next);
            self.mode_start = now;

            self.persistent.tm.mode = next;
            self.persistent.tm.outcome = None;
            self.persistent.tm.path_index = None;
            self.persistent.tm.mode_elapsed_s = 0.0;

            info!("ModeMgr state change to: {}", self.state);
        }
    }

    pub fn mode(&self) -> ModeKind {
        self.state.kind()
    }

    pub fn get_tm(&self) -> ModeTm {
        self.persistent.tm.clone()
    }
}

impl ModeState {
    fn new(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Idle => ModeState::Idle(Idle::new()),
            ModeKind::RobotFollows => ModeState::RobotFollows(RobotFollows::new()),
            ModeKind::UserFollows => ModeState::UserFollows(UserFollows::new()),
            ModeKind::TestConsole => ModeState::TestConsole(TestConsole::new()),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            ModeState::Idle(_) => ModeKind::Idle,
            ModeState::RobotFollows(_) => ModeKind::RobotFollows,
            ModeState::UserFollows(_) => ModeKind::UserFollows,
            ModeState::TestConsole(_) => ModeKind::TestConsole,
        }
    }

    fn step(
        &mut self,
        params: &ModeMgrParams,
        persistent: &mut ModeMgrPersistentData,
        input: &StepInput,
    ) -> StepOutput {
        match self {
            ModeState::Idle(idle) => idle.step(params, persistent, input),
            ModeState::RobotFollows(rf) => rf.step(params, persistent, input),
            ModeState::UserFollows(uf) => uf.step(params, persistent, input),
            ModeState::TestConsole(tc) => tc.step(params, persistent, input),
        }
    }
}

impl Display for ModeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModeState::{:?}", self.kind())
    }
}

impl ModeMgrPersistentData {
    /// Gather the data shared by all states.
    ///
    /// The retract point is found once here from the retract arm angle.
    pub fn new(
        params: &ModeMgrParams,
        robot: RobotCtrl,
        panel: Box<dyn Panel>,
        pointer: Box<dyn PointerSource>,
        path: Path,
    ) -> Result<Self, ModeMgrError> {
        params.validate().map_err(ModeMgrError::InvalidParam)?;

        let retract_angle_rad = params.retract_arm_angle_deg.to_radians();
        let retract_z_m = calib::find_height_for_angle(robot.geometry(), retract_angle_rad)
            .ok_or(ModeMgrError::RetractHeightNotFound(params.retract_arm_angle_deg))?;

        let retract_point = robot
            .op_space()
            .clamp(&CartesianPoint::new(0.0, 0.0, retract_z_m));

        info!("Robot retracts to {}", retract_point);

        Ok(Self {
            robot,
            panel,
            pointer,
            path,
            tm: ModeTm::default(),
            retract_point,
            homed: false,
            last_target: None,
        })
    }

    /// Move the robot, logging and skipping the move if it isn't possible.
    ///
    /// Targets outside the operational space are first brought back inside it.
    pub fn move_to(&mut self, target: &CartesianPoint) -> bool {
        let target = self.robot.op_space().clamp(target);

        match self.robot.move_base_to(&target) {
            Ok(()) => {
                self.last_target = Some(target);
                true
            }
            Err(RobotCtrlError::SendFailures(f)) => {
                warn!("Move to {} incomplete, axes {} not commanded", target, f);
                false
            }
            Err(e) => {
                warn!("Move to {} skipped: {}", target, e);
                false
            }
        }
    }

    /// Centre of the working plane.
    pub fn working_point(&self, params: &ModeMgrParams) -> CartesianPoint {
        CartesianPoint::new(0.0, 0.0, params.working_height_m)
    }

    /// Working plane target under a screen position, kept within the usable radius.
    pub fn target_for_screen(
        &self,
        params: &ModeMgrParams,
        position_px: (f64, f64),
    ) -> CartesianPoint {
        let (mut x_m, mut y_m) = params.screen.to_robot(position_px);

        let radius_m = (x_m.powi(2) + y_m.powi(2)).sqrt();
        if radius_m > params.usable_radius_m && radius_m > 0.0 {
            let scale = params.usable_radius_m / radius_m;
            x_m *= scale;
            y_m *= scale;
        }

        CartesianPoint::new(x_m, y_m, params.working_height_m)
    }

    /// Screen position of the robot, from the encoders if a pose is known, otherwise from the
    /// last target.
    pub fn robot_px(&self, screen: &ScreenArea) -> Option<(f64, f64)> {
        self.robot
            .snapshot()
            .cartesian
            .or(self.last_target)
            .map(|p| screen.to_screen((p.x_m, p.y_m)))
    }

    /// Switch the panel lamps.
    pub fn set_indicators(&mut self, robot_leads: bool, user_leads: bool) {
        self.panel.set_indicator(Indicator::RobotLeads, robot_leads);
        self.panel.set_indicator(Indicator::UserLeads, user_leads);
        self.tm.robot_leads = robot_leads;
        self.tm.user_leads = user_leads;
    }

    /// Record the result of a round and archive its telemetry.
    pub fn finish_round(&mut self, outcome: Outcome) {
        self.tm.outcome = Some(outcome);
        self.tm.last_round = Some(outcome);
        info!("{:?} round over: {:?}", self.tm.mode, outcome);

        util::session::save_with_timestamp(ROUND_TM_FILE, self.tm.clone());
    }

    fn refresh_tm(&mut self, params: &ModeMgrParams, input: &StepInput) {
        self.tm.mode_elapsed_s = input.elapsed_s;
        self.tm.pose = self.robot.snapshot().cartesian;
        self.tm.target = self.last_target;
        self.tm.pointer_px = self.pointer.position_px();
        self.tm.robot_px = self.robot_px(&params.screen);
    }
}

impl StepOutput {
    pub fn none() -> Self {
        Self {
            action: ModeAction::None,
        }
    }

    pub fn transition(next: ModeKind) -> Self {
        Self {
            action: ModeAction::Transition(next),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use crate::{
        geom::DeltaGeometry,
        panel::NullPanel,
        pointer::{PointerKind, SharedPointer},
        robot_ctrl::RobotCtrlParams,
    };
    use comms_if::{
        can::{codec, Loopback},
        eqpt::axis::AxisCommand,
    };

    pub struct Harness {
        pub mgr: ModeMgr,
        pub bus: Loopback,
        pub panel: NullPanel,
        pub pointer: SharedPointer,
        pub t0: Instant,
    }

    pub fn harness(params: ModeMgrParams, first_mode: ModeKind, stay: bool) -> Harness {
        let bus = Loopback::new();
        let panel = NullPanel::new();
        let pointer = SharedPointer::new(PointerKind::Mouse, params.screen);

        let robot = RobotCtrl::new(
            RobotCtrlParams::default(),
            DeltaGeometry::default(),
            bus.clone(),
        )
        .unwrap();

        let path = Path::from_json_str("[[720, 450], [945, 450], [945, 225], [720, 225]]").unwrap();

        let persistent = ModeMgrPersistentData::new(
            &params,
            robot,
            Box::new(panel.clone()),
            Box::new(pointer.clone()),
            path,
        )
        .unwrap();

        let t0 = Instant::now();

        Harness {
            mgr: ModeMgr::init(params, persistent, first_mode, stay, t0),
            bus,
            panel,
            pointer,
            t0,
        }
    }

    impl Harness {
        pub fn step_at(&mut self, t_s: f64) {
            self.step_with(t_s, None);
        }

        pub fn step_with(&mut self, t_s: f64, line: Option<&str>) {
            let now = self.t0 + std::time::Duration::from_secs_f64(t_s);
            self.mgr.step(now, line);
        }

        /// Axis angles of every complete position command sent, clearing the record.
        pub fn take_moves(&self) -> Vec<[f64; 3]> {
            let frames = self.bus.sent_frames();
            self.bus.clear_sent();

            frames
                .chunks(3)
                .filter_map(|c| {
                    let mut angles = [0.0; 3];
                    for (i, f) in c.iter().enumerate() {
                        match codec::decode_command(&f.data) {
                            Some(AxisCommand::Position { angle_deg }) => angles[i] = angle_deg,
                            _ => return None,
                        }
                    }
                    if c.len() == 3 {
                        Some(angles)
                    } else {
                        None
                    }
                })
                .collect()
        }

        /// Axis angles the robot would be sent to reach a point.
        pub fn angles_for(&self, point: CartesianPoint) -> [f64; 3] {
            self.mgr
                .persistent
                .robot
                .geometry()
                .inverse(&point)
                .unwrap()
                .as_degrees()
        }
    }

    pub fn assert_move(got: [f64; 3], expected: [f64; 3]) {
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 0.011, "{:?} != {:?}", got, expected);
        }
    }
}

#[cfg(test)]
mod test {
    use super::test_utils::*;
    use super::*;

    #[test]
    fn test_full_cycle() {
        let params = ModeMgrParams {
            settle_s: 1.0,
            robot_follows_duration_s: 10.0,
            user_follows_duration_s: 10.0,
            ..Default::default()
        };
        let mut h = harness(params, ModeKind::Idle, false);

        h.step_at(0.0);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);

        // Presses before the robot is parked are dropped
        h.panel.press();
        h.step_at(0.1);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);
        h.step_at(1.5);
        h.step_at(1.6);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);

        h.panel.press();
        h.step_at(1.7);
        assert_eq!(h.mgr.mode(), ModeKind::RobotFollows);

        h.step_at(2.0);
        h.step_at(12.0);
        assert_eq!(h.mgr.mode(), ModeKind::UserFollows);

        h.step_at(12.1);
        h.step_at(22.2);
        assert_eq!(h.mgr.mode(), ModeKind::Idle);
    }

    #[test]
    fn test_stay_in_first_mode() {
        let params = ModeMgrParams {
            robot_follows_duration_s: 5.0,
            ..Default::default()
        };
        let mut h = harness(params, ModeKind::RobotFollows, true);

        h.step_at(0.0);
        h.step_at(5.5);
        assert_eq!(h.mgr.mode(), ModeKind::RobotFollows);

        // The mode restarted, so its timer did too
        h.step_at(6.0);
        assert!(h.mgr.get_tm().mode_elapsed_s < 1.0);
    }

    #[test]
    fn test_target_for_screen() {
        let h = harness(ModeMgrParams::default(), ModeKind::Idle, false);
        let params = &h.mgr.params;

        let centre = h.mgr.persistent.target_for_screen(params, (720.0, 450.0));
        assert_eq!(centre, CartesianPoint::new(0.0, 0.0, params.working_height_m));

        // The usable area's corner is outside the usable disc
        let corner = h.mgr.persistent.target_for_screen(params, (1170.0, 0.0));
        let r = (corner.x_m.powi(2) + corner.y_m.powi(2)).sqrt();
        assert!((r - params.usable_radius_m).abs() < 1e-9);
        assert!(corner.x_m > 0.0 && corner.y_m > 0.0);
    }

    #[test]
    fn test_retract_point() {
        let h = harness(ModeMgrParams::default(), ModeKind::Idle, false);
        let retract = h.mgr.persistent.retract_point;

        assert_eq!((retract.x_m, retract.y_m), (0.0, 0.0));
        assert!(retract.z_m > h.mgr.params.working_height_m);
        assert!(h.mgr.persistent.robot.op_space().contains(&retract));
    }

    #[test]
    fn test_invalid_params_rejected() {
        use crate::{
            geom::DeltaGeometry,
            panel::NullPanel,
            pointer::{PointerKind, SharedPointer},
            robot_ctrl::RobotCtrlParams,
        };
        use comms_if::can::Loopback;

        let params = ModeMgrParams {
            path_min_interval_s: 0.0,
            path_initial_interval_s: 0.0,
            ..Default::default()
        };

        let robot = RobotCtrl::new(
            RobotCtrlParams::default(),
            DeltaGeometry::default(),
            Loopback::new(),
        )
        .unwrap();

        let result = ModeMgrPersistentData::new(
            &params,
            robot,
            Box::new(NullPanel::new()),
            Box::new(SharedPointer::new(PointerKind::Mouse, params.screen)),
            Path::from_json_str("[[720, 450]]").unwrap(),
        );

        assert!(matches!(result, Err(ModeMgrError::InvalidParam(_))));
    }
}
