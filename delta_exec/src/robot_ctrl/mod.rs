//! # Robot control module
//!
//! [`RobotCtrl`] turns cartesian targets into motor board commands and keeps track of where the
//! robot actually is from the encoder boards' feedback.
//!
//! Commands are sent synchronously from the control thread. Feedback arrives on the CAN link's
//! receive thread, which is the only writer of the robot's [`RobotState`]. The control thread
//! reads it with [`RobotCtrl::snapshot`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use comms_if::{
    can::{codec, CanId, CanLink, CanLinkError, CanTransport, InvalidCanId, RawFrame},
    eqpt::axis::{AxisId, PidConstant, NUM_AXES},
};

use crate::geom::{CachedGeometry, CartesianPoint, DeltaGeometry, GeomError};

pub use params::*;
pub use state::{FeedbackOutcome, PoseObserver, RobotSnapshot, RobotState};
use state::SharedState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Robot controller.
pub struct RobotCtrl {
    params: RobotCtrlParams,

    /// Inverse model used for moves, memoised since targets repeat a lot.
    geom: CachedGeometry,

    motor_ids: [CanId; NUM_AXES],

    shared: Arc<SharedState>,

    link: CanLink,
}

/// Set of axes whose command could not be sent.
///
/// Bit 0, 1 and 2 are axes A, B and C respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFailures(u8);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RobotCtrlError {
    #[error("Invalid CAN ID in parameters: {0}")]
    InvalidCanId(InvalidCanId),

    #[error("Could not open the CAN link: {0}")]
    LinkOpenError(CanLinkError),

    #[error("Target {0} is outside the operational space")]
    OutsideOperationalSpace(CartesianPoint),

    #[error("Geometric model failed: {0}")]
    GeomError(GeomError),

    #[error("Axis {axis} would have to move to {angle_deg:.1} deg, outside its range")]
    AxisOutOfRange { axis: AxisId, angle_deg: f64 },

    #[error("Commands could not be sent to axes {0}")]
    SendFailures(AxisFailures),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotCtrl {
    /// Open a controller over the given transport.
    ///
    /// Encoder feedback starts being processed immediately.
    pub fn new<T>(
        params: RobotCtrlParams,
        geom: DeltaGeometry,
        transport: T,
    ) -> Result<Self, RobotCtrlError>
    where
        T: CanTransport + 'static,
    {
        let motor_ids = to_can_ids(&params.motor_ids, &params)?;
        let encoder_ids = to_can_ids(&params.encoder_ids, &params)?;

        let shared = Arc::new(SharedState::new(geom));

        let shared_clone = shared.clone();
        let link = CanLink::open(transport, move |frame: RawFrame| {
            match encoder_ids.iter().position(|id| *id == frame.id) {
                Some(idx) => {
                    if let Some(axis) = AxisId::from_index(idx) {
                        let angle_rad = codec::decode_feedback(&frame.data);
                        trace!("Axis {} encoder at {:.4} rad", axis, angle_rad);
                        shared_clone.on_feedback(axis, angle_rad);
                    }
                }
                None => trace!("Ignoring frame from {}", frame.id),
            }
        })
        .map_err(RobotCtrlError::LinkOpenError)?;

        info!(
            "RobotCtrl initialised, motors {:?}, encoders {:?}, {:?} position framing",
            motor_ids, encoder_ids, params.position_profile
        );

        Ok(Self {
            params,
            geom: CachedGeometry::new(geom),
            motor_ids,
            shared,
            link,
        })
    }

    pub fn params(&self) -> &RobotCtrlParams {
        &self.params
    }

    pub fn geometry(&self) -> &DeltaGeometry {
        self.geom.geometry()
    }

    pub fn op_space(&self) -> &OperationalSpace {
        &self.params.op_space
    }

    /// Returns true once the link to the bus has failed and been closed.
    pub fn is_link_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Command one axis to an absolute angle.
    pub fn move_axis_to(&self, axis: AxisId, angle_deg: f64) -> Result<(), CanLinkError> {
        self.link.send(
            self.motor_ids[axis.index()],
            codec::encode_position_with(self.params.position_profile, angle_deg),
        )
    }

    /// Command all three axes, returning the set of axes which could not be commanded.
    ///
    /// A failure on one axis does not stop the others being sent.
    pub fn move_all_axes_to(&self, a_deg: f64, b_deg: f64, c_deg: f64) -> AxisFailures {
        let mut failures = AxisFailures::none();

        for (axis, angle_deg) in AxisId::ALL.iter().zip([a_deg, b_deg, c_deg].iter()) {
            if let Err(e) = self.move_axis_to(*axis, *angle_deg) {
                warn!("Could not move axis {} to {:.2} deg: {}", axis, angle_deg, e);
                failures.insert(*axis);
            }
        }

        failures
    }

    /// Move the centre of the platform to `target`.
    ///
    /// Nothing is sent if the target is outside the operational space or cannot be reached.
    pub fn move_base_to(&mut self, target: &CartesianPoint) -> Result<(), RobotCtrlError> {
        let target = target.rounded();

        if !self.params.op_space.contains(&target) {
            return Err(RobotCtrlError::OutsideOperationalSpace(target));
        }

        let angles = self
            .geom
            .inverse(&target)
            .map_err(RobotCtrlError::GeomError)?;
        let angles_deg = angles.as_degrees();

        for (axis, angle_deg) in AxisId::ALL.iter().zip(angles_deg.iter()) {
            if *angle_deg < self.params.min_axis_angle_deg
                || *angle_deg > self.params.max_axis_angle_deg
            {
                return Err(RobotCtrlError::AxisOutOfRange {
                    axis: *axis,
                    angle_deg: *angle_deg,
                });
            }
        }

        trace!("Moving base to {}, axes at {}", target, angles);

        let failures = self.move_all_axes_to(angles_deg[0], angles_deg[1], angles_deg[2]);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RobotCtrlError::SendFailures(failures))
        }
    }

    /// Start homing one axis, driving it against its reference with `voltage_v`.
    pub fn move_home_axis(&self, axis: AxisId, voltage_v: f64) -> Result<(), CanLinkError> {
        self.link
            .send(self.motor_ids[axis.index()], codec::encode_homing(voltage_v))
    }

    /// Start homing all axes.
    pub fn move_home_all(&self, voltage_v: f64) -> AxisFailures {
        let mut failures = AxisFailures::none();

        for axis in AxisId::ALL.iter() {
            if let Err(e) = self.move_home_axis(*axis, voltage_v) {
                warn!("Could not home axis {}: {}", axis, e);
                failures.insert(*axis);
            }
        }

        failures
    }

    /// Set one constant of an axis' position controller.
    pub fn set_constant(
        &self,
        axis: AxisId,
        constant: PidConstant,
        value: f64,
    ) -> Result<(), CanLinkError> {
        self.link.send(
            self.motor_ids[axis.index()],
            codec::encode_set_constant(constant, value),
        )
    }

    /// Set one constant on all three axes.
    pub fn set_all_constant(&self, constant: PidConstant, value: f64) -> AxisFailures {
        let mut failures = AxisFailures::none();

        for axis in AxisId::ALL.iter() {
            if let Err(e) = self.set_constant(*axis, constant, value) {
                warn!("Could not set {:?} on axis {}: {}", constant, axis, e);
                failures.insert(*axis);
            }
        }

        failures
    }

    /// Process one encoder reading, as done for every feedback frame received.
    pub fn on_feedback(&self, axis: AxisId, angle_rad: f64) -> FeedbackOutcome {
        self.shared.on_feedback(axis, angle_rad)
    }

    /// Get a consistent copy of the last known pose.
    pub fn snapshot(&self) -> RobotSnapshot {
        self.shared.snapshot()
    }

    /// Register the callback notified with each new pose, replacing any previous one.
    ///
    /// The callback runs on the bus receive thread and must not send commands.
    pub fn set_observer(&self, observer: PoseObserver) {
        self.shared.set_observer(Some(observer));
    }
}

impl AxisFailures {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, axis: AxisId) {
        self.0 |= 1 << axis.index();
    }

    pub fn contains(&self, axis: AxisId) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The raw mask.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for AxisFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: Vec<String> = AxisId::ALL
            .iter()
            .filter(|a| self.contains(**a))
            .map(|a| a.to_string())
            .collect();

        write!(f, "[{}] ({:#05b})", axes.join(", "), self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn to_can_ids(
    raw: &[u32; NUM_AXES],
    params: &RobotCtrlParams,
) -> Result<[CanId; NUM_AXES], RobotCtrlError> {
    let mut ids = [CanId::Standard(0); NUM_AXES];

    for (id, raw) in ids.iter_mut().zip(raw.iter()) {
        *id = CanId::new(*raw, params.id_profile).map_err(RobotCtrlError::InvalidCanId)?;
    }

    Ok(ids)
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        can::{IdProfile, Loopback},
        eqpt::axis::AxisCommand,
    };
    use std::{sync::mpsc::channel, time::Duration};

    fn setup() -> (RobotCtrl, Loopback) {
        let bus = Loopback::new();
        let ctrl = RobotCtrl::new(
            RobotCtrlParams::default(),
            DeltaGeometry::default(),
            bus.clone(),
        )
        .unwrap();

        (ctrl, bus)
    }

    fn motor_id(axis: AxisId) -> CanId {
        CanId::new(RobotCtrlParams::default().motor_ids[axis.index()], IdProfile::Extended)
            .unwrap()
    }

    fn encoder_id(axis: AxisId) -> CanId {
        CanId::new(RobotCtrlParams::default().encoder_ids[axis.index()], IdProfile::Extended)
            .unwrap()
    }

    #[test]
    fn test_move_all_axes_failures() {
        let (ctrl, bus) = setup();

        bus.fail_sends_to(motor_id(AxisId::A));
        bus.fail_sends_to(motor_id(AxisId::C));

        let failures = ctrl.move_all_axes_to(10.0, 20.0, 30.0);
        assert_eq!(failures.bits(), 0b101);
        assert!(failures.contains(AxisId::A));
        assert!(!failures.contains(AxisId::B));

        // B was still sent
        let sent = bus.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, motor_id(AxisId::B));
        assert_eq!(
            codec::decode_command(&sent[0].data),
            Some(AxisCommand::Position { angle_deg: 20.0 })
        );

        bus.restore_sends_to(motor_id(AxisId::A));
        bus.restore_sends_to(motor_id(AxisId::C));
        assert!(ctrl.move_all_axes_to(10.0, 20.0, 30.0).is_empty());
    }

    #[test]
    fn test_move_base_to() {
        let (mut ctrl, bus) = setup();

        ctrl.move_base_to(&CartesianPoint::new(0.0, 0.0, -0.13)).unwrap();

        let sent = bus.sent_frames();
        assert_eq!(sent.len(), 3);
        for (frame, axis) in sent.iter().zip(AxisId::ALL.iter()) {
            assert_eq!(frame.id, motor_id(*axis));
            match codec::decode_command(&frame.data) {
                Some(AxisCommand::Position { angle_deg }) => {
                    assert!((angle_deg - (-0.657f64).to_degrees()).abs() < 0.01)
                }
                c => panic!("Unexpected command {:?}", c),
            }
        }
    }

    #[test]
    fn test_move_base_to_rejections() {
        let (mut ctrl, bus) = setup();

        assert!(matches!(
            ctrl.move_base_to(&CartesianPoint::new(0.0, 0.0, 0.0)),
            Err(RobotCtrlError::OutsideOperationalSpace(_))
        ));
        assert!(matches!(
            ctrl.move_base_to(&CartesianPoint::new(0.2, 0.0, -0.13)),
            Err(RobotCtrlError::OutsideOperationalSpace(_))
        ));
        assert!(bus.sent_frames().is_empty());

        bus.fail_sends_to(motor_id(AxisId::B));
        match ctrl.move_base_to(&CartesianPoint::new(0.0, 0.0, -0.13)) {
            Err(RobotCtrlError::SendFailures(f)) => assert_eq!(f.bits(), 0b010),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[test]
    fn test_unreachable_inside_op_space() {
        let bus = Loopback::new();
        let mut params = RobotCtrlParams::default();
        params.op_space.z_max_m = 0.0;
        let mut ctrl = RobotCtrl::new(params, DeltaGeometry::default(), bus.clone()).unwrap();

        assert!(matches!(
            ctrl.move_base_to(&CartesianPoint::new(0.0, 0.0, 0.0)),
            Err(RobotCtrlError::GeomError(GeomError::DomainError))
        ));
        assert!(bus.sent_frames().is_empty());
    }

    #[test]
    fn test_axis_range() {
        let bus = Loopback::new();
        let mut params = RobotCtrlParams::default();
        params.min_axis_angle_deg = -30.0;
        let mut ctrl = RobotCtrl::new(params, DeltaGeometry::default(), bus.clone()).unwrap();

        assert!(matches!(
            ctrl.move_base_to(&CartesianPoint::new(0.0, 0.0, -0.13)),
            Err(RobotCtrlError::AxisOutOfRange { axis: AxisId::A, .. })
        ));
        assert!(bus.sent_frames().is_empty());
    }

    #[test]
    fn test_homing_and_constants() {
        let (ctrl, bus) = setup();

        ctrl.move_home_axis(AxisId::B, 5.5).unwrap();
        assert!(ctrl.set_all_constant(PidConstant::Tau, 0.02).is_empty());

        let sent = bus.sent_frames();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].id, motor_id(AxisId::B));
        assert_eq!(
            codec::decode_command(&sent[0].data),
            Some(AxisCommand::Homing { voltage_v: 5.5 })
        );
        assert_eq!(
            codec::decode_command(&sent[3].data),
            Some(AxisCommand::SetConstant {
                constant: PidConstant::Tau,
                value: 0.02
            })
        );
    }

    #[test]
    fn test_feedback_over_bus() {
        let (ctrl, bus) = setup();
        let (tx, rx) = channel();

        ctrl.set_observer(Box::new(move |p: &CartesianPoint| {
            tx.send(*p).unwrap();
        }));

        // Frames from other boards are ignored
        bus.inject(RawFrame::new(motor_id(AxisId::A), codec::encode_feedback(1.0)));

        for axis in AxisId::ALL.iter() {
            bus.inject(RawFrame::new(encoder_id(*axis), codec::encode_feedback(-0.657)));
        }

        let point = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!((point.z_m - -0.13).abs() < 1.5e-3);

        let snap = ctrl.snapshot();
        assert_eq!(snap.cartesian, Some(point));
        assert_eq!(snap.angles_rad, [Some(-0.657); 3]);
    }

    #[test]
    fn test_failures_display() {
        let mut failures = AxisFailures::none();
        failures.insert(AxisId::A);
        failures.insert(AxisId::C);
        assert_eq!(failures.to_string(), "[A, C] (0b101)");
    }
}
