//! Robot pose state, written by the feedback path and read through snapshots

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use comms_if::eqpt::axis::{AxisId, NUM_AXES};

use crate::geom::{CartesianPoint, DeltaGeometry, GeomError, JointAngles};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Callback notified with every newly computed pose.
pub type PoseObserver = Box<dyn Fn(&CartesianPoint) + Send>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Last known pose of the robot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RobotState {
    /// Latest committed encoder angle of each axis.
    ///
    /// Units: radians
    pub last_angles_rad: [Option<f64>; NUM_AXES],

    /// Platform position derived from `last_angles_rad`.
    pub last_cartesian: Option<CartesianPoint>,

    /// Angles received since the last commit, once a first pose exists.
    #[serde(skip)]
    staged_rad: [Option<f64>; NUM_AXES],
}

/// A consistent copy of the robot's state.
///
/// When `cartesian` is set it was computed from exactly `angles_rad`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RobotSnapshot {
    pub cartesian: Option<CartesianPoint>,

    /// Units: radians
    pub angles_rad: [Option<f64>; NUM_AXES],
}

/// The state shared between the control thread and the bus receive thread.
pub(crate) struct SharedState {
    geom: DeltaGeometry,

    state: Mutex<RobotState>,

    observer: Mutex<Option<PoseObserver>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What a single feedback value did to the state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackOutcome {
    /// The angle was stored, the pose is unchanged.
    Stored,

    /// A new pose was committed.
    Updated(CartesianPoint),

    /// A pose could not be computed, the previous one is kept.
    Rejected(GeomError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotState {
    /// Apply one encoder reading.
    ///
    /// Until the first pose has been computed readings are stored directly, and a pose is
    /// attempted as soon as every axis has reported. Afterwards readings are staged, and only
    /// once all three axes have been refreshed are the angles committed together with the pose
    /// computed from them.
    pub fn apply_feedback(
        &mut self,
        geom: &DeltaGeometry,
        axis: AxisId,
        angle_rad: f64,
    ) -> FeedbackOutcome {
        let idx = axis.index();

        if self.last_cartesian.is_none() {
            self.last_angles_rad[idx] = Some(angle_rad);

            return match complete(&self.last_angles_rad) {
                Some(angles) => match geom.direct(&angles) {
                    Ok(point) => {
                        self.last_cartesian = Some(point);
                        FeedbackOutcome::Updated(point)
                    }
                    Err(e) => FeedbackOutcome::Rejected(e),
                },
                None => FeedbackOutcome::Stored,
            };
        }

        self.staged_rad[idx] = Some(angle_rad);

        let angles = match complete(&self.staged_rad) {
            Some(a) => a,
            None => return FeedbackOutcome::Stored,
        };
        self.staged_rad = [None; NUM_AXES];

        match geom.direct(&angles) {
            Ok(point) => {
                self.last_angles_rad = [Some(angles.a_rad), Some(angles.b_rad), Some(angles.c_rad)];
                self.last_cartesian = Some(point);
                FeedbackOutcome::Updated(point)
            }
            Err(e) => FeedbackOutcome::Rejected(e),
        }
    }

    pub fn snapshot(&self) -> RobotSnapshot {
        RobotSnapshot {
            cartesian: self.last_cartesian,
            angles_rad: self.last_angles_rad,
        }
    }
}

impl SharedState {
    pub fn new(geom: DeltaGeometry) -> Self {
        Self {
            geom,
            state: Mutex::new(RobotState::default()),
            observer: Mutex::new(None),
        }
    }

    /// Apply a reading and notify the observer of any new pose.
    ///
    /// Runs on the bus receive thread and never panics.
    pub fn on_feedback(&self, axis: AxisId, angle_rad: f64) -> FeedbackOutcome {
        let outcome = lock(&self.state).apply_feedback(&self.geom, axis, angle_rad);

        match outcome {
            FeedbackOutcome::Stored => (),
            FeedbackOutcome::Updated(point) => {
                debug!("Robot pose updated to {}", point);
                if let Some(observer) = lock(&self.observer).as_ref() {
                    observer(&point);
                }
            }
            FeedbackOutcome::Rejected(e) => {
                warn!("Could not compute the robot pose from encoder feedback: {}", e)
            }
        }

        outcome
    }

    pub fn snapshot(&self) -> RobotSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn set_observer(&self, observer: Option<PoseObserver>) {
        *lock(&self.observer) = observer;
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn complete(angles_rad: &[Option<f64>; NUM_AXES]) -> Option<JointAngles> {
    match angles_rad {
        [Some(a), Some(b), Some(c)] => Some(JointAngles::new(*a, *b, *c)),
        _ => None,
    }
}

/// Lock ignoring poisoning, the state is only ever replaced whole.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread};

    const WORKING_RAD: f64 = -0.657;
    const LOW_RAD: f64 = -0.5;

    #[test]
    fn test_first_pose_needs_all_axes() {
        let geom = DeltaGeometry::default();
        let mut state = RobotState::default();

        assert_eq!(state.apply_feedback(&geom, AxisId::A, WORKING_RAD), FeedbackOutcome::Stored);
        assert_eq!(state.apply_feedback(&geom, AxisId::A, WORKING_RAD), FeedbackOutcome::Stored);
        assert_eq!(state.apply_feedback(&geom, AxisId::C, WORKING_RAD), FeedbackOutcome::Stored);
        assert_eq!(
            state.snapshot().angles_rad,
            [Some(WORKING_RAD), None, Some(WORKING_RAD)]
        );
        assert!(state.snapshot().cartesian.is_none());

        match state.apply_feedback(&geom, AxisId::B, WORKING_RAD) {
            FeedbackOutcome::Updated(p) => assert!((p.z_m - -0.13).abs() < 1.5e-3),
            o => panic!("Unexpected outcome {:?}", o),
        }
    }

    #[test]
    fn test_refresh_is_committed_whole() {
        let geom = DeltaGeometry::default();
        let mut state = RobotState::default();

        for axis in AxisId::ALL.iter() {
            state.apply_feedback(&geom, *axis, WORKING_RAD);
        }
        let first = state.snapshot();

        // A partial refresh isn't visible
        state.apply_feedback(&geom, AxisId::A, LOW_RAD);
        state.apply_feedback(&geom, AxisId::B, LOW_RAD);
        assert_eq!(state.snapshot(), first);

        match state.apply_feedback(&geom, AxisId::C, LOW_RAD) {
            FeedbackOutcome::Updated(_) => (),
            o => panic!("Unexpected outcome {:?}", o),
        }
        assert_eq!(state.snapshot().angles_rad, [Some(LOW_RAD); 3]);
    }

    #[test]
    fn test_failed_refresh_keeps_pose() {
        let geom = DeltaGeometry::default();
        let mut state = RobotState::default();

        for axis in AxisId::ALL.iter() {
            state.apply_feedback(&geom, *axis, WORKING_RAD);
        }
        let first = state.snapshot();

        // Unreachable angle set
        state.apply_feedback(&geom, AxisId::A, 0.5);
        state.apply_feedback(&geom, AxisId::B, 0.5);
        assert_eq!(
            state.apply_feedback(&geom, AxisId::C, 0.5),
            FeedbackOutcome::Rejected(GeomError::JointLimit)
        );
        assert_eq!(state.snapshot(), first);

        // The next full refresh starts from scratch
        state.apply_feedback(&geom, AxisId::A, LOW_RAD);
        assert_eq!(state.snapshot(), first);
    }

    #[test]
    fn test_snapshots_never_torn() {
        let geom = DeltaGeometry::default();
        let shared = Arc::new(SharedState::new(geom));

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    let angle = if i % 2 == 0 { WORKING_RAD } else { LOW_RAD };

                    // Vary the order the axes report in
                    let mut axes = AxisId::ALL;
                    axes.rotate_left(i % NUM_AXES);

                    for axis in axes.iter() {
                        shared.on_feedback(*axis, angle);
                    }
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..5000 {
                        let snap = shared.snapshot();
                        if let Some(point) = snap.cartesian {
                            let angles = complete(&snap.angles_rad).unwrap();

                            // All angles come from the same refresh
                            assert_eq!(angles.a_rad, angles.b_rad);
                            assert_eq!(angles.b_rad, angles.c_rad);

                            // And the pose is the one computed from them
                            assert_eq!(geom.direct(&angles), Ok(point));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }

        assert_eq!(shared.snapshot().angles_rad, [Some(LOW_RAD); 3]);
    }

    #[test]
    fn test_observer_notified() {
        let shared = SharedState::new(DeltaGeometry::default());
        let (tx, rx) = std::sync::mpsc::channel();

        shared.set_observer(Some(Box::new(move |p: &CartesianPoint| {
            tx.send(*p).unwrap();
        })));

        for axis in AxisId::ALL.iter() {
            shared.on_feedback(*axis, WORKING_RAD);
        }

        let point = rx.try_recv().unwrap();
        assert_eq!(Some(point), shared.snapshot().cartesian);
        assert!(rx.try_recv().is_err());
    }
}
