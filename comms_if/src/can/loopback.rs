//! # Loopback Transport
//!
//! An in-process [`CanTransport`] which records outbound frames and lets the owner inject inbound
//! ones. Used by tests and by virtual runs of the executable, where it can also echo position
//! commands back as encoder feedback so the rest of the software sees a perfect robot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::{HashMap, HashSet},
    sync::{
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use super::{codec, CanId, CanTransport, RawFrame, TransportError};
use crate::eqpt::axis::AxisCommand;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to a loopback bus. Clones share the same bus.
#[derive(Clone)]
pub struct Loopback {
    inner: Arc<Inner>,
}

struct Inner {
    sent: Mutex<Vec<RawFrame>>,

    inbound_tx: Mutex<Sender<RawFrame>>,
    inbound_rx: Mutex<Receiver<RawFrame>>,

    failing_ids: Mutex<HashSet<CanId>>,
    fatal: Mutex<bool>,

    /// Motor ID to encoder ID pairs for which position commands are echoed as feedback.
    echo: Mutex<HashMap<CanId, CanId>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Loopback {
    pub fn new() -> Self {
        let (tx, rx) = channel();

        Self {
            inner: Arc::new(Inner {
                sent: Mutex::new(Vec::new()),
                inbound_tx: Mutex::new(tx),
                inbound_rx: Mutex::new(rx),
                failing_ids: Mutex::new(HashSet::new()),
                fatal: Mutex::new(false),
                echo: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Echo every position command sent to `motor` back as feedback from `encoder`.
    ///
    /// The commanded angle (degrees) is reported in radians, as a real encoder board would.
    pub fn echo_positions(&self, motor: CanId, encoder: CanId) {
        lock(&self.inner.echo).insert(motor, encoder);
    }

    /// Queue a frame for the receiving side.
    pub fn inject(&self, frame: RawFrame) {
        // The receiver lives in the same Arc so sending cannot fail
        lock(&self.inner.inbound_tx).send(frame).ok();
    }

    /// All frames successfully sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<RawFrame> {
        lock(&self.inner.sent).clone()
    }

    pub fn clear_sent(&self) {
        lock(&self.inner.sent).clear();
    }

    /// Make every send to `id` fail with a transmit error.
    pub fn fail_sends_to(&self, id: CanId) {
        lock(&self.inner.failing_ids).insert(id);
    }

    pub fn restore_sends_to(&self, id: CanId) {
        lock(&self.inner.failing_ids).remove(&id);
    }

    /// While set, every operation fails with a fatal transport error.
    pub fn set_fatal(&self, fatal: bool) {
        *lock(&self.inner.fatal) = fatal;
    }

    fn is_fatal(&self) -> bool {
        *lock(&self.inner.fatal)
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl CanTransport for Loopback {
    fn send_frame(&self, frame: &RawFrame) -> Result<(), TransportError> {
        if self.is_fatal() {
            return Err(TransportError::Fatal("loopback bus is down".into()));
        }

        if lock(&self.inner.failing_ids).contains(&frame.id) {
            return Err(TransportError::TxFailed(format!(
                "no acknowledgement from {}",
                frame.id
            )));
        }

        lock(&self.inner.sent).push(*frame);

        let echo_id = lock(&self.inner.echo).get(&frame.id).copied();
        if let Some(encoder) = echo_id {
            if let Some(AxisCommand::Position { angle_deg }) = codec::decode_command(&frame.data) {
                self.inject(RawFrame::new(
                    encoder,
                    codec::encode_feedback(angle_deg.to_radians()),
                ));
            }
        }

        Ok(())
    }

    fn recv_frame(&self, timeout: Duration) -> Result<Option<RawFrame>, TransportError> {
        if self.is_fatal() {
            return Err(TransportError::Fatal("loopback bus is down".into()));
        }

        match lock(&self.inner.inbound_rx).recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TransportError::Fatal("loopback inbound queue closed".into()))
            }
        }
    }

    fn channel_info(&self) -> String {
        "loopback".into()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock ignoring poisoning, the loopback's state is always valid between operations.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::super::IdProfile;
    use super::*;

    #[test]
    fn test_echo_positions() {
        let bus = Loopback::new();
        let motor = CanId::new(0x10, IdProfile::Standard).unwrap();
        let encoder = CanId::new(0x01, IdProfile::Standard).unwrap();
        bus.echo_positions(motor, encoder);

        bus.send_frame(&RawFrame::new(motor, codec::encode_position(-45.0)))
            .unwrap();
        bus.send_frame(&RawFrame::new(motor, codec::encode_homing(5.0)))
            .unwrap();

        let frame = bus
            .recv_frame(Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(frame.id, encoder);
        let angle = codec::decode_feedback(&frame.data);
        assert!((angle - (-45f64).to_radians()).abs() < 1e-9);

        // Homing isn't echoed
        assert!(bus
            .recv_frame(Duration::from_millis(10))
            .unwrap()
            .is_none());
        assert_eq!(bus.sent_frames().len(), 2);
    }
}
