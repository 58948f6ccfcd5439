//! # SocketCAN Transport
//!
//! [`CanTransport`] over a Linux SocketCAN interface such as `can0` or `vcan0`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket, StandardId};
use std::{io, time::Duration};

use super::{CanId, CanTransport, Payload, RawFrame, TransportError, PAYLOAD_LEN};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// No buffer space available, the controller's transmit queue is full.
const ENOBUFS: i32 = 105;

/// The network is down, typically a bus-off controller being restarted.
const ENETDOWN: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SocketCanTransport {
    iface: String,
    socket: CanSocket,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SocketCanTransport {
    /// Open the named interface.
    pub fn open(iface: &str) -> io::Result<Self> {
        let socket = CanSocket::open(iface)?;

        Ok(Self {
            iface: iface.into(),
            socket,
        })
    }
}

impl CanTransport for SocketCanTransport {
    fn send_frame(&self, frame: &RawFrame) -> Result<(), TransportError> {
        let id: Id = match frame.id {
            CanId::Standard(raw) => StandardId::new(raw)
                .ok_or_else(|| TransportError::TxFailed(format!("invalid ID {}", frame.id)))?
                .into(),
            CanId::Extended(raw) => ExtendedId::new(raw)
                .ok_or_else(|| TransportError::TxFailed(format!("invalid ID {}", frame.id)))?
                .into(),
        };

        let can_frame = CanFrame::new(id, &frame.data)
            .ok_or_else(|| TransportError::TxFailed("could not build frame".into()))?;

        self.socket
            .write_frame(&can_frame)
            .map_err(|e| classify(e, true))
    }

    fn recv_frame(&self, timeout: Duration) -> Result<Option<RawFrame>, TransportError> {
        let frame = match self.socket.read_frame_timeout(timeout) {
            Ok(f) => f,
            Err(e) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => return Ok(None),
                _ => return Err(classify(e, false)),
            },
        };

        // Remote and error frames carry nothing for the application
        let data_frame = match frame {
            CanFrame::Data(d) => d,
            _ => return Ok(None),
        };

        let id = match data_frame.id() {
            Id::Standard(s) => CanId::Standard(s.as_raw()),
            Id::Extended(e) => CanId::Extended(e.as_raw()),
        };

        // Every application payload is exactly 8 bytes
        let bytes = data_frame.data();
        if bytes.len() != PAYLOAD_LEN {
            warn!(
                "Dropping frame from {} with {} data bytes, expected {}",
                id,
                bytes.len(),
                PAYLOAD_LEN
            );
            return Ok(None);
        }

        let mut data: Payload = [0; PAYLOAD_LEN];
        data.copy_from_slice(bytes);

        Ok(Some(RawFrame::new(id, data)))
    }

    fn channel_info(&self) -> String {
        format!("socketcan:{}", self.iface)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sort an IO error into a recoverable transmit failure or a fatal one.
fn classify(e: io::Error, sending: bool) -> TransportError {
    let recoverable = match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => sending,
        _ => matches!(e.raw_os_error(), Some(ENOBUFS) | Some(ENETDOWN)),
    };

    if recoverable {
        TransportError::TxFailed(e.to_string())
    } else {
        TransportError::Fatal(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn is_tx_failed(e: &TransportError) -> bool {
        matches!(e, TransportError::TxFailed(_))
    }

    #[test]
    fn test_classify() {
        // Full transmit queue and bus-off restarts are recoverable
        let e = classify(io::Error::from_raw_os_error(ENOBUFS), true);
        assert!(is_tx_failed(&e));
        let e = classify(io::Error::from_raw_os_error(ENETDOWN), false);
        assert!(is_tx_failed(&e));

        // A full non-blocking socket only matters when sending
        let e = classify(io::Error::from(io::ErrorKind::WouldBlock), true);
        assert!(is_tx_failed(&e));
        let e = classify(io::Error::from(io::ErrorKind::WouldBlock), false);
        assert!(!is_tx_failed(&e));

        // Anything else, such as the interface disappearing, is fatal
        let e = classify(io::Error::from_raw_os_error(19), true);
        assert!(matches!(e, TransportError::Fatal(_)));
    }
}
