//! # CAN Module
//!
//! This module provides the application-level CAN protocol used to talk to the robot's boards:
//! - [`codec`] - the fixed 8-byte payload layouts for motor commands and encoder feedback
//! - [`link`] - [`CanLink`], which owns a bus channel and dispatches inbound frames on a
//!   background thread
//! - [`CanTransport`] implementations: Linux SocketCAN and an in-process [`Loopback`]

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod codec;
pub mod link;
pub mod loopback;

#[cfg(target_os = "linux")]
pub mod socket;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

pub use link::{CanLink, CanLinkError};
pub use loopback::Loopback;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of every payload exchanged with the boards.
pub const PAYLOAD_LEN: usize = 8;

/// Largest 11 bit (CAN 2.0A) identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Largest 29 bit (CAN 2.0B) identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A CAN payload, always exactly [`PAYLOAD_LEN`] bytes.
pub type Payload = [u8; PAYLOAD_LEN];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A data frame as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub id: CanId,
    pub data: Payload,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Addressing profile of an installation.
///
/// The profile must be the same for the motor-command and encoder-feedback sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdProfile {
    /// 11 bit arbitration IDs
    Standard,

    /// 29 bit arbitration IDs
    Extended,
}

/// An arbitration ID, tagged with the addressing it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanId {
    Standard(u16),
    Extended(u32),
}

#[derive(Debug, thiserror::Error)]
#[error("ID {id:#x} does not fit the {profile:?} addressing profile")]
pub struct InvalidCanId {
    pub id: u32,
    pub profile: IdProfile,
}

/// Errors reported by a [`CanTransport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The frame could not be transmitted. The transport is still usable.
    #[error("Transmit failed: {0}")]
    TxFailed(String),

    /// The transport is unusable and must be released.
    #[error("Transport failure: {0}")]
    Fatal(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A physical or virtual CAN channel.
///
/// Sending and receiving happen concurrently from different threads, so implementations must
/// allow both through a shared reference.
pub trait CanTransport: Send + Sync {
    /// Transmit one frame, blocking until the transport accepts it.
    fn send_frame(&self, frame: &RawFrame) -> Result<(), TransportError>;

    /// Wait up to `timeout` for an inbound frame, returning `Ok(None)` if none arrived.
    fn recv_frame(&self, timeout: Duration) -> Result<Option<RawFrame>, TransportError>;

    /// Human readable description of the channel, for logs.
    fn channel_info(&self) -> String;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CanId {
    /// Build an ID under the given addressing profile, checking it fits.
    pub fn new(id: u32, profile: IdProfile) -> Result<Self, InvalidCanId> {
        match profile {
            IdProfile::Standard if id <= MAX_STANDARD_ID => Ok(CanId::Standard(id as u16)),
            IdProfile::Extended if id <= MAX_EXTENDED_ID => Ok(CanId::Extended(id)),
            _ => Err(InvalidCanId { id, profile }),
        }
    }

    /// The numeric arbitration ID.
    pub fn raw(&self) -> u32 {
        match *self {
            CanId::Standard(id) => id as u32,
            CanId::Extended(id) => id,
        }
    }

    pub fn profile(&self) -> IdProfile {
        match self {
            CanId::Standard(_) => IdProfile::Standard,
            CanId::Extended(_) => IdProfile::Extended,
        }
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanId::Standard(id) => write!(f, "{:03X}", id),
            CanId::Extended(id) => write!(f, "{:08X}", id),
        }
    }
}

impl RawFrame {
    pub fn new(id: CanId, data: Payload) -> Self {
        Self { id, data }
    }
}
