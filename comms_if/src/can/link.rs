//! # CAN Link
//!
//! [`CanLink`] owns one CAN channel. Commands are sent synchronously from the caller's thread
//! while a background thread dispatches every inbound frame to a single registered handler.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace, warn};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use super::{CanId, CanTransport, Payload, RawFrame, TransportError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum time the receive thread blocks before checking for shutdown.
const RECV_POLL_PERIOD: Duration = Duration::from_millis(50);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An open CAN channel with asynchronous receive dispatch.
///
/// Closing the link releases the transport. The link is closed when dropped, so this happens on
/// every exit path of the owner.
pub struct CanLink {
    /// `None` once the link is closed.
    transport: Mutex<Option<Arc<dyn CanTransport>>>,

    channel_info: String,

    shutdown: Arc<AtomicBool>,

    join_handle: Mutex<Option<JoinHandle<()>>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum CanLinkError {
    #[error("Could not send the frame: {0}")]
    SendFailure(String),

    #[error("The transport failed and the link has been closed: {0}")]
    Fatal(String),

    #[error("The link is closed")]
    Closed,

    #[error("Could not start the receive thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CanLink {
    /// Open a link over the given transport.
    ///
    /// `handler` is called from the receive thread for every inbound frame, one frame at a time.
    /// It must not call [`CanLink::send`] on this link.
    pub fn open<T, H>(transport: T, handler: H) -> Result<Self, CanLinkError>
    where
        T: CanTransport + 'static,
        H: FnMut(RawFrame) + Send + 'static,
    {
        let transport: Arc<dyn CanTransport> = Arc::new(transport);
        let shutdown = Arc::new(AtomicBool::new(false));

        let transport_clone = transport.clone();
        let shutdown_clone = shutdown.clone();

        let join_handle = thread::Builder::new()
            .name("can_recv".into())
            .spawn(move || recv_thread(transport_clone, shutdown_clone, handler))
            .map_err(CanLinkError::SpawnError)?;

        let channel_info = transport.channel_info();
        info!("CAN link opened on {}", channel_info);

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            channel_info,
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    /// Send one payload to the given destination.
    ///
    /// Transmit errors are returned as [`CanLinkError::SendFailure`] and are not retried. Any
    /// other transport error closes the link.
    pub fn send(&self, id: CanId, payload: Payload) -> Result<(), CanLinkError> {
        if self.is_closed() {
            return Err(CanLinkError::Closed);
        }

        let transport = match self.transport.lock() {
            Ok(t) => t.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
        .ok_or(CanLinkError::Closed)?;

        let frame = RawFrame::new(id, payload);

        match transport.send_frame(&frame) {
            Ok(()) => {
                trace!("TX {} {:02X?}", id, payload);
                Ok(())
            }
            Err(TransportError::TxFailed(e)) => {
                debug!("TX {} failed: {}", id, e);
                Err(CanLinkError::SendFailure(e))
            }
            Err(TransportError::Fatal(e)) => {
                error!("Fatal transport error while sending to {}: {}", id, e);
                self.close();
                Err(CanLinkError::Fatal(e))
            }
        }
    }

    /// Returns true once the link has been closed, either explicitly or after a fatal transport
    /// error.
    pub fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stop receive dispatch, join the receive thread and release the transport.
    ///
    /// Safe to call any number of times. Must not be called from the receive handler.
    pub fn close(&self) {
        self.shutdown.store(true, Ordering::Relaxed);

        let join_handle = match self.join_handle.lock() {
            Ok(mut jh) => jh.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(jh) = join_handle {
            if jh.join().is_err() {
                warn!("CAN receive thread exited with a panic");
            }
        }

        // The receive thread's handle is gone now, so this is the last owner apart from any send
        // in progress
        let transport = match self.transport.lock() {
            Ok(mut t) => t.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if transport.is_some() {
            info!("CAN link on {} closed", self.channel_info);
        }
    }
}

impl Drop for CanLink {
    fn drop(&mut self) {
        self.close();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn recv_thread<H>(transport: Arc<dyn CanTransport>, shutdown: Arc<AtomicBool>, mut handler: H)
where
    H: FnMut(RawFrame),
{
    while !shutdown.load(Ordering::Relaxed) {
        match transport.recv_frame(RECV_POLL_PERIOD) {
            Ok(Some(frame)) => {
                trace!("RX {} {:02X?}", frame.id, frame.data);

                // A misbehaving handler must not take down feedback delivery
                if panic::catch_unwind(AssertUnwindSafe(|| handler(frame))).is_err() {
                    error!("CAN receive handler panicked on frame from {}", frame.id);
                }
            }
            Ok(None) => (),
            Err(TransportError::TxFailed(e)) => warn!("Unexpected transmit error on receive: {}", e),
            Err(TransportError::Fatal(e)) => {
                error!("Fatal transport error, stopping receive dispatch: {}", e);
                shutdown.store(true, Ordering::Relaxed);
            }
        }
    }
}
