//! Cloneable handle for outbound frames.
//!
//! Frames are queued on a channel drained by the connection loop, so the
//! handle stays valid across reconnects. Sending is fire-and-forget: replies
//! come back as push frames.

use crate::connection::ConnectionState;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Error returned when a frame could not be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The socket is not currently connected.
    NotConnected,
    /// The connection manager has shut down.
    ChannelClosed,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for SendError {}

#[derive(Clone)]
pub struct WsWriteHandle {
    tx: mpsc::Sender<String>,
    state: Arc<RwLock<ConnectionState>>,
}

impl WsWriteHandle {
    pub fn new(tx: mpsc::Sender<String>, state: Arc<RwLock<ConnectionState>>) -> Self {
        Self { tx, state }
    }

    /// Queue a text frame.
    pub async fn send_text(&self, text: String) -> Result<(), SendError> {
        if *self.state.read() != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        self.tx
            .send(text)
            .await
            .map_err(|_| SendError::ChannelClosed)?;
        trace!("Frame queued");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Connected && !self.tx.is_closed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }
}
