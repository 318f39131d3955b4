//! Push channel error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Server closed the channel: code={code}, reason={reason}")]
    ClosedByServer { code: u16, reason: String },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("No pong within the heartbeat window")]
    PongTimeout,

    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
