//! Push channel to the brokerage.
//!
//! `ConnectionManager` keeps one socket alive across drops and turns
//! incoming text frames into `PushMessage`s. Orders go out through a
//! `WsWriteHandle`, which callers may clone freely.

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod ws_write_handle;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, ReconnectPolicy};
pub use error::{WsError, WsResult};
pub use message::{decode_push, PushMessage, RawFrame};
pub use ws_write_handle::{SendError, WsWriteHandle};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the ring TLS provider once per process, before the first `wss://` connect.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
