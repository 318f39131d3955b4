//! Push channel connection manager.
//!
//! Owns the socket lifecycle: connect, replay the `on_connect` frames,
//! forward decoded push messages, keep the link alive with pings, and
//! reconnect with exponential backoff until shut down.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{decode_push, PushMessage};
use crate::ws_write_handle::WsWriteHandle;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

type Writer = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Capacity of the outbound frame queue shared by all write handles.
const OUTBOUND_CAPACITY: usize = 256;

/// How long to wait between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failures before giving up. Zero retries forever.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }

    /// `base * 2^(attempt-1)` capped at `max_delay`, plus up to a quarter
    /// of that as jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay);
        delay + jitter(delay / 4)
    }
}

fn jitter(up_to: Duration) -> Duration {
    let span = up_to.as_millis() as u64;
    if span == 0 {
        return Duration::ZERO;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or_default();
    Duration::from_millis(nanos % span)
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: String,
    /// Frames sent right after every (re)connect, in order.
    pub on_connect: Vec<String>,
    pub reconnect: ReconnectPolicy,
    /// Silence after which a ping goes out.
    pub ping_after: Duration,
    /// A ping unanswered for this long kills the socket.
    pub pong_within: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            on_connect: Vec::new(),
            reconnect: ReconnectPolicy::default(),
            ping_after: Duration::from_secs(45),
            pong_within: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: HeartbeatManager,
    push_tx: mpsc::Sender<PushMessage>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: TokioMutex<mpsc::Receiver<String>>,
    stop: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, push_tx: mpsc::Sender<PushMessage>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let heartbeat = HeartbeatManager::new(
            config.ping_after.as_millis() as u64,
            config.pong_within.as_millis() as u64,
        );
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            heartbeat,
            push_tx,
            outbound_tx,
            outbound_rx: TokioMutex::new(outbound_rx),
            stop: CancellationToken::new(),
        }
    }

    /// Handle for queuing outbound frames. Survives reconnects.
    pub fn write_handle(&self) -> WsWriteHandle {
        WsWriteHandle::new(self.outbound_tx.clone(), self.state.clone())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Ask the socket loop and the reconnect loop to stop.
    pub fn shutdown(&self) {
        info!("Push channel shutdown requested");
        self.stop.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Connect and keep the channel up until shutdown or until the
    /// reconnect policy gives up.
    pub async fn connect(&self) -> WsResult<()> {
        let mut failures = 0u32;

        while !self.is_shutdown() {
            self.set_state(ConnectionState::Connecting);
            let result = self.run_socket(&mut failures).await;
            self.set_state(ConnectionState::Disconnected);

            if self.is_shutdown() {
                break;
            }
            match result {
                Ok(()) => info!("Push channel ended"),
                Err(e) => error!(error = %e, "Push channel failed"),
            }

            failures += 1;
            if self.config.reconnect.exhausted(failures) {
                error!(failures, "Giving up on the push channel");
                return Err(WsError::ReconnectExhausted { attempts: failures });
            }

            let delay = self.config.reconnect.delay_for(failures);
            warn!(failures, delay_ms = delay.as_millis() as u64, "Reconnecting");
            self.set_state(ConnectionState::Reconnecting);

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.stop.cancelled() => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write();
        if *state != next {
            debug!(from = ?*state, to = ?next, "Connection state");
            *state = next;
        }
    }

    /// One socket from handshake to close. `failures` is cleared once the
    /// handshake frames are out.
    async fn run_socket(&self, failures: &mut u32) -> WsResult<()> {
        info!(url = %self.config.url, "Opening push channel");

        let (socket, _) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut writer, mut reader) = socket.split();

        for frame in &self.config.on_connect {
            writer.send(Message::Text(frame.clone())).await?;
        }

        self.set_state(ConnectionState::Connected);
        *failures = 0;
        self.heartbeat.reset();
        info!(handshake_frames = self.config.on_connect.len(), "Push channel open");

        loop {
            let next_outbound = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                () = self.stop.cancelled() => {
                    if let Err(e) = writer.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not sent");
                    }
                    return Ok(());
                }

                inbound = reader.next() => match inbound {
                    Some(Ok(message)) => {
                        if let ControlFlow::Break(result) =
                            self.on_message(&mut writer, message).await
                        {
                            return result;
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        warn!("Push stream ended without a close frame");
                        return Ok(());
                    }
                },

                Some(text) = next_outbound => {
                    writer.send(Message::Text(text)).await?;
                }

                () = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        return Err(WsError::PongTimeout);
                    }
                    if self.heartbeat.should_send_ping() {
                        writer.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        trace!("Ping sent");
                    }
                }
            }
        }
    }

    async fn on_message(
        &self,
        writer: &mut Writer,
        message: Message,
    ) -> ControlFlow<WsResult<()>> {
        match message {
            Message::Text(text) => {
                self.heartbeat.record_frame();
                self.forward(&text).await;
            }
            Message::Ping(payload) => {
                self.heartbeat.record_frame();
                if let Err(e) = writer.send(Message::Pong(payload)).await {
                    return ControlFlow::Break(Err(e.into()));
                }
            }
            Message::Pong(_) => self.heartbeat.record_pong(),
            Message::Close(frame) => {
                let (code, reason) = close_details(frame);
                warn!(code, %reason, "Server closed the push channel");
                return ControlFlow::Break(Err(WsError::ClosedByServer { code, reason }));
            }
            Message::Binary(_) | Message::Frame(_) => {}
        }
        ControlFlow::Continue(())
    }

    /// Decode and forward one text frame. Bad frames are logged and skipped.
    async fn forward(&self, text: &str) {
        match decode_push(text) {
            Ok(Some(msg)) => {
                trace!(kind = msg.kind(), "Push message");
                if self.push_tx.send(msg).await.is_err() {
                    warn!("Push receiver dropped");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropping undecodable frame"),
        }
    }
}

fn close_details(frame: Option<CloseFrame<'_>>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.into_owned()),
        None => (1005, "no status".to_string()),
    }
}
