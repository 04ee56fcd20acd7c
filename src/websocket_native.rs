//! Native WebSocket client for cityIO
//!
//! Uses tokio-tungstenite in a background thread, with channel-based message passing.
//! The connection is re-established after every close or error; each new
//! connection subscribes to the table again.

use crate::core::protocol::TableName;
use crate::core::ConnectionSupervisor;
use crate::ws_state::WsState;
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Native WebSocket client that runs in a background thread
pub struct NativeWsClient {
    /// Receiver for incoming messages
    pub rx: Receiver<String>,
    /// Shared connection state
    pub state: Arc<Mutex<WsState>>,
    shutdown: Arc<Notify>,
}

/// Why a single connection ended
enum Ended {
    /// Closed or failed; try again
    Retry,
    /// Client dropped; stop for good
    Stop,
}

impl NativeWsClient {
    /// Connect to a WebSocket endpoint and subscribe to `table`
    ///
    /// Spawns a background thread with a tokio runtime to handle the connection.
    /// Messages are sent through the returned receiver.
    pub fn connect(url: &str, table: TableName) -> Self {
        let (tx, rx): (Sender<String>, Receiver<String>) = mpsc::channel();
        let state = Arc::new(Mutex::new(WsState::Connecting));
        let shutdown = Arc::new(Notify::new());

        let url = url.to_string();
        let state_clone = state.clone();
        let shutdown_clone = shutdown.clone();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "Failed to create tokio runtime");
                    *state_clone.lock() = WsState::Error(e.to_string());
                    return;
                }
            };
            rt.block_on(async move {
                Self::run(&url, table, tx, state_clone, shutdown_clone).await;
            });
        });

        Self { rx, state, shutdown }
    }

    pub fn state(&self) -> WsState {
        self.state.lock().clone()
    }

    async fn run(
        url: &str,
        table: TableName,
        tx: Sender<String>,
        state: Arc<Mutex<WsState>>,
        shutdown: Arc<Notify>,
    ) {
        let mut supervisor = ConnectionSupervisor::new(table);

        loop {
            supervisor.on_connecting();
            *state.lock() = supervisor.state().clone();

            let ended = tokio::select! {
                ended = Self::run_connection(url, &mut supervisor, &tx, &state) => ended,
                _ = shutdown.notified() => Ended::Stop,
            };
            if let Ended::Stop = ended {
                break;
            }

            let delay = supervisor.on_closed();
            *state.lock() = supervisor.state().clone();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.notified() => break,
            }
        }

        info!("WebSocket client stopped");
        *state.lock() = WsState::Disconnected;
    }

    async fn run_connection(
        url: &str,
        supervisor: &mut ConnectionSupervisor,
        tx: &Sender<String>,
        state: &Mutex<WsState>,
    ) -> Ended {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::{connect_async, tungstenite::Message};

        info!(url, "Connecting to WebSocket");

        let ws_stream = match connect_async(url).await {
            Ok((stream, _)) => {
                info!("WebSocket connected");
                stream
            }
            Err(e) => {
                error!(error = %e, "Failed to connect");
                supervisor.on_error(e.to_string());
                *state.lock() = supervisor.state().clone();
                return Ended::Retry;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let listen = supervisor.on_open();
        *state.lock() = supervisor.state().clone();
        if let Some(listen) = listen {
            let text = match listen.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to encode subscribe message");
                    return Ended::Stop;
                }
            };
            debug!(message = %text, "Sending subscribe message");
            if let Err(e) = write.send(Message::Text(text)).await {
                error!(error = %e, "Failed to send subscribe message");
                supervisor.on_error(e.to_string());
                *state.lock() = supervisor.state().clone();
                return Ended::Retry;
            }
        }

        // Read messages and send through channel
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if tx.send(text.to_string()).is_err() {
                        // Receiver dropped, exit
                        return Ended::Stop;
                    }
                }
                Ok(Message::Close(_)) => {
                    warn!("WebSocket closed by server");
                    return Ended::Retry;
                }
                Err(e) => {
                    supervisor.on_error(e.to_string());
                    *state.lock() = supervisor.state().clone();
                    return Ended::Retry;
                }
                _ => {}
            }
        }

        warn!("WebSocket stream ended");
        Ended::Retry
    }
}

impl Drop for NativeWsClient {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}
