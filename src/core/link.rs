//! Connection supervision shared by the native and WASM transports
//!
//! The transport reconnects unconditionally after every close or error. The
//! supervisor decides how long to wait before each attempt (bounded
//! exponential backoff) and guarantees a single `LISTEN` per connection.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::protocol::{OutboundMessage, TableName};
use crate::ws_state::WsState;

pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ConnectionSupervisor {
    table: TableName,
    state: WsState,
    /// Failed attempts since the last successful open
    failures: u32,
    /// LISTEN already sent on the current connection
    subscribed: bool,
}

impl ConnectionSupervisor {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            state: WsState::Connecting,
            failures: 0,
            subscribed: false,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn state(&self) -> &WsState {
        &self.state
    }

    /// Connection opened. Returns the subscribe message to send, at most once per connection.
    pub fn on_open(&mut self) -> Option<OutboundMessage> {
        self.state = WsState::Connected;
        self.failures = 0;
        if self.subscribed {
            debug!(table = %self.table, "Already subscribed on this connection");
            return None;
        }
        self.subscribed = true;
        info!(table = %self.table, "Subscribing to table");
        Some(OutboundMessage::listen(&self.table))
    }

    /// Transport reported an error; a close (and reconnect) follows
    pub fn on_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "WebSocket error");
        self.state = WsState::Error(message);
    }

    /// Connection closed or could not be established. Returns how long to wait
    /// before the next attempt.
    pub fn on_closed(&mut self) -> Duration {
        self.subscribed = false;
        let delay = backoff(self.failures);
        self.failures = self.failures.saturating_add(1);
        self.state = WsState::Reconnecting { attempt: self.failures };
        info!(attempt = self.failures, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        delay
    }

    /// Reconnect attempt starting now
    pub fn on_connecting(&mut self) {
        self.state = WsState::Connecting;
    }
}

/// Live connection plus the one that just closed.
///
/// A closed connection is kept until the next attempt starts so its handlers
/// are not released while one of them is still running. At most two
/// connections are ever held, however many reconnects happen.
#[derive(Debug)]
pub struct ConnectionSlot<T> {
    current: Option<T>,
    retired: Option<T>,
}

impl<T> Default for ConnectionSlot<T> {
    fn default() -> Self {
        Self {
            current: None,
            retired: None,
        }
    }
}

impl<T> ConnectionSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new attempt starts: release the connection retired by the last close
    pub fn begin_attempt(&mut self) {
        self.retired = None;
    }

    pub fn install(&mut self, conn: T) {
        self.retired = None;
        self.current = Some(conn);
    }

    /// The live connection closed
    pub fn retire(&mut self) {
        self.retired = self.current.take();
    }

    /// Empty the slot, returning the live connection
    pub fn take(&mut self) -> Option<T> {
        self.retired = None;
        self.current.take()
    }

    pub fn held(&self) -> usize {
        self.current.is_some() as usize + self.retired.is_some() as usize
    }
}

/// `INITIAL_BACKOFF * 2^failures`, capped at `MAX_BACKOFF`
pub fn backoff(failures: u32) -> Duration {
    let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
    INITIAL_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF)
}
