//! Shared WebSocket connection state
//!
//! Used by both WASM and native WebSocket clients.

use std::fmt;

/// WebSocket connection state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WsState {
    Connecting,
    Connected,
    /// Waiting out the backoff before reconnect attempt `attempt`
    Reconnecting { attempt: u32 },
    Disconnected,
    Error(String),
}

impl WsState {
    pub fn is_connected(&self) -> bool {
        matches!(self, WsState::Connected)
    }

    /// Short label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            WsState::Connecting => "Connecting...",
            WsState::Connected => "Connected",
            WsState::Reconnecting { .. } => "Reconnecting...",
            WsState::Disconnected => "Disconnected",
            WsState::Error(_) => "Error",
        }
    }
}

impl fmt::Display for WsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsState::Reconnecting { attempt } => write!(f, "{} (attempt {attempt})", self.label()),
            WsState::Error(e) => write!(f, "{}: {e}", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}
