//! Failures talking to Chrome over the DevTools protocol.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdpError {
    /// Nothing usable answered on the debugging endpoint.
    #[error("Chrome is not reachable at {0}; start it with --remote-debugging-port=9222")]
    Unreachable(String),

    /// The WebSocket could not be opened, or went away mid-call.
    #[error("DevTools connection lost: {0}")]
    Disconnected(String),

    #[error("Chrome rejected the command: {message} (code {code})")]
    Protocol { code: i64, message: String },

    /// The evaluated page script threw.
    #[error("page script threw: {0}")]
    Script(String),

    #[error("{method} got no reply in time")]
    Timeout { method: String },

    #[error("unexpected reply: {0}")]
    Malformed(String),
}

impl CdpError {
    /// Whether a cached page session should be dropped and re-attached.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Timeout { .. } | Self::Disconnected(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Disconnected(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unreachable(e.to_string())
    }
}

impl From<serde_json::Error> for CdpError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
