//! Minimal CDP client: one browser-level WebSocket, flattened target sessions.

mod client;
mod error;
pub mod protocol;

pub use client::CdpClient;
pub use error::CdpError;
