//! Chrome DevTools Protocol bridge.
//!
//! Connects to a Chrome started with `--remote-debugging-port` and provides
//! the page-facing collaborators: target resolution, the scanner transport,
//! remote execution of page scripts, and first-page rendering of PDFs.

pub mod bridge;
pub mod cdp;
pub mod scanner;
pub mod scripts;

pub use bridge::{CdpBridge, BridgeOptions};
pub use cdp::{CdpClient, CdpError};
pub use scanner::{REQUEST_SNAPSHOT_JS, SCANNER_JS};
pub use scripts::render_script;
