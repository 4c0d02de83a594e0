use thiserror::Error;

/// Top-level error type for the PageSight engine.
///
/// Each variant maps onto one recovery path in the controller: transport
/// errors trigger inject-and-retry, provider errors become sentinel values,
/// and everything else is reported to the user as a spoken notice.
#[derive(Debug, Error)]
pub enum PageSightError {
    #[error("page scanner unavailable: {0}")]
    ScannerUnavailable(String),

    #[error("cannot access page: {0}")]
    PageInaccessible(String),

    #[error("no active page could be resolved")]
    NoActiveTarget,

    #[error("provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("remote execution failed: {0}")]
    RemoteExecution(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PageSightError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }
}
