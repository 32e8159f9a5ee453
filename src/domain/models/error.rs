use thiserror::Error;

/// Failure classes the coordinator reacts to differently. Each class maps to
/// its own user-visible message; none of them ever terminates the session.
#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("HTTP {status}")]
    Transport { status: u16 },

    #[error("{0}")]
    Connect(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed payload: {0}")]
    Protocol(String),

    #[error("recognition link: {0}")]
    Link(String),
}
