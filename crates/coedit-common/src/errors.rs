use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Room creation or channel establishment failed. Surfaced to the user;
/// nothing retries automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("room creation failed: {0}")]
    RoomCreation(String),

    #[error("invalid room id: {0:?}")]
    InvalidRoom(String),

    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("connection timed out after {0}ms")]
    Timeout(u64),
}

/// A send over an established channel failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("channel is closed")]
    Closed,

    #[error("outbound queue is full")]
    QueueFull,
}

/// A suggestion request failed. Recovered locally as "no suggestion".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum CoeditError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
