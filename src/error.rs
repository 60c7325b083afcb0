//! Error types for the OSC volume bridge

use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed or missing OSC arguments.
///
/// Always logged and dropped by the dispatcher, never sent back to the client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("missing argument #{index}")]
    Missing { index: usize },

    #[error("not a number: {0}")]
    NotNumeric(String),

    #[error("unsupported OSC argument type: {0}")]
    Unsupported(&'static str),

    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    #[error("empty process name")]
    EmptyProcessName,
}

/// Audio subsystem errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio backend error: {0}")]
    Backend(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for AudioError {
    fn from(err: windows::core::Error) -> Self {
        AudioError::Backend(format!("{} (0x{:08X})", err.message(), err.code().0))
    }
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Failed to spawn listener thread: {0}")]
    SpawnFailed(String),
}

impl Error {
    /// True when this is the port-bind failure surfaced by `start`.
    pub fn is_bind_error(&self) -> bool {
        matches!(self, Error::Network(NetworkError::BindFailed { .. }))
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
