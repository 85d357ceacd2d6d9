//! Error types for input synthesis.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for inputsynth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating devices or talking to the relay daemon.
#[derive(Debug, Error)]
pub enum Error {
    /// The device-control node is missing or access to it was denied.
    #[error("resource unavailable: {}: {source}", path.display())]
    ResourceUnavailable {
        /// Path of the control node that could not be opened.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Capability declaration, identity setup or device creation failed.
    #[error("device registration failed during {stage}: {source}")]
    DeviceRegistration {
        /// The handshake step that failed.
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    /// The operation is not valid in the component's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A single raw-event write failed.
    #[error("failed to emit event: {0}")]
    Emit(#[source] io::Error),

    /// The relay daemon could not be reached.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Reasons a relay daemon connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The daemon binary does not exist.
    #[error("daemon binary not found at {}", .0.display())]
    DaemonNotFound(PathBuf),

    /// The daemon process could not be started.
    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] io::Error),

    /// The socket never accepted a connection within the timeout.
    #[error("timed out after {waited:?} connecting to {}: {last_error}", path.display())]
    Timeout {
        /// Socket path that was retried.
        path: PathBuf,
        /// Total time spent retrying.
        waited: Duration,
        /// Error returned by the final connect attempt.
        last_error: io::Error,
    },

    /// An earlier connection attempt on this client already failed.
    #[error("a previous connection attempt failed; create a new client")]
    AlreadyFailed,
}
