//! # Domain Errors
//!
//! Error types for the DHT bootstrap service.

use thiserror::Error;

use super::layers::LayerId;

/// Bootstrap failures, reported once per `start()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DhtError {
    /// A layer (primary or attached) could not be connected.
    #[error("DHT connect failed on layer {layer}: {reason}")]
    ConnectFailed {
        /// Layer that failed
        layer: LayerId,
        /// Node error description
        reason: String,
    },

    /// The node could not bind its port or open its storage.
    #[error("DHT node initialization failed: {0}")]
    InitFailed(String),

    /// `start()` called while a start is in progress or the service runs.
    #[error("DHT bootstrap already started")]
    AlreadyStarted,

    /// `stop()` was called while this start was in progress.
    #[error("DHT start aborted by stop")]
    StartAborted,

    /// An attached-layers entry is not a layer id.
    #[error("invalid DHT layer id: {0:?}")]
    InvalidLayer(String),

    /// The bundled network descriptor could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Settings loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Error reported by the DHT node collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NodeError(pub String);

impl NodeError {
    /// Create a node error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
