//! # Domain Errors
//!
//! Error types for the identity handshake.

use thiserror::Error;

/// Terminal failure of a handshake, delivered identically to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The remote identity could not be fetched within the cache retry budget.
    #[error("failed to cache remote identity {idurl} after {attempts} attempts")]
    CacheExhausted {
        /// Peer address
        idurl: String,
        /// Fetch attempts made
        attempts: u32,
    },

    /// The peer answered our identity with an explicit Fail packet.
    #[error("ping failed because received Fail() from remote user {idurl}")]
    PeerRejected {
        /// Peer address
        idurl: String,
    },

    /// The local send path could not deliver the identity packet.
    #[error("ping failed because not possible to send packets to user {idurl}: {reason}")]
    SendFailed {
        /// Peer address
        idurl: String,
        /// Outbox failure description
        reason: String,
    },

    /// No Ack arrived within the ping retry budget.
    #[error("remote user {idurl} did not respond after {attempts} ping attempts")]
    AckTimeout {
        /// Peer address
        idurl: String,
        /// Send attempts made
        attempts: u32,
    },

    /// The identity we were about to send is not valid/signed.
    /// Signals a misconfigured node; never retried.
    #[error("can not use invalid identity for ping")]
    InvalidLocalIdentity,

    /// A handshake was requested with an empty peer address.
    #[error("empty idurl provided")]
    EmptyIdUrl,

    /// The coordinator went away without reporting an outcome.
    #[error("handshake with {idurl} was aborted before completion")]
    Aborted {
        /// Peer address
        idurl: String,
    },
}

/// Failure reported by the identity cache collaborator for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The fetch did not complete inside its window.
    #[error("identity fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The document could not be retrieved.
    #[error("identity fetch failed: {0}")]
    Fetch(String),

    /// The retrieved document failed validation.
    #[error("remote identity is not valid")]
    InvalidDocument,
}

/// Local send-path failure (the `outbox-failed` event).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutboxError {
    /// The outbox queue is full.
    #[error("outbox queue is full")]
    QueueFull,

    /// The outbox worker has stopped.
    #[error("outbox is closed")]
    Closed,

    /// The transport refused the packet.
    #[error("transport error: {0}")]
    Transport(String),
}
