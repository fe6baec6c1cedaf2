//! # Driving Ports (Inbound API)
//!
//! What the handshake subsystem exposes to the rest of the node.

use crate::domain::{HandshakeOptions, IdUrl};
use crate::service::HandshakeHandle;

/// Identity handshake API.
pub trait HandshakeApi: Send + Sync {
    /// Send our identity to `idurl` and wait for its Ack.
    ///
    /// If a handshake with `idurl` is already in flight the caller joins it
    /// and `options` are ignored.
    fn request_handshake(&self, idurl: IdUrl, options: HandshakeOptions) -> HandshakeHandle;

    /// Whether a handshake with `idurl` is in flight.
    fn is_handshake_running(&self, idurl: &IdUrl) -> bool;
}
