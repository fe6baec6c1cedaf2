//! Identity packet construction.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use super::types::IdUrl;

/// Packet command carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketCommand {
    /// Our identity document.
    Identity,
    /// Positive acknowledgment.
    Ack,
    /// Explicit rejection.
    Fail,
}

/// Identifier of one identity packet.
///
/// Layout: `channel[:counter]:attempt:token`, where `counter` is the
/// channel's shared counter (only when the request opted into it) and
/// `token` is a fresh UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PacketId(String);

impl PacketId {
    /// Build a packet id with a freshly generated unique token.
    pub fn generate(channel: &str, shared_counter: Option<u64>, attempt: u32) -> Self {
        Self::with_token(channel, shared_counter, attempt, &Uuid::new_v4().simple().to_string())
    }

    /// Build a packet id with an explicit token.
    pub fn with_token(channel: &str, shared_counter: Option<u64>, attempt: u32, token: &str) -> Self {
        match shared_counter {
            Some(counter) => Self(format!("{}:{}:{}:{}", channel, counter, attempt, token)),
            None => Self(format!("{}:{}:{}", channel, attempt, token)),
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unsigned outbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Command.
    pub command: PacketCommand,
    /// Owner of the payload (the local node).
    pub owner_id: IdUrl,
    /// Creator of the packet (the local node).
    pub creator_id: IdUrl,
    /// Packet identifier.
    pub packet_id: PacketId,
    /// Serialized identity document.
    pub payload: Vec<u8>,
    /// Recipient.
    pub remote_id: IdUrl,
}

/// Packet after signing by the local node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPacket {
    /// The packet contents.
    pub packet: OutboundPacket,
    /// Signature over the packet.
    pub signature: Vec<u8>,
}

impl SignedPacket {
    /// Packet identifier.
    pub fn packet_id(&self) -> &PacketId {
        &self.packet.packet_id
    }

    /// Recipient.
    pub fn remote_id(&self) -> &IdUrl {
        &self.packet.remote_id
    }
}

/// Delivery parameters handed to the sender with every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Ack wait window.
    pub response_timeout: Duration,
    /// Keep the session alive after delivery.
    pub keep_alive: bool,
    /// Try every known contact of the peer.
    pub wide: bool,
}
