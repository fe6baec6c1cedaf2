//! Domain Layer - Pure handshake logic with no I/O
//!
//! - Peer addresses, identity documents and request options
//! - The handshake state machine (states, events, actions)
//! - Identity packet ids and per-channel counters
//! - Error taxonomy

pub mod channels;
pub mod errors;
pub mod machine;
pub mod packet;
pub mod types;

pub use channels::ChannelCounters;
pub use errors::{CacheError, HandshakeError, OutboxError};
pub use machine::{HandshakeAction, HandshakeEvent, HandshakeMachine, HandshakeState};
pub use packet::{OutboundPacket, PacketCommand, PacketId, SendOptions, SignedPacket};
pub use types::*;
