//! # QC Handshake
//!
//! Identity handshake between two peers of the overlay network.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Before talking to a peer the node makes sure the peer knows who it is:
//! - fetch and cache the peer's identity document (bounded retries)
//! - send our signed identity packet and wait for an Ack (bounded retries)
//! - coalesce concurrent requests for the same peer onto one coordinator
//!
//! ## State Machine
//!
//! | State | Events | Next |
//! |-------|--------|------|
//! | `AT_STARTUP` | `ping` (cached) | `ACK?` |
//! | `AT_STARTUP` | `ping` (not cached), `cache-and-ping` | `CACHE` |
//! | `CACHE` | `remote-identity-cached` | `ACK?` |
//! | `CACHE` | `remote-identity-failed` | `CACHE` or `NO_IDENT` |
//! | `ACK?` | `ack-received` | `SUCCESS` |
//! | `ACK?` | `ack-timeout` | `ACK?` or `TIMEOUT` |
//! | `ACK?` | `fail-received`, `outbox-failed`, `local-identity-invalid` | `FAILED` |
//!
//! ## Module Structure
//!
//! ```text
//! qc-handshake/
//! ├── domain/     # State machine, packet ids, channel counters, errors
//! ├── ports/      # HandshakeApi (inbound), IdentityCache/PacketSender/LocalNode (outbound)
//! ├── service/    # HandshakeService, registry, coordinator driver
//! ├── adapters/   # Identity cache client, outbox sender, mocks
//! └── config.rs   # HandshakeConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use config::HandshakeConfig;
pub use domain::{
    AckPacket, CacheError, ChannelCounters, DeliveryInfo, HandshakeAction, HandshakeError,
    HandshakeEvent, HandshakeMachine, HandshakeOptions, HandshakeOutcome, HandshakeState,
    HandshakeSuccess, IdUrl, IdentityDocument, OutboundPacket, OutboxError, PacketCommand,
    PacketId, SendOptions, SignedPacket,
};
pub use ports::{HandshakeApi, IdentityCache, LocalNode, PacketSender, SendOutcome};
pub use service::{HandshakeHandle, HandshakeRegistry, HandshakeService, Registration};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
