//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** `HandshakeApi`
//! - **Driven Ports (Outbound):** `IdentityCache`, `PacketSender`, `LocalNode`

pub mod inbound;
pub mod outbound;

pub use inbound::HandshakeApi;
pub use outbound::{IdentityCache, LocalNode, PacketSender, SendOutcome};
