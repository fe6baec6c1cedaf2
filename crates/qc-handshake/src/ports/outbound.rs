//! # Driven Ports (Outbound SPI)
//!
//! Collaborators the handshake coordinator depends on. The host provides
//! implementations; `adapters` ships an identity cache client and an outbox
//! sender, and scripted doubles behind the `test-utils` feature.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    AckPacket, CacheError, DeliveryInfo, IdUrl, IdentityDocument, OutboundPacket, OutboxError,
    SendOptions, SignedPacket,
};

/// Identity-document cache with network fetch.
///
/// # Thread Safety
///
/// Shared between all coordinators; implementations must be `Send + Sync`.
#[async_trait]
pub trait IdentityCache: Send + Sync {
    /// Whether a document for `idurl` is already cached.
    ///
    /// A hit does not guarantee freshness; it only lets the coordinator skip
    /// the fetch.
    fn has_key(&self, idurl: &IdUrl) -> bool;

    /// Fetch, validate and cache the document for `idurl`.
    ///
    /// `timeout` bounds this single attempt; retries are the coordinator's job.
    async fn immediately_caching(
        &self,
        idurl: &IdUrl,
        timeout: Duration,
    ) -> Result<IdentityDocument, CacheError>;
}

/// How the peer answered one identity packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Ack received.
    Ack(AckPacket, DeliveryInfo),
    /// Fail received.
    Fail(AckPacket, DeliveryInfo),
    /// Nothing received inside `SendOptions::response_timeout`.
    Timeout,
}

/// Outbound packet delivery.
///
/// Exactly one `SendOutcome` (or one `OutboxError`) is produced per call.
#[async_trait]
pub trait PacketSender: Send + Sync {
    /// Deliver `packet` and wait for the peer's answer.
    async fn send(
        &self,
        packet: SignedPacket,
        options: SendOptions,
    ) -> Result<SendOutcome, OutboxError>;
}

/// The local node: its address, its identity document and its signing key.
pub trait LocalNode: Send + Sync {
    /// Local node address.
    fn idurl(&self) -> IdUrl;

    /// Local identity document (may be unsigned on a misconfigured node).
    fn identity(&self) -> IdentityDocument;

    /// Sign an outbound packet.
    fn sign(&self, packet: OutboundPacket) -> SignedPacket;
}
