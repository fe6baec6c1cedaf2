//! # Adapters
//!
//! - `identity_cache` - `IdentityCache` over an `IdentityFetcher`
//! - `outbox` - queued `PacketSender` backend
//! - `mocks` - scripted doubles (tests and the `test-utils` feature)

pub mod identity_cache;
pub mod outbox;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use identity_cache::{IdentityCacheClient, IdentityFetcher};
pub use outbox::OutboxSender;

#[cfg(any(test, feature = "test-utils"))]
pub use mocks::{MockIdentityCache, MockPacketSender, MockReply, StaticLocalNode};
