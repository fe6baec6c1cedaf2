//! # Handshake Configuration
//!
//! Node-level defaults for handshake requests and the outbox queue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{
    HandshakeOptions, DEFAULT_ACK_TIMEOUT, DEFAULT_CACHE_RETRIES, DEFAULT_CACHE_TIMEOUT,
    DEFAULT_CHANNEL, DEFAULT_PING_RETRIES,
};

/// Handshake configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Ack wait per identity send, in seconds.
    pub ack_timeout_secs: u64,

    /// Identity fetch window per cache attempt, in seconds.
    pub cache_timeout_secs: u64,

    /// Extra identity fetches after the first failure.
    pub cache_retries: u32,

    /// Extra identity sends after the first ack timeout.
    pub ping_retries: u32,

    /// Route identity packets through the outbox by default.
    pub use_queued_send: bool,

    /// Keep sessions alive after delivery.
    pub keep_alive: bool,

    /// Default channel name.
    pub channel: String,

    /// Embed the channel's shared counter in packet ids.
    pub channel_shared_counter: bool,

    /// Outbox queue depth.
    pub outbox_capacity: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            ack_timeout_secs: DEFAULT_ACK_TIMEOUT.as_secs(),
            cache_timeout_secs: DEFAULT_CACHE_TIMEOUT.as_secs(),
            cache_retries: DEFAULT_CACHE_RETRIES,
            ping_retries: DEFAULT_PING_RETRIES,
            use_queued_send: false,
            keep_alive: true,
            channel: DEFAULT_CHANNEL.to_string(),
            channel_shared_counter: true,
            outbox_capacity: 256,
        }
    }
}

impl HandshakeConfig {
    /// Create a config for testing (short timeouts, small budgets).
    pub fn for_testing() -> Self {
        Self {
            ack_timeout_secs: 1,
            cache_timeout_secs: 1,
            cache_retries: 1,
            ping_retries: 1,
            outbox_capacity: 8,
            ..Self::default()
        }
    }

    /// Request options derived from this config.
    pub fn options(&self) -> HandshakeOptions {
        HandshakeOptions::from(self)
    }
}

impl From<&HandshakeConfig> for HandshakeOptions {
    fn from(config: &HandshakeConfig) -> Self {
        HandshakeOptions::default()
            .with_ack_timeout(Duration::from_secs(config.ack_timeout_secs))
            .with_cache_timeout(Duration::from_secs(config.cache_timeout_secs))
            .with_cache_retries(config.cache_retries)
            .with_ping_retries(config.ping_retries)
            .with_queued_send(config.use_queued_send)
            .with_keep_alive(config.keep_alive)
            .with_channel(config.channel.clone(), config.channel_shared_counter)
    }
}
