//! Network parameters and seed nodes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use crate::config::DhtSettings;

// =============================================================================
// KADEMLIA DEFAULTS
// =============================================================================

/// Contacts per k-bucket.
pub const DEFAULT_BUCKET_SIZE: usize = 20;
/// Concurrent RPCs per lookup (alpha).
pub const DEFAULT_PARALLEL_CALLS: usize = 3;
/// Lifetime of a stored record unless the publisher asks otherwise.
pub const DEFAULT_RECORD_AGE: Duration = Duration::from_secs(60 * 60);
/// Upper bound on a stored record's lifetime.
pub const MAX_RECORD_AGE: Duration = Duration::from_secs(24 * 60 * 60);
/// Bucket refresh interval.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(60 * 60);
/// Single RPC timeout.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Default network descriptor shipped with the crate.
pub const BUNDLED_NETWORK: &str = include_str!("../../network.toml");

// =============================================================================
// SEED NODES
// =============================================================================

/// A DHT node used to join the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedNode {
    /// Host name or address.
    pub host: String,
    /// UDP port.
    pub udp_port: u16,
}

impl SeedNode {
    /// Create a seed node.
    pub fn new(host: impl Into<String>, udp_port: u16) -> Self {
        Self {
            host: host.into(),
            udp_port,
        }
    }

    /// Parse one `host:port` entry. Returns `None` for malformed entries.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.trim().split(':');
        let host = parts.next()?.trim();
        let port = parts.next()?.trim().parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port))
    }
}

impl fmt::Display for SeedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.udp_port)
    }
}

/// Parse a seed list separated by newlines, `;`, `,` or spaces.
///
/// Malformed entries are skipped.
pub fn parse_known_nodes(raw: &str) -> Vec<SeedNode> {
    raw.split(['\n', ';', ',', ' '])
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(SeedNode::parse)
        .collect()
}

// =============================================================================
// NETWORK DESCRIPTOR
// =============================================================================

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    dht: NetworkDescriptor,
}

/// Static description of a network: the seeds every node may start from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NetworkDescriptor {
    /// Seed nodes.
    #[serde(default)]
    pub known_nodes: Vec<SeedNode>,
}

impl NetworkDescriptor {
    /// Parse a descriptor from TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: DescriptorFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(file.dht)
    }

    /// The descriptor shipped with the crate.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(BUNDLED_NETWORK)
    }
}

// =============================================================================
// NETWORK PARAMETERS
// =============================================================================

/// Everything the DHT node needs to join the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    /// Contacts per k-bucket.
    pub bucket_size: usize,
    /// Default record lifetime.
    pub default_age: Duration,
    /// Maximum record lifetime.
    pub max_age: Duration,
    /// Lookup fan-out.
    pub parallel_calls: usize,
    /// Bucket refresh interval.
    pub refresh_timeout: Duration,
    /// Single RPC timeout.
    pub rpc_timeout: Duration,
    /// Seeds to join through.
    pub known_nodes: Vec<SeedNode>,
}

impl NetworkParameters {
    /// Build parameters from live settings.
    ///
    /// Seeds come from `settings.known_nodes` when it yields at least one
    /// usable entry; otherwise `fallback` supplies the network descriptor.
    pub fn resolve<F>(settings: &DhtSettings, fallback: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> Result<NetworkDescriptor, ConfigError>,
    {
        let mut known_nodes = parse_known_nodes(&settings.known_nodes);
        if known_nodes.is_empty() {
            known_nodes = fallback()?.known_nodes;
        }

        Ok(Self {
            bucket_size: settings.bucket_size,
            default_age: Duration::from_secs(settings.default_age_secs),
            max_age: Duration::from_secs(settings.max_age_secs),
            parallel_calls: settings.parallel_calls,
            refresh_timeout: Duration::from_secs(settings.refresh_timeout_secs),
            rpc_timeout: Duration::from_secs(settings.rpc_timeout_secs),
            known_nodes,
        })
    }
}
