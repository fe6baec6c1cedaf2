//! # DHT Settings
//!
//! Live configuration consumed by the bootstrap service.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{
    LayerId, DEFAULT_BUCKET_SIZE, DEFAULT_PARALLEL_CALLS, DEFAULT_RECORD_AGE, MAX_RECORD_AGE,
    PRIMARY_LAYER, REFRESH_TIMEOUT, RPC_TIMEOUT,
};

/// Default DHT UDP port.
pub const DEFAULT_UDP_PORT: u16 = 14441;

/// DHT service settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhtSettings {
    /// UDP port the node listens on.
    pub udp_port: u16,

    /// Directory of the node's record storage.
    pub data_dir: PathBuf,

    /// Seed list, `host:port` entries separated by newlines, `;`, `,` or spaces.
    /// Empty means "use the bundled network descriptor".
    pub known_nodes: String,

    /// Comma separated layers to attach after the primary layer connects.
    pub attached_layers: String,

    /// Layers the node opens storage for.
    pub open_layers: Vec<LayerId>,

    /// Contacts per k-bucket.
    pub bucket_size: usize,

    /// Lookup fan-out.
    pub parallel_calls: usize,

    /// Default record lifetime, in seconds.
    pub default_age_secs: u64,

    /// Maximum record lifetime, in seconds.
    pub max_age_secs: u64,

    /// Bucket refresh interval, in seconds.
    pub refresh_timeout_secs: u64,

    /// Single RPC timeout, in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for DhtSettings {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            data_dir: PathBuf::from(".quantum-chain/dht"),
            known_nodes: String::new(),
            attached_layers: String::new(),
            open_layers: vec![PRIMARY_LAYER],
            bucket_size: DEFAULT_BUCKET_SIZE,
            parallel_calls: DEFAULT_PARALLEL_CALLS,
            default_age_secs: DEFAULT_RECORD_AGE.as_secs(),
            max_age_secs: MAX_RECORD_AGE.as_secs(),
            refresh_timeout_secs: REFRESH_TIMEOUT.as_secs(),
            rpc_timeout_secs: RPC_TIMEOUT.as_secs(),
        }
    }
}

impl DhtSettings {
    /// Create settings for testing (loopback seed, short timeouts).
    pub fn for_testing() -> Self {
        Self {
            udp_port: 0,
            data_dir: std::env::temp_dir().join("qc-dht-test"),
            known_nodes: "127.0.0.1:14441".to_string(),
            bucket_size: 4,
            rpc_timeout_secs: 1,
            refresh_timeout_secs: 5,
            ..Self::default()
        }
    }
}
