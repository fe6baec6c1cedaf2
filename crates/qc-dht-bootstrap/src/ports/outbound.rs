//! # Driven Ports (Outbound SPI)
//!
//! Collaborators of the bootstrap service. The Kademlia node itself, the
//! node-level record policy and the network connector live outside this
//! crate.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::inbound::RpcValidator;
use crate::config::DhtSettings;
use crate::domain::{LayerId, NetworkParameters, NodeError, RpcKind, RpcVerdict, SeedNode, StoreRequest};

/// Arguments of `DhtNode::init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBinding {
    /// UDP port to bind.
    pub udp_port: u16,
    /// Record storage directory.
    pub data_dir: PathBuf,
    /// Layers to open storage for.
    pub open_layers: Vec<LayerId>,
    /// Kademlia parameters and seeds.
    pub parameters: NetworkParameters,
}

/// The Kademlia node.
#[async_trait]
pub trait DhtNode: Send + Sync {
    /// Bind the UDP port and open storage.
    fn init(&self, binding: &NodeBinding) -> Result<(), NodeError>;

    /// Join `layer` through `seeds`.
    async fn connect(&self, seeds: &[SeedNode], layer: LayerId, attach: bool) -> Result<(), NodeError>;

    /// Install the validator consulted before serving `kind`.
    fn add_rpc_callback(&self, kind: RpcKind, validator: Arc<dyn RpcValidator>);

    /// Remove the validator for `kind`.
    fn remove_rpc_callback(&self, kind: RpcKind);

    /// Leave `layer`.
    fn close_layer(&self, layer: LayerId) -> Result<(), NodeError>;

    /// Leave the network.
    async fn disconnect(&self) -> Result<(), NodeError>;

    /// Release the port and storage.
    fn shutdown(&self) -> Result<(), NodeError>;
}

/// Live DHT settings.
pub trait DhtSettingsSource: Send + Sync {
    /// Current settings. Read at every use, so changes apply to the next start.
    fn settings(&self) -> DhtSettings;
}

/// Node-level record policy.
pub trait RecordPolicy: Send + Sync {
    /// Decide whether a record may be stored.
    fn validate_before_store(&self, request: &StoreRequest) -> RpcVerdict;

    /// Decide whether a record may be served.
    fn validate_before_request(&self, key: &[u8]) -> RpcVerdict;
}

/// The network connectivity coordinator.
pub trait ReconnectSignal: Send + Sync {
    /// Ask for a reconnect (the DHT port changed).
    fn request_reconnect(&self);
}
