//! # QC DHT Bootstrap
//!
//! Start/stop lifecycle of the node's DHT participation.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Resolve Kademlia parameters and the seed list (live settings, else the
//!   bundled network descriptor)
//! - Initialize the node, join layer 0, then attach extra layers concurrently
//!   (all-or-nothing)
//! - Install the `store`/`request` validation gates over the node's record policy
//! - Forward UDP port changes to the network connector
//!
//! ## Module Structure
//!
//! ```text
//! qc-dht-bootstrap/
//! ├── domain/     # Seeds, network parameters, layers, verdicts, errors
//! ├── ports/      # DhtBootstrapApi/RpcValidator (inbound), DhtNode/... (outbound)
//! ├── service/    # DhtBootstrapCoordinator, DhtRpcGate
//! ├── adapters/   # Settings providers, mocks
//! └── config.rs   # DhtSettings
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use config::{DhtSettings, DEFAULT_UDP_PORT};
pub use domain::{
    parse_attached_layers, parse_known_nodes, ConfigError, DhtError, LayerId, LayerSet,
    NetworkDescriptor, NetworkParameters, NodeError, RpcKind, RpcVerdict, SeedNode,
    StoreRequest, PRIMARY_LAYER,
};
pub use ports::{
    DhtBootstrapApi, DhtNode, DhtSettingsSource, NodeBinding, RecordPolicy, ReconnectSignal,
    RpcValidator,
};
pub use service::{DhtBootstrapCoordinator, DhtLifecycle, DhtRpcGate};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
