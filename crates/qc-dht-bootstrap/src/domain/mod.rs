//! Domain Layer - Bootstrap values with no I/O
//!
//! - Seed nodes, network descriptor and Kademlia parameters
//! - Layer ids and the attached layer set
//! - RPC validation verdicts
//! - Error taxonomy

pub mod errors;
pub mod layers;
pub mod network;
pub mod validation;

pub use errors::{ConfigError, DhtError, NodeError};
pub use layers::{parse_attached_layers, LayerId, LayerSet, PRIMARY_LAYER};
pub use network::{
    parse_known_nodes, NetworkDescriptor, NetworkParameters, SeedNode, BUNDLED_NETWORK,
    DEFAULT_BUCKET_SIZE, DEFAULT_PARALLEL_CALLS, DEFAULT_RECORD_AGE, MAX_RECORD_AGE,
    REFRESH_TIMEOUT, RPC_TIMEOUT,
};
pub use validation::{RpcKind, RpcVerdict, StoreRequest};
