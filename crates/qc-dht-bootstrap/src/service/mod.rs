//! # DHT Bootstrap Service
//!
//! Start/stop lifecycle of the local DHT participation and the two RPC
//! validation gates installed on the node.

mod coordinator;
mod gate;

pub use coordinator::{DhtBootstrapCoordinator, DhtLifecycle};
pub use gate::DhtRpcGate;
