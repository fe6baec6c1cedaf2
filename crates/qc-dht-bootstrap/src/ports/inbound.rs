//! # Driving Ports (Inbound API)

use async_trait::async_trait;

use crate::domain::{DhtError, RpcVerdict, StoreRequest};

/// DHT service lifecycle.
#[async_trait]
pub trait DhtBootstrapApi: Send + Sync {
    /// Initialize the node, join the primary layer, then attach the
    /// configured extra layers. Resolves once, after every layer tried.
    async fn start(&self) -> Result<(), DhtError>;

    /// Leave every layer and shut the node down. Always succeeds.
    async fn stop(&self) -> bool;

    /// Service liveness.
    fn health_check(&self) -> bool;
}

/// Synchronous gate the DHT node consults before storing or serving a record.
pub trait RpcValidator: Send + Sync {
    /// Gate an incoming `store` RPC.
    fn validate_store(&self, request: &StoreRequest) -> RpcVerdict;

    /// Gate an incoming `request` RPC.
    fn validate_request(&self, key: &[u8]) -> RpcVerdict;
}
