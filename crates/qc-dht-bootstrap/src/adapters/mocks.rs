//! Scripted test doubles for the outbound ports.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{LayerId, NodeError, RpcKind, RpcVerdict, SeedNode, StoreRequest};
use crate::ports::{DhtNode, NodeBinding, RecordPolicy, ReconnectSignal, RpcValidator};

// =============================================================================
// MOCK DHT NODE (for testing)
// =============================================================================

/// One call received by `MockDhtNode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    /// `init`
    Init(NodeBinding),
    /// `connect`
    Connect {
        /// Layer joined
        layer: LayerId,
        /// Seeds offered
        seeds: Vec<SeedNode>,
    },
    /// `add_rpc_callback`
    AddCallback(RpcKind),
    /// `remove_rpc_callback`
    RemoveCallback(RpcKind),
    /// `close_layer`
    CloseLayer(LayerId),
    /// `disconnect`
    Disconnect,
    /// `shutdown`
    Shutdown,
}

/// DHT node that records every call and fails where told to.
#[derive(Default)]
pub struct MockDhtNode {
    calls: Mutex<Vec<NodeCall>>,
    validators: Mutex<BTreeMap<RpcKind, Arc<dyn RpcValidator>>>,
    failing_layers: Mutex<HashSet<LayerId>>,
    fail_init: Mutex<Option<String>>,
    fail_teardown: Mutex<bool>,
    connect_delay: Mutex<Duration>,
}

impl MockDhtNode {
    /// Node where everything succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail for `layer`.
    pub fn fail_layer(&self, layer: LayerId) {
        self.failing_layers.lock().insert(layer);
    }

    /// Let `connect` succeed again for `layer`.
    pub fn heal_layer(&self, layer: LayerId) {
        self.failing_layers.lock().remove(&layer);
    }

    /// Make `init` fail with `reason`.
    pub fn fail_init(&self, reason: impl Into<String>) {
        *self.fail_init.lock() = Some(reason.into());
    }

    /// Make `close_layer`, `disconnect` and `shutdown` fail.
    pub fn fail_teardown(&self) {
        *self.fail_teardown.lock() = true;
    }

    /// Make every `connect` take `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    /// Calls received, in order.
    pub fn calls(&self) -> Vec<NodeCall> {
        self.calls.lock().clone()
    }

    /// Layers `connect` was called for, in order.
    pub fn connected_layers(&self) -> Vec<LayerId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NodeCall::Connect { layer, .. } => Some(*layer),
                _ => None,
            })
            .collect()
    }

    /// Number of `init` calls.
    pub fn init_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, NodeCall::Init(_)))
            .count()
    }

    /// Validator currently installed for `kind`.
    pub fn validator(&self, kind: RpcKind) -> Option<Arc<dyn RpcValidator>> {
        self.validators.lock().get(&kind).cloned()
    }

    fn record(&self, call: NodeCall) {
        self.calls.lock().push(call);
    }

    fn teardown_result(&self, what: &str) -> Result<(), NodeError> {
        if *self.fail_teardown.lock() {
            Err(NodeError::new(format!("{} failed", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DhtNode for MockDhtNode {
    fn init(&self, binding: &NodeBinding) -> Result<(), NodeError> {
        self.record(NodeCall::Init(binding.clone()));
        match self.fail_init.lock().clone() {
            Some(reason) => Err(NodeError::new(reason)),
            None => Ok(()),
        }
    }

    async fn connect(&self, seeds: &[SeedNode], layer: LayerId, _attach: bool) -> Result<(), NodeError> {
        self.record(NodeCall::Connect {
            layer,
            seeds: seeds.to_vec(),
        });
        let delay = *self.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing_layers.lock().contains(&layer) {
            return Err(NodeError::new(format!("no seed answered on layer {}", layer)));
        }
        Ok(())
    }

    fn add_rpc_callback(&self, kind: RpcKind, validator: Arc<dyn RpcValidator>) {
        self.record(NodeCall::AddCallback(kind));
        self.validators.lock().insert(kind, validator);
    }

    fn remove_rpc_callback(&self, kind: RpcKind) {
        self.record(NodeCall::RemoveCallback(kind));
        self.validators.lock().remove(&kind);
    }

    fn close_layer(&self, layer: LayerId) -> Result<(), NodeError> {
        self.record(NodeCall::CloseLayer(layer));
        self.teardown_result("close_layer")
    }

    async fn disconnect(&self) -> Result<(), NodeError> {
        self.record(NodeCall::Disconnect);
        self.teardown_result("disconnect")
    }

    fn shutdown(&self) -> Result<(), NodeError> {
        self.record(NodeCall::Shutdown);
        self.teardown_result("shutdown")
    }
}

// =============================================================================
// RECORD POLICIES (for testing)
// =============================================================================

/// Policy accepting every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPolicy;

impl RecordPolicy for AllowAllPolicy {
    fn validate_before_store(&self, _request: &StoreRequest) -> RpcVerdict {
        RpcVerdict::Accept
    }

    fn validate_before_request(&self, _key: &[u8]) -> RpcVerdict {
        RpcVerdict::Accept
    }
}

// =============================================================================
// RECORDING RECONNECT SIGNAL (for testing)
// =============================================================================

/// Counts reconnect requests.
#[derive(Debug, Default)]
pub struct RecordingReconnect {
    requests: AtomicUsize,
}

impl RecordingReconnect {
    /// Create a recorder with no requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reconnects requested.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ReconnectSignal for RecordingReconnect {
    fn request_reconnect(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}
