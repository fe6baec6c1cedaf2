use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::gate::DhtRpcGate;
use crate::config::DhtSettings;
use crate::domain::{
    parse_attached_layers, DhtError, LayerId, LayerSet, NetworkDescriptor, NetworkParameters,
    RpcKind, SeedNode, PRIMARY_LAYER,
};
use crate::ports::{
    DhtBootstrapApi, DhtNode, DhtSettingsSource, NodeBinding, RecordPolicy, ReconnectSignal,
};

/// Lifecycle of the bootstrap service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtLifecycle {
    /// Not started, or stopped, or the last start failed.
    Stopped,
    /// `start()` in progress.
    Starting,
    /// Primary and attached layers connected.
    Running,
    /// `stop()` in progress.
    Stopping,
}

// =============================================================================
// DHT BOOTSTRAP COORDINATOR (Application Service)
// =============================================================================

/// Owns the DHT participation of the local node.
///
/// Ties together:
/// - `DhtNode` (the Kademlia node)
/// - `DhtSettingsSource` (live settings, read at every use)
/// - `DhtRpcGate` (store/request validation over the `RecordPolicy`)
/// - `ReconnectSignal` (port changes are handed to the network connector)
pub struct DhtBootstrapCoordinator {
    node: Arc<dyn DhtNode>,
    settings: Arc<dyn DhtSettingsSource>,
    gate: Arc<DhtRpcGate>,
    reconnect: Arc<dyn ReconnectSignal>,
    /// Seeds used when the live seed list is unusable. `None` reads the bundled descriptor.
    fallback_network: Option<NetworkDescriptor>,
    lifecycle: Mutex<DhtLifecycle>,
    layers: Mutex<LayerSet>,
    /// Port changes are acted on only between start and stop.
    watching_port: AtomicBool,
    /// Bumped by every start and every stop. A start whose epoch is no
    /// longer current must not touch the node or the layer set.
    epoch: AtomicU64,
}

impl DhtBootstrapCoordinator {
    /// Create a stopped coordinator.
    pub fn new(
        node: Arc<dyn DhtNode>,
        settings: Arc<dyn DhtSettingsSource>,
        policy: Arc<dyn RecordPolicy>,
        reconnect: Arc<dyn ReconnectSignal>,
    ) -> Self {
        Self {
            node,
            settings,
            gate: Arc::new(DhtRpcGate::new(policy)),
            reconnect,
            fallback_network: None,
            lifecycle: Mutex::new(DhtLifecycle::Stopped),
            layers: Mutex::new(LayerSet::new()),
            watching_port: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Use `descriptor` instead of the bundled one as the seed fallback.
    #[must_use]
    pub fn with_fallback_network(mut self, descriptor: NetworkDescriptor) -> Self {
        self.fallback_network = Some(descriptor);
        self
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> DhtLifecycle {
        *self.lifecycle.lock()
    }

    /// Layers attached so far, ascending.
    pub fn attached_layers(&self) -> Vec<LayerId> {
        self.layers.lock().ids()
    }

    /// The validator installed on the node.
    pub fn gate(&self) -> Arc<DhtRpcGate> {
        Arc::clone(&self.gate)
    }

    /// Network parameters the next start would use.
    pub fn network_parameters(&self) -> Result<NetworkParameters, DhtError> {
        self.resolve_parameters(&self.settings.settings())
    }

    /// Bring the DHT up.
    ///
    /// Rejected with `AlreadyStarted` unless the service is `Stopped`.
    /// A failed start leaves the service `Stopped` with no layer attached.
    /// A start overtaken by `stop()` fails with `StartAborted`.
    pub async fn start(&self) -> Result<(), DhtError> {
        let epoch = {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != DhtLifecycle::Stopped {
                warn!(state = ?*lifecycle, "DHT start rejected");
                return Err(DhtError::AlreadyStarted);
            }
            *lifecycle = DhtLifecycle::Starting;
            self.watching_port.store(true, Ordering::SeqCst);
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.bootstrap(epoch).await;
        let attached = self.attached_layers();

        let mut lifecycle = self.lifecycle.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            warn!(epoch, "DHT start aborted by stop");
            return Err(DhtError::StartAborted);
        }
        match &result {
            Ok(()) => {
                if *lifecycle == DhtLifecycle::Starting {
                    *lifecycle = DhtLifecycle::Running;
                }
                info!(layers = ?attached, "DHT service started");
            }
            Err(err) => {
                *lifecycle = DhtLifecycle::Stopped;
                self.watching_port.store(false, Ordering::SeqCst);
                self.layers.lock().clear();
                error!(error = %err, "DHT connect failed");
            }
        }
        result
    }

    /// Take the DHT down. Teardown errors are logged, never returned.
    ///
    /// A start still in progress is aborted: it stops touching the node and
    /// resolves to `StartAborted`.
    pub async fn stop(&self) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            *lifecycle = DhtLifecycle::Stopping;
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        self.watching_port.store(false, Ordering::SeqCst);

        let settings = self.settings.settings();
        let mut to_close: LayerSet = settings.open_layers.iter().copied().collect();
        for layer in self.attached_layers() {
            to_close.insert(layer);
        }

        for layer in to_close.ids() {
            if let Err(err) = self.node.close_layer(layer) {
                warn!(layer, error = %err, "failed to close DHT layer");
            }
        }
        for kind in RpcKind::ALL {
            self.node.remove_rpc_callback(kind);
        }

        if let Err(err) = self.node.disconnect().await {
            warn!(error = %err, "DHT disconnect failed");
        }
        if let Err(err) = self.node.shutdown() {
            warn!(error = %err, "DHT shutdown failed");
        }

        self.layers.lock().clear();
        *self.lifecycle.lock() = DhtLifecycle::Stopped;
        info!("DHT service stopped");
        true
    }

    /// Service liveness.
    pub fn health_check(&self) -> bool {
        true
    }

    /// The node's UDP port setting changed.
    pub fn on_udp_port_modified(&self, old_port: u16, new_port: u16) {
        if !self.watching_port.load(Ordering::SeqCst) {
            debug!(old_port, new_port, "DHT udp port modified while stopped");
            return;
        }
        info!(old_port, new_port, "DHT udp port modified");
        self.reconnect.request_reconnect();
    }

    async fn bootstrap(&self, epoch: u64) -> Result<(), DhtError> {
        let settings = self.settings.settings();
        let parameters = self.resolve_parameters(&settings)?;
        let seeds = parameters.known_nodes.clone();

        let binding = NodeBinding {
            udp_port: settings.udp_port,
            data_dir: settings.data_dir.clone(),
            open_layers: settings.open_layers.clone(),
            parameters,
        };
        self.if_current(epoch, || self.node.init(&binding))?
            .map_err(|err| DhtError::InitFailed(err.to_string()))?;

        info!(
            seeds = %format_seeds(&seeds),
            layers = ?settings.open_layers,
            "DHT known seed nodes"
        );

        self.connect_layer(epoch, &seeds, PRIMARY_LAYER).await?;
        self.on_connected(epoch, &settings, &seeds).await
    }

    async fn on_connected(
        &self,
        epoch: u64,
        settings: &DhtSettings,
        seeds: &[SeedNode],
    ) -> Result<(), DhtError> {
        info!(udp_port = settings.udp_port, "DHT node connected");
        self.if_current(epoch, || {
            for kind in RpcKind::ALL {
                self.node.add_rpc_callback(kind, self.gate.clone());
            }
        })?;

        let extra = parse_attached_layers(&settings.attached_layers)?;
        if extra.is_empty() {
            return Ok(());
        }

        info!(layers = ?extra, "more DHT layers to be attached");
        join_all(extra.iter().map(|&layer| self.connect_layer(epoch, seeds, layer)))
            .await
            .into_iter()
            .collect()
    }

    async fn connect_layer(
        &self,
        epoch: u64,
        seeds: &[SeedNode],
        layer: LayerId,
    ) -> Result<(), DhtError> {
        self.node
            .connect(seeds, layer, true)
            .await
            .map_err(|err| DhtError::ConnectFailed {
                layer,
                reason: err.to_string(),
            })?;
        self.if_current(epoch, || self.layers.lock().insert(layer))?;
        debug!(layer, "DHT layer attached");
        Ok(())
    }

    /// Run `apply` only while start `epoch` has not been overtaken by `stop()`.
    ///
    /// Holds the lifecycle lock so `stop()` cannot slip in between the
    /// check and the mutation.
    fn if_current<T>(&self, epoch: u64, apply: impl FnOnce() -> T) -> Result<T, DhtError> {
        let _lifecycle = self.lifecycle.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(epoch, "DHT start overtaken by stop");
            return Err(DhtError::StartAborted);
        }
        Ok(apply())
    }

    fn resolve_parameters(&self, settings: &DhtSettings) -> Result<NetworkParameters, DhtError> {
        let parameters = NetworkParameters::resolve(settings, || match &self.fallback_network {
            Some(descriptor) => Ok(descriptor.clone()),
            None => NetworkDescriptor::bundled(),
        })?;
        Ok(parameters)
    }
}

fn format_seeds(seeds: &[SeedNode]) -> String {
    seeds
        .iter()
        .map(SeedNode::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl DhtBootstrapApi for DhtBootstrapCoordinator {
    async fn start(&self) -> Result<(), DhtError> {
        DhtBootstrapCoordinator::start(self).await
    }

    async fn stop(&self) -> bool {
        DhtBootstrapCoordinator::stop(self).await
    }

    fn health_check(&self) -> bool {
        DhtBootstrapCoordinator::health_check(self)
    }
}
