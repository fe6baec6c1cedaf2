use std::sync::Arc;

use tracing::debug;

use super::coordinator::{HandshakeContext, HandshakeCoordinator};
use super::handle::HandshakeHandle;
use super::registry::{HandshakeRegistry, Registration};
use crate::domain::{ChannelCounters, HandshakeEvent, HandshakeOptions, IdUrl};
use crate::ports::{HandshakeApi, IdentityCache, LocalNode, PacketSender};

/// Handshake service implementing the driving port.
///
/// Owns the registry and the channel counters, so two services in one
/// process never see each other's handshakes.
///
/// # Example
///
/// ```rust,ignore
/// use qc_handshake::{HandshakeOptions, HandshakeService, IdUrl};
///
/// let service = HandshakeService::new(cache, direct, outbox, local_node);
/// let peer = IdUrl::new("http://id.example.net/alice.xml")?;
/// let outcome = service.request_handshake(peer, HandshakeOptions::default()).await;
/// ```
pub struct HandshakeService {
    ctx: HandshakeContext,
}

impl HandshakeService {
    /// Create a service with its own empty registry and counters.
    ///
    /// # Arguments
    ///
    /// * `identity_cache` - Remote identity lookup and fetch
    /// * `direct_sender` - Sender used unless a request selects the queued path
    /// * `queued_sender` - Outbox sender
    /// * `local_node` - Local identity and signing key
    pub fn new(
        identity_cache: Arc<dyn IdentityCache>,
        direct_sender: Arc<dyn PacketSender>,
        queued_sender: Arc<dyn PacketSender>,
        local_node: Arc<dyn LocalNode>,
    ) -> Self {
        Self::with_shared_state(
            Arc::new(HandshakeRegistry::new()),
            Arc::new(ChannelCounters::new()),
            identity_cache,
            direct_sender,
            queued_sender,
            local_node,
        )
    }

    /// Create a service over an existing registry and counter map.
    pub fn with_shared_state(
        registry: Arc<HandshakeRegistry>,
        counters: Arc<ChannelCounters>,
        identity_cache: Arc<dyn IdentityCache>,
        direct_sender: Arc<dyn PacketSender>,
        queued_sender: Arc<dyn PacketSender>,
        local_node: Arc<dyn LocalNode>,
    ) -> Self {
        Self {
            ctx: HandshakeContext {
                registry,
                counters,
                identity_cache,
                direct_sender,
                queued_sender,
                local_node,
            },
        }
    }

    /// Start (or join) a handshake with `idurl`.
    ///
    /// The first transition runs before this returns; the rest of the
    /// handshake runs in a spawned task.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_handshake(&self, idurl: IdUrl, options: HandshakeOptions) -> HandshakeHandle {
        let (generation, handle) = match self.ctx.registry.register(&idurl) {
            Registration::Joined { handle } => {
                debug!(
                    idurl = %idurl,
                    waiters = self.ctx.registry.waiter_count(&idurl),
                    "joined running handshake"
                );
                return handle;
            }
            Registration::Created { generation, handle } => (generation, handle),
        };

        let number = self.ctx.counters.register(&options.channel);
        let name = format!("handshake_{}{}_{}", options.channel, number, idurl.to_glob());

        let first = if options.force_cache {
            HandshakeEvent::CacheAndPing
        } else {
            HandshakeEvent::Ping {
                cached: self.ctx.identity_cache.has_key(&idurl),
            }
        };

        let mut coordinator =
            HandshakeCoordinator::new(name, generation, idurl, options, self.ctx.clone());
        let actions = coordinator.dispatch(first);
        tokio::spawn(coordinator.run(actions));

        handle
    }

    /// Whether a handshake with `idurl` is in flight.
    pub fn is_handshake_running(&self, idurl: &IdUrl) -> bool {
        self.ctx.registry.is_running(idurl)
    }

    /// Number of handshakes in flight.
    pub fn running_count(&self) -> usize {
        self.ctx.registry.len()
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &Arc<HandshakeRegistry> {
        &self.ctx.registry
    }

    /// The channel counters backing this service.
    pub fn counters(&self) -> &Arc<ChannelCounters> {
        &self.ctx.counters
    }
}

impl HandshakeApi for HandshakeService {
    fn request_handshake(&self, idurl: IdUrl, options: HandshakeOptions) -> HandshakeHandle {
        HandshakeService::request_handshake(self, idurl, options)
    }

    fn is_handshake_running(&self, idurl: &IdUrl) -> bool {
        HandshakeService::is_handshake_running(self, idurl)
    }
}
