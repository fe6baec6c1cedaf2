//! Scripted test doubles for the outbound ports.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{
    AckPacket, CacheError, DeliveryInfo, IdUrl, IdentityDocument, OutboundPacket, OutboxError,
    SendOptions, SignedPacket,
};
use crate::ports::{IdentityCache, LocalNode, PacketSender, SendOutcome};

// =============================================================================
// MOCK IDENTITY CACHE (for testing)
// =============================================================================

/// Identity cache with scripted fetch results.
///
/// Scripted results are consumed in order; once the script is empty every
/// fetch uses the fallback. A successful fetch marks the peer as cached.
#[derive(Debug)]
pub struct MockIdentityCache {
    cached: Mutex<HashSet<IdUrl>>,
    script: Mutex<VecDeque<Result<(), CacheError>>>,
    fallback: Result<(), CacheError>,
    fetches: Mutex<HashMap<IdUrl, u32>>,
    delay: Duration,
}

impl MockIdentityCache {
    /// Cache whose fetches succeed.
    pub fn new() -> Self {
        Self::with_fallback(Ok(()))
    }

    /// Cache whose fetches always fail.
    pub fn failing() -> Self {
        Self::with_fallback(Err(CacheError::Fetch("identity server unreachable".into())))
    }

    fn with_fallback(fallback: Result<(), CacheError>) -> Self {
        Self {
            cached: Mutex::new(HashSet::new()),
            script: Mutex::new(VecDeque::new()),
            fallback,
            fetches: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        }
    }

    /// Mark `idurl` as already cached.
    pub fn with_cached(self, idurl: &IdUrl) -> Self {
        self.cached.lock().insert(idurl.clone());
        self
    }

    /// Make every fetch take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue the result of the next fetch.
    pub fn push_result(&self, result: Result<(), CacheError>) {
        self.script.lock().push_back(result);
    }

    /// Fetches issued for `idurl`.
    pub fn fetch_count(&self, idurl: &IdUrl) -> u32 {
        self.fetches.lock().get(idurl).copied().unwrap_or(0)
    }

    /// Fetches issued for all peers.
    pub fn total_fetches(&self) -> u32 {
        self.fetches.lock().values().sum()
    }
}

impl Default for MockIdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityCache for MockIdentityCache {
    fn has_key(&self, idurl: &IdUrl) -> bool {
        self.cached.lock().contains(idurl)
    }

    async fn immediately_caching(
        &self,
        idurl: &IdUrl,
        _timeout: Duration,
    ) -> Result<IdentityDocument, CacheError> {
        *self.fetches.lock().entry(idurl.clone()).or_insert(0) += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        result?;

        self.cached.lock().insert(idurl.clone());
        Ok(IdentityDocument::new(
            idurl.clone(),
            b"<identity/>".to_vec(),
            true,
        ))
    }
}

// =============================================================================
// MOCK PACKET SENDER (for testing)
// =============================================================================

/// Scripted answer of `MockPacketSender`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer with an Ack echoing the packet id.
    Ack,
    /// Answer with a Fail echoing the packet id.
    Fail,
    /// No answer inside the window.
    Timeout,
    /// Local send-path failure.
    Error(OutboxError),
}

/// Packet sender with scripted replies that records every packet.
#[derive(Debug)]
pub struct MockPacketSender {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    sent: Mutex<Vec<(SignedPacket, SendOptions)>>,
    delay: Duration,
}

impl MockPacketSender {
    /// Sender answering with `fallback` once the script is empty.
    pub fn new(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            sent: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sender that acks everything.
    pub fn acking() -> Self {
        Self::new(MockReply::Ack)
    }

    /// Sender whose peers never answer.
    pub fn silent() -> Self {
        Self::new(MockReply::Timeout)
    }

    /// Make every send take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue the reply to the next send.
    pub fn push_reply(&self, reply: MockReply) {
        self.script.lock().push_back(reply);
    }

    /// Number of packets sent.
    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Packets sent, in order.
    pub fn sent_packets(&self) -> Vec<SignedPacket> {
        self.sent
            .lock()
            .iter()
            .map(|(packet, _)| packet.clone())
            .collect()
    }

    /// Options of the latest send.
    pub fn last_options(&self) -> Option<SendOptions> {
        self.sent.lock().last().map(|(_, options)| *options)
    }

    fn answer(packet: &SignedPacket) -> (AckPacket, DeliveryInfo) {
        (
            AckPacket {
                packet_id: packet.packet_id().to_string(),
                creator: packet.remote_id().clone(),
                payload: packet.packet_id().as_str().as_bytes().to_vec(),
            },
            DeliveryInfo {
                proto: "tcp".to_string(),
                host: "127.0.0.1:7771".to_string(),
                bytes: packet.packet.payload.len(),
            },
        )
    }
}

#[async_trait]
impl PacketSender for MockPacketSender {
    async fn send(
        &self,
        packet: SignedPacket,
        options: SendOptions,
    ) -> Result<SendOutcome, OutboxError> {
        self.sent.lock().push((packet.clone(), options));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Ack => {
                let (response, info) = Self::answer(&packet);
                Ok(SendOutcome::Ack(response, info))
            }
            MockReply::Fail => {
                let (response, info) = Self::answer(&packet);
                Ok(SendOutcome::Fail(response, info))
            }
            MockReply::Timeout => Ok(SendOutcome::Timeout),
            MockReply::Error(err) => Err(err),
        }
    }
}

// =============================================================================
// STATIC LOCAL NODE (for testing)
// =============================================================================

/// Local node with a fixed identity and a fake signature.
#[derive(Debug, Clone)]
pub struct StaticLocalNode {
    identity: IdentityDocument,
}

impl StaticLocalNode {
    /// Node with a valid, signed identity published at `idurl`.
    pub fn new(idurl: IdUrl) -> Self {
        Self {
            identity: IdentityDocument::new(idurl, b"<identity local/>".to_vec(), true),
        }
    }

    /// Node whose identity document is unsigned.
    pub fn with_invalid_identity(idurl: IdUrl) -> Self {
        Self {
            identity: IdentityDocument::new(idurl, b"<identity local/>".to_vec(), false),
        }
    }
}

impl LocalNode for StaticLocalNode {
    fn idurl(&self) -> IdUrl {
        self.identity.idurl.clone()
    }

    fn identity(&self) -> IdentityDocument {
        self.identity.clone()
    }

    fn sign(&self, packet: OutboundPacket) -> SignedPacket {
        let signature = format!("signed:{}", packet.packet_id).into_bytes();
        SignedPacket { packet, signature }
    }
}
