//! Value objects exchanged by the handshake coordinator.

use std::fmt;
use std::time::Duration;

use super::errors::HandshakeError;

// =============================================================================
// PEER ADDRESS
// =============================================================================

/// Address of a peer's published identity document.
///
/// Registry keys are `IdUrl`s, so two requests naming the same address are
/// always coalesced onto the same coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdUrl(String);

impl IdUrl {
    /// Create a peer address, rejecting empty or whitespace-only input.
    pub fn new(url: impl Into<String>) -> Result<Self, HandshakeError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(HandshakeError::EmptyIdUrl);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short human-readable form used in coordinator instance names.
    ///
    /// `http://host.net/alice.xml` becomes `alice@host.net`.
    pub fn to_glob(&self) -> String {
        let without_scheme = self
            .0
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0);
        match without_scheme.split_once('/') {
            Some((host, path)) => {
                let file = path.rsplit('/').next().unwrap_or(path);
                let user = file.strip_suffix(".xml").unwrap_or(file);
                if user.is_empty() {
                    host.to_string()
                } else {
                    format!("{}@{}", user, host)
                }
            }
            None => without_scheme.to_string(),
        }
    }
}

impl fmt::Display for IdUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for IdUrl {
    type Error = HandshakeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// =============================================================================
// IDENTITY DOCUMENT
// =============================================================================

/// A serialized identity document.
///
/// Signature checking happens in the identity-cache / signing collaborator;
/// the coordinator only reads the `signed` verdict it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDocument {
    /// Address the document is published under.
    pub idurl: IdUrl,
    /// Serialized document body.
    pub body: Vec<u8>,
    /// Whether the document carries a verified signature.
    pub signed: bool,
}

impl IdentityDocument {
    /// Create a document with an explicit signature verdict.
    pub fn new(idurl: IdUrl, body: impl Into<Vec<u8>>, signed: bool) -> Self {
        Self {
            idurl,
            body: body.into(),
            signed,
        }
    }

    /// A document is usable for a handshake only if it is signed and non-empty.
    pub fn is_valid(&self) -> bool {
        self.signed && !self.body.is_empty()
    }

    /// Serialized payload placed in the identity packet.
    pub fn serialize(&self) -> Vec<u8> {
        self.body.clone()
    }
}

// =============================================================================
// REQUEST OPTIONS
// =============================================================================

/// Default ack wait per send attempt.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(15);
/// Default identity fetch window per cache attempt.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default cache retry budget.
pub const DEFAULT_CACHE_RETRIES: u32 = 2;
/// Default identity send retry budget.
pub const DEFAULT_PING_RETRIES: u32 = 2;
/// Default logical channel name.
pub const DEFAULT_CHANNEL: &str = "identity";

/// Tunable parameters of one handshake request.
///
/// Only the options of the request that creates a coordinator are used;
/// callers coalesced onto a running handshake share its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOptions {
    /// How long the sender waits for Ack/Fail per attempt.
    pub ack_timeout: Duration,
    /// Fetch window handed to the identity cache per attempt.
    pub cache_timeout: Duration,
    /// Extra cache attempts after the first failure.
    pub cache_retries: u32,
    /// Extra identity sends after the first ack timeout.
    pub ping_retries: u32,
    /// Fetch the remote identity even if it is already cached.
    pub force_cache: bool,
    /// Route the identity packet through the outbox queue instead of sending directly.
    pub use_queued_send: bool,
    /// Passed through to the sender.
    pub keep_alive: bool,
    /// Identity to send in place of the local node's own document.
    pub substitute_identity: Option<IdentityDocument>,
    /// Logical channel name, first component of every packet id.
    pub channel: String,
    /// Embed the channel's shared counter in packet ids.
    pub channel_shared_counter: bool,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            cache_retries: DEFAULT_CACHE_RETRIES,
            ping_retries: DEFAULT_PING_RETRIES,
            force_cache: false,
            use_queued_send: false,
            keep_alive: true,
            substitute_identity: None,
            channel: DEFAULT_CHANNEL.to_string(),
            channel_shared_counter: true,
        }
    }
}

impl HandshakeOptions {
    /// Set the ack timeout.
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the cache fetch timeout.
    #[must_use]
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Set the cache retry budget.
    #[must_use]
    pub fn with_cache_retries(mut self, retries: u32) -> Self {
        self.cache_retries = retries;
        self
    }

    /// Set the ping retry budget.
    #[must_use]
    pub fn with_ping_retries(mut self, retries: u32) -> Self {
        self.ping_retries = retries;
        self
    }

    /// Force a cache fetch before sending.
    #[must_use]
    pub fn with_force_cache(mut self, force: bool) -> Self {
        self.force_cache = force;
        self
    }

    /// Select the queued (outbox) sender backend.
    #[must_use]
    pub fn with_queued_send(mut self, queued: bool) -> Self {
        self.use_queued_send = queued;
        self
    }

    /// Set the keep-alive flag passed to the sender.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Send this identity instead of the local one.
    #[must_use]
    pub fn with_substitute_identity(mut self, identity: IdentityDocument) -> Self {
        self.substitute_identity = Some(identity);
        self
    }

    /// Set the channel name and whether packet ids embed its shared counter.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>, shared_counter: bool) -> Self {
        self.channel = channel.into();
        self.channel_shared_counter = shared_counter;
        self
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Response packet received from the peer (Ack or Fail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPacket {
    /// Packet id the response refers to.
    pub packet_id: String,
    /// Sender of the response.
    pub creator: IdUrl,
    /// Raw response payload.
    pub payload: Vec<u8>,
}

/// Transport metadata describing how a response arrived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryInfo {
    /// Transport protocol name ("tcp", "udp", ...).
    pub proto: String,
    /// Remote host the response came from.
    pub host: String,
    /// Bytes received.
    pub bytes: usize,
}

/// Successful handshake: the peer acknowledged our identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSuccess {
    /// The Ack packet.
    pub response: AckPacket,
    /// How it was delivered.
    pub info: DeliveryInfo,
}

/// Terminal value fanned out to every waiter of a coordinator.
pub type HandshakeOutcome = Result<HandshakeSuccess, HandshakeError>;
