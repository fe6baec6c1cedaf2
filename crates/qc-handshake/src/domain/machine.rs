//! # Handshake State Machine
//!
//! Pure transition function of one handshake coordinator. No I/O happens
//! here: `HandshakeMachine::handle` consumes an event and returns the side
//! effects the driver must execute next.
//!
//! ```text
//!                  cache-and-ping / ping (not cached)
//!   AT_STARTUP ─────────────────────────────────────→ CACHE ──┐ remote-identity-failed
//!       │                                              │  ↑   │ (attempts <= retries)
//!       │ ping (cached)          remote-identity-cached│  └───┘
//!       ↓                                              ↓
//!     ACK? ←───────────────────────────────────────────┘
//!     │ │ └─ ack-timeout (attempts <= retries) ─→ ACK?
//!     │ ├─ ack-received ─→ SUCCESS
//!     │ ├─ ack-timeout (exhausted) ─→ TIMEOUT
//!     │ └─ fail-received / outbox-failed ─→ FAILED
//!   CACHE ── remote-identity-failed (exhausted) ─→ NO_IDENT
//! ```
//!
//! Retry budgets are inclusive: a budget of `r` allows `r + 1` attempts.

use std::fmt;

use super::errors::{CacheError, HandshakeError, OutboxError};
use super::types::{AckPacket, DeliveryInfo, HandshakeOutcome, HandshakeSuccess, IdUrl};

/// Protocol state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Created, no event processed yet.
    AtStartup,
    /// Waiting for the identity cache to fetch the remote document.
    Cache,
    /// Identity sent, waiting for Ack.
    AckWait,
    /// Peer acknowledged.
    Success,
    /// Ack never arrived.
    Timeout,
    /// Remote identity could not be cached.
    NoIdentity,
    /// Peer rejected or send path failed.
    Failed,
}

impl HandshakeState {
    /// Terminal states are absorbing; the coordinator is destroyed on entry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Timeout | Self::NoIdentity | Self::Failed
        )
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AtStartup => "AT_STARTUP",
            Self::Cache => "CACHE",
            Self::AckWait => "ACK?",
            Self::Success => "SUCCESS",
            Self::Timeout => "TIMEOUT",
            Self::NoIdentity => "NO_IDENT",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// Start, taking the fast path if the remote identity is cached.
    Ping {
        /// Whether the identity cache already holds the remote document
        cached: bool,
    },
    /// Start, always fetching the remote identity first.
    CacheAndPing,
    /// The identity cache fetched the remote document.
    RemoteIdentityCached,
    /// One identity fetch attempt failed.
    RemoteIdentityFailed(CacheError),
    /// The peer acknowledged the latest identity packet.
    AckReceived(AckPacket, DeliveryInfo),
    /// The peer answered with Fail.
    FailReceived(AckPacket, DeliveryInfo),
    /// No answer inside the ack window.
    AckTimeout,
    /// The local send path failed.
    OutboxFailed(OutboxError),
    /// The identity to send is not valid/signed.
    LocalIdentityInvalid,
}

impl HandshakeEvent {
    /// Event name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "ping",
            Self::CacheAndPing => "cache-and-ping",
            Self::RemoteIdentityCached => "remote-identity-cached",
            Self::RemoteIdentityFailed(_) => "remote-identity-failed",
            Self::AckReceived(..) => "ack-received",
            Self::FailReceived(..) => "fail-received",
            Self::AckTimeout => "ack-timeout",
            Self::OutboxFailed(_) => "outbox-failed",
            Self::LocalIdentityInvalid => "local-identity-invalid",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Issue one identity-cache fetch.
    FetchIdentity {
        /// 1-based attempt number
        attempt: u32,
    },
    /// Build, sign and send our identity packet.
    SendIdentity {
        /// 1-based attempt number (embedded in the packet id)
        attempt: u32,
    },
    /// Resolve every waiter with this outcome and destroy the coordinator.
    Report(HandshakeOutcome),
}

/// State and retry counters of one coordinator.
#[derive(Debug, Clone)]
pub struct HandshakeMachine {
    idurl: IdUrl,
    state: HandshakeState,
    cache_attempts: u32,
    ping_attempts: u32,
    cache_retries: u32,
    ping_retries: u32,
}

impl HandshakeMachine {
    /// Create a machine in `AT_STARTUP` with both counters at zero.
    pub fn new(idurl: IdUrl, cache_retries: u32, ping_retries: u32) -> Self {
        Self {
            idurl,
            state: HandshakeState::AtStartup,
            cache_attempts: 0,
            ping_attempts: 0,
            cache_retries,
            ping_retries,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Identity fetches issued so far.
    pub fn cache_attempts(&self) -> u32 {
        self.cache_attempts
    }

    /// Identity sends issued so far.
    pub fn ping_attempts(&self) -> u32 {
        self.ping_attempts
    }

    /// Peer this machine talks to.
    pub fn idurl(&self) -> &IdUrl {
        &self.idurl
    }

    /// Apply one event.
    ///
    /// Returns an empty list when the event is not defined for the current
    /// state (including every event in a terminal state).
    pub fn handle(&mut self, event: HandshakeEvent) -> Vec<HandshakeAction> {
        use HandshakeEvent as E;
        use HandshakeState as S;

        match (self.state, event) {
            (S::AtStartup, E::CacheAndPing) | (S::AtStartup, E::Ping { cached: false }) => {
                self.state = S::Cache;
                vec![self.fetch_identity()]
            }
            (S::AtStartup, E::Ping { cached: true }) => {
                self.state = S::AckWait;
                vec![self.send_identity()]
            }

            (S::Cache, E::RemoteIdentityCached) => {
                self.state = S::AckWait;
                vec![self.send_identity()]
            }
            (S::Cache, E::RemoteIdentityFailed(_)) if self.more_cache_retries() => {
                vec![self.fetch_identity()]
            }
            (S::Cache, E::RemoteIdentityFailed(_)) => {
                self.state = S::NoIdentity;
                vec![self.report(Err(HandshakeError::CacheExhausted {
                    idurl: self.idurl.to_string(),
                    attempts: self.cache_attempts,
                }))]
            }

            (S::AckWait, E::AckReceived(response, info)) => {
                self.state = S::Success;
                vec![self.report(Ok(HandshakeSuccess { response, info }))]
            }
            (S::AckWait, E::AckTimeout) if self.more_ping_retries() => {
                vec![self.send_identity()]
            }
            (S::AckWait, E::AckTimeout) => {
                self.state = S::Timeout;
                vec![self.report(Err(HandshakeError::AckTimeout {
                    idurl: self.idurl.to_string(),
                    attempts: self.ping_attempts,
                }))]
            }
            (S::AckWait, E::FailReceived(..)) => {
                self.state = S::Failed;
                vec![self.report(Err(HandshakeError::PeerRejected {
                    idurl: self.idurl.to_string(),
                }))]
            }
            (S::AckWait, E::OutboxFailed(err)) => {
                self.state = S::Failed;
                vec![self.report(Err(HandshakeError::SendFailed {
                    idurl: self.idurl.to_string(),
                    reason: err.to_string(),
                }))]
            }
            (S::AckWait, E::LocalIdentityInvalid) => {
                self.state = S::Failed;
                vec![self.report(Err(HandshakeError::InvalidLocalIdentity))]
            }

            _ => Vec::new(),
        }
    }

    fn more_cache_retries(&self) -> bool {
        self.cache_attempts <= self.cache_retries
    }

    fn more_ping_retries(&self) -> bool {
        self.ping_attempts <= self.ping_retries
    }

    fn fetch_identity(&mut self) -> HandshakeAction {
        self.cache_attempts += 1;
        HandshakeAction::FetchIdentity {
            attempt: self.cache_attempts,
        }
    }

    fn send_identity(&mut self) -> HandshakeAction {
        self.ping_attempts += 1;
        HandshakeAction::SendIdentity {
            attempt: self.ping_attempts,
        }
    }

    fn report(&self, outcome: HandshakeOutcome) -> HandshakeAction {
        HandshakeAction::Report(outcome)
    }
}
