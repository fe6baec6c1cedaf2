//! Handshake registry - request coalescing.
//!
//! Maps a peer address to its single in-flight coordinator and the waiters
//! attached to it. A key exists if and only if a non-terminated coordinator
//! exists for that peer. Only two mutations are allowed: `register` creating
//! an entry, and `finish` removing it (called by the owning coordinator).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use super::handle::HandshakeHandle;
use crate::domain::{HandshakeOutcome, IdUrl};

/// One in-flight handshake.
#[derive(Debug)]
struct RegistryEntry {
    /// Generation of the coordinator owning this entry.
    generation: u64,
    /// Outcome sinks, in arrival order.
    waiters: Vec<oneshot::Sender<HandshakeOutcome>>,
}

/// Result of `HandshakeRegistry::register`.
#[derive(Debug)]
pub enum Registration {
    /// No coordinator existed; the caller must create one with this generation.
    Created {
        /// Generation assigned to the new coordinator
        generation: u64,
        /// The caller's waiter
        handle: HandshakeHandle,
    },
    /// A coordinator is already running; the caller was appended as a waiter.
    Joined {
        /// The caller's waiter
        handle: HandshakeHandle,
    },
}

/// Process-wide (but injectable) map of in-flight handshakes.
#[derive(Debug, Default)]
pub struct HandshakeRegistry {
    entries: Mutex<HashMap<IdUrl, RegistryEntry>>,
    next_generation: AtomicU64,
}

impl HandshakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the handshake in flight for `idurl`, or reserve a new entry.
    pub fn register(&self, idurl: &IdUrl) -> Registration {
        let (sender, receiver) = oneshot::channel();
        let handle = HandshakeHandle::new(idurl.clone(), receiver);

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(idurl) {
            entry.waiters.push(sender);
            return Registration::Joined { handle };
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(
            idurl.clone(),
            RegistryEntry {
                generation,
                waiters: vec![sender],
            },
        );
        Registration::Created { generation, handle }
    }

    /// Remove the entry owned by `generation` and resolve all its waiters.
    ///
    /// Returns the number of waiters that received the outcome (dropped
    /// handles are not counted).
    pub fn finish(&self, idurl: &IdUrl, generation: u64, outcome: HandshakeOutcome) -> usize {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.get(idurl) {
                Some(entry) if entry.generation == generation => entries.remove(idurl),
                _ => None,
            }
        };

        let Some(entry) = entry else {
            warn!(idurl = %idurl, generation, "did not find my registered opened instance");
            return 0;
        };

        entry
            .waiters
            .into_iter()
            .map(|waiter| waiter.send(outcome.clone()).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    /// Whether a handshake with `idurl` is in flight.
    pub fn is_running(&self, idurl: &IdUrl) -> bool {
        self.entries.lock().contains_key(idurl)
    }

    /// Number of waiters attached to the handshake with `idurl`.
    pub fn waiter_count(&self, idurl: &IdUrl) -> usize {
        self.entries
            .lock()
            .get(idurl)
            .map(|entry| entry.waiters.len())
            .unwrap_or(0)
    }

    /// Number of handshakes in flight.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no handshake is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HandshakeError;

    fn peer(name: &str) -> IdUrl {
        IdUrl::new(format!("http://id.example.net/{}.xml", name)).unwrap()
    }

    #[test]
    fn test_first_register_creates_then_joins() {
        let registry = HandshakeRegistry::new();
        let alice = peer("alice");

        assert!(matches!(registry.register(&alice), Registration::Created { .. }));
        assert!(matches!(registry.register(&alice), Registration::Joined { .. }));
        assert!(matches!(registry.register(&peer("bob")), Registration::Created { .. }));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.waiter_count(&alice), 2);
    }

    #[tokio::test]
    async fn test_finish_fans_out_and_removes() {
        let registry = HandshakeRegistry::new();
        let alice = peer("alice");

        let Registration::Created { generation, handle: first } = registry.register(&alice) else {
            panic!("expected a new entry");
        };
        let Registration::Joined { handle: second } = registry.register(&alice) else {
            panic!("expected to join");
        };

        let outcome: HandshakeOutcome = Err(HandshakeError::PeerRejected {
            idurl: alice.to_string(),
        });
        assert_eq!(registry.finish(&alice, generation, outcome.clone()), 2);
        assert!(!registry.is_running(&alice));

        assert_eq!(first.await, outcome);
        assert_eq!(second.await, outcome);
    }

    #[test]
    fn test_finish_with_stale_generation_is_ignored() {
        let registry = HandshakeRegistry::new();
        let alice = peer("alice");

        let Registration::Created { generation, .. } = registry.register(&alice) else {
            panic!("expected a new entry");
        };
        let outcome: HandshakeOutcome = Err(HandshakeError::InvalidLocalIdentity);

        assert_eq!(registry.finish(&alice, generation + 1, outcome.clone()), 0);
        assert!(registry.is_running(&alice));

        registry.finish(&alice, generation, outcome);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_new_entry_after_finish_gets_new_generation() {
        let registry = HandshakeRegistry::new();
        let alice = peer("alice");

        let Registration::Created { generation: first, .. } = registry.register(&alice) else {
            panic!("expected a new entry");
        };
        registry.finish(&alice, first, Err(HandshakeError::InvalidLocalIdentity));

        let Registration::Created { generation: second, .. } = registry.register(&alice) else {
            panic!("expected a fresh entry");
        };
        assert_ne!(first, second);
    }
}
