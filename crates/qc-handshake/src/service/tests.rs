//! Tests for HandshakeService

use super::*;
use crate::adapters::mocks::{MockIdentityCache, MockPacketSender, MockReply, StaticLocalNode};
use crate::domain::{
    CacheError, HandshakeError, HandshakeOptions, IdUrl, IdentityDocument, OutboxError,
};
use crate::ports::HandshakeApi;
use std::sync::Arc;
use std::time::Duration;

/// Service over scripted collaborators, with handles to inspect them.
struct Harness {
    service: HandshakeService,
    cache: Arc<MockIdentityCache>,
    direct: Arc<MockPacketSender>,
    queued: Arc<MockPacketSender>,
}

fn harness(cache: MockIdentityCache, direct: MockPacketSender) -> Harness {
    harness_with_node(cache, direct, StaticLocalNode::new(local()))
}

fn harness_with_node(
    cache: MockIdentityCache,
    direct: MockPacketSender,
    node: StaticLocalNode,
) -> Harness {
    let cache = Arc::new(cache);
    let direct = Arc::new(direct);
    let queued = Arc::new(MockPacketSender::acking());
    let service = HandshakeService::new(
        cache.clone(),
        direct.clone(),
        queued.clone(),
        Arc::new(node),
    );
    Harness {
        service,
        cache,
        direct,
        queued,
    }
}

fn local() -> IdUrl {
    IdUrl::new("http://id.example.net/me.xml").unwrap()
}

fn peer(name: &str) -> IdUrl {
    IdUrl::new(format!("http://id.example.net/{}.xml", name)).unwrap()
}

// =============================================================================
// TEST GROUP 1: Happy paths
// =============================================================================

#[tokio::test]
async fn test_cached_peer_skips_fetch() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default())
        .await;

    let success = outcome.unwrap();
    assert_eq!(h.cache.fetch_count(&alice), 0);
    assert_eq!(h.direct.send_count(), 1);
    assert_eq!(success.response.creator, alice);
    assert_eq!(success.info.proto, "tcp");
}

#[tokio::test]
async fn test_uncached_peer_is_fetched_then_pinged() {
    let alice = peer("alice");
    let h = harness(MockIdentityCache::new(), MockPacketSender::acking());

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default())
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.cache.fetch_count(&alice), 1);
    assert_eq!(h.direct.send_count(), 1);
}

#[tokio::test]
async fn test_force_cache_fetches_even_when_cached() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default().with_force_cache(true))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.cache.fetch_count(&alice), 1);
    assert_eq!(h.direct.send_count(), 1);
}

#[tokio::test]
async fn test_second_send_acked_after_timeout() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );
    h.direct.push_reply(MockReply::Timeout);

    let success = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default().with_ping_retries(2))
        .await
        .unwrap();

    let sent = h.direct.sent_packets();
    assert_eq!(sent.len(), 2);
    assert_eq!(success.response.packet_id, sent[1].packet_id().to_string());
    assert!(sent[1].packet_id().as_str().starts_with("identity:1:2:"));
}

#[tokio::test]
async fn test_cache_recovers_after_one_failure() {
    let alice = peer("alice");
    let h = harness(MockIdentityCache::new(), MockPacketSender::acking());
    h.cache
        .push_result(Err(CacheError::Timeout(Duration::from_secs(5))));

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default())
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.cache.fetch_count(&alice), 2);
}

// =============================================================================
// TEST GROUP 2: Retry budgets
// =============================================================================

#[tokio::test]
async fn test_cache_failure_makes_retries_plus_one_attempts() {
    for retries in 0..4u32 {
        let alice = peer("alice");
        let h = harness(MockIdentityCache::failing(), MockPacketSender::acking());

        let outcome = h
            .service
            .request_handshake(
                alice.clone(),
                HandshakeOptions::default().with_cache_retries(retries),
            )
            .await;

        assert_eq!(
            outcome,
            Err(HandshakeError::CacheExhausted {
                idurl: alice.to_string(),
                attempts: retries + 1,
            })
        );
        assert_eq!(h.cache.fetch_count(&alice), retries + 1);
        assert_eq!(h.direct.send_count(), 0);
    }
}

#[tokio::test]
async fn test_default_cache_budget_gives_three_fetches() {
    let alice = peer("alice");
    let h = harness(MockIdentityCache::failing(), MockPacketSender::acking());

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default())
        .await;

    assert!(matches!(
        outcome,
        Err(HandshakeError::CacheExhausted { attempts: 3, .. })
    ));
    assert_eq!(h.cache.fetch_count(&alice), 3);
}

#[tokio::test]
async fn test_silent_peer_makes_retries_plus_one_sends() {
    for retries in 0..4u32 {
        let alice = peer("alice");
        let h = harness(
            MockIdentityCache::new().with_cached(&alice),
            MockPacketSender::silent(),
        );

        let outcome = h
            .service
            .request_handshake(
                alice.clone(),
                HandshakeOptions::default().with_ping_retries(retries),
            )
            .await;

        assert_eq!(
            outcome,
            Err(HandshakeError::AckTimeout {
                idurl: alice.to_string(),
                attempts: retries + 1,
            })
        );
        assert_eq!(h.direct.send_count(), (retries + 1) as usize);
    }
}

#[tokio::test]
async fn test_fail_received_is_terminal_immediately() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::new(MockReply::Fail),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default().with_ping_retries(5))
        .await;

    assert_eq!(
        outcome,
        Err(HandshakeError::PeerRejected {
            idurl: alice.to_string()
        })
    );
    assert_eq!(h.direct.send_count(), 1);
}

#[tokio::test]
async fn test_outbox_failure_is_terminal_immediately() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::new(MockReply::Error(OutboxError::QueueFull)),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default().with_ping_retries(5))
        .await;

    assert_eq!(
        outcome,
        Err(HandshakeError::SendFailed {
            idurl: alice.to_string(),
            reason: OutboxError::QueueFull.to_string(),
        })
    );
    assert_eq!(h.direct.send_count(), 1);
}

#[tokio::test]
async fn test_invalid_local_identity_fails_without_sending() {
    let alice = peer("alice");
    let h = harness_with_node(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
        StaticLocalNode::with_invalid_identity(local()),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default())
        .await;

    assert_eq!(outcome, Err(HandshakeError::InvalidLocalIdentity));
    assert_eq!(h.direct.send_count(), 0);
    assert!(!h.service.is_handshake_running(&alice));
}

// =============================================================================
// TEST GROUP 3: Coalescing and registry lifecycle
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_share_one_coordinator() {
    let alice = peer("alice");
    let h = harness(MockIdentityCache::new(), MockPacketSender::acking());

    let first = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default());
    let second = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default());

    assert_eq!(h.service.running_count(), 1);
    assert_eq!(h.service.registry().waiter_count(&alice), 2);

    let (a, b) = tokio::join!(first, second);
    assert!(a.is_ok());
    assert_eq!(a, b);
    assert_eq!(h.cache.fetch_count(&alice), 1);
    assert_eq!(h.direct.send_count(), 1);
}

#[tokio::test]
async fn test_many_waiters_resolve_identically_on_failure() {
    let alice = peer("alice");
    let h = harness(MockIdentityCache::failing(), MockPacketSender::acking());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            h.service
                .request_handshake(alice.clone(), HandshakeOptions::default())
        })
        .collect();
    assert_eq!(h.service.registry().waiter_count(&alice), 8);

    let outcomes = futures::future::join_all(handles).await;
    assert!(outcomes.iter().all(|outcome| outcome == &outcomes[0]));
    assert!(matches!(
        outcomes[0],
        Err(HandshakeError::CacheExhausted { attempts: 3, .. })
    ));
    assert_eq!(h.cache.fetch_count(&alice), 3);
}

#[tokio::test]
async fn test_late_caller_options_are_ignored() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );

    let first = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default());
    let second = h.service.request_handshake(
        alice.clone(),
        HandshakeOptions::default().with_force_cache(true),
    );

    let (a, b) = tokio::join!(first, second);
    assert_eq!(a, b);
    assert_eq!(h.cache.fetch_count(&alice), 0);
}

#[tokio::test]
async fn test_running_flag_tracks_lifecycle() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );

    let handle = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default());
    assert!(h.service.is_handshake_running(&alice));
    assert!(!h.service.is_handshake_running(&peer("bob")));

    handle.await.unwrap();
    assert!(!h.service.is_handshake_running(&alice));
    assert_eq!(h.service.running_count(), 0);
}

#[tokio::test]
async fn test_request_after_termination_starts_fresh() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::silent(),
    );
    let options = HandshakeOptions::default().with_ping_retries(1);

    let first = h
        .service
        .request_handshake(alice.clone(), options.clone())
        .await;
    let second = h.service.request_handshake(alice.clone(), options).await;

    assert_eq!(first, second);
    assert!(matches!(
        second,
        Err(HandshakeError::AckTimeout { attempts: 2, .. })
    ));

    let sent = h.direct.sent_packets();
    assert_eq!(sent.len(), 4);
    assert!(sent[0].packet_id().as_str().starts_with("identity:1:1:"));
    assert!(sent[2].packet_id().as_str().starts_with("identity:2:1:"));
}

#[tokio::test]
async fn test_independent_peers_run_side_by_side() {
    let alice = peer("alice");
    let bob = peer("bob");
    let h = harness(MockIdentityCache::new(), MockPacketSender::acking());

    let a = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default());
    let b = h
        .service
        .request_handshake(bob.clone(), HandshakeOptions::default());
    assert_eq!(h.service.running_count(), 2);

    let (a, b) = tokio::join!(a, b);
    assert_eq!(a.unwrap().response.creator, alice);
    assert_eq!(b.unwrap().response.creator, bob);
    assert_eq!(h.service.counters().current("identity"), 2);
}

// =============================================================================
// TEST GROUP 4: Identity packet
// =============================================================================

#[tokio::test]
async fn test_packet_fields_and_send_options() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );
    let options = HandshakeOptions::default()
        .with_ack_timeout(Duration::from_secs(7))
        .with_keep_alive(false);

    h.service
        .request_handshake(alice.clone(), options)
        .await
        .unwrap();

    let packet = &h.direct.sent_packets()[0];
    assert_eq!(packet.packet.command, crate::domain::PacketCommand::Identity);
    assert_eq!(packet.packet.owner_id, local());
    assert_eq!(packet.packet.creator_id, local());
    assert_eq!(packet.remote_id(), &alice);
    assert_eq!(packet.packet.payload, b"<identity local/>".to_vec());
    assert!(!packet.signature.is_empty());

    let sent_options = h.direct.last_options().unwrap();
    assert_eq!(sent_options.response_timeout, Duration::from_secs(7));
    assert!(!sent_options.keep_alive);
    assert!(sent_options.wide);
}

#[tokio::test]
async fn test_private_channel_omits_counter() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );

    h.service
        .request_handshake(
            alice.clone(),
            HandshakeOptions::default().with_channel("service_request", false),
        )
        .await
        .unwrap();

    let id = h.direct.sent_packets()[0].packet_id().to_string();
    let parts: Vec<_> = id.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "service_request");
    assert_eq!(parts[1], "1");
}

#[tokio::test]
async fn test_substitute_identity_is_sent() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );
    let substitute = IdentityDocument::new(
        peer("proxy"),
        b"<identity proxy/>".to_vec(),
        true,
    );

    h.service
        .request_handshake(
            alice.clone(),
            HandshakeOptions::default().with_substitute_identity(substitute),
        )
        .await
        .unwrap();

    assert_eq!(
        h.direct.sent_packets()[0].packet.payload,
        b"<identity proxy/>".to_vec()
    );
}

#[tokio::test]
async fn test_unsigned_substitute_identity_is_rejected() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );
    let substitute = IdentityDocument::new(peer("proxy"), b"<identity/>".to_vec(), false);

    let outcome = h
        .service
        .request_handshake(
            alice.clone(),
            HandshakeOptions::default().with_substitute_identity(substitute),
        )
        .await;

    assert_eq!(outcome, Err(HandshakeError::InvalidLocalIdentity));
    assert_eq!(h.direct.send_count(), 0);
}

#[tokio::test]
async fn test_queued_send_uses_outbox_backend() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::silent(),
    );

    let outcome = h
        .service
        .request_handshake(alice.clone(), HandshakeOptions::default().with_queued_send(true))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.queued.send_count(), 1);
    assert_eq!(h.direct.send_count(), 0);
}

#[tokio::test]
async fn test_service_via_trait_object() {
    let alice = peer("alice");
    let h = harness(
        MockIdentityCache::new().with_cached(&alice),
        MockPacketSender::acking(),
    );
    let api: &dyn HandshakeApi = &h.service;

    let handle = api.request_handshake(alice.clone(), HandshakeOptions::default());
    assert_eq!(handle.idurl(), &alice);
    assert!(api.is_handshake_running(&alice));
    assert!(handle.await.is_ok());
}
