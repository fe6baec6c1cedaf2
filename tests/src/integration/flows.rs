//! # Overlay Bring-up Flows
//!
//! The node joins the DHT, then shakes hands with the peers it wants to talk
//! to. These tests wire the real `IdentityCacheClient` and `OutboxSender`
//! adapters of qc-handshake next to a `DhtBootstrapCoordinator` over a
//! scripted DHT node.
//!
//! ## Flows Tested:
//!
//! 1. **DHT start → handshakes**: layers attached, then every peer is cached and acked
//! 2. **Coalescing through the outbox**: N callers, one fetch and one packet
//! 3. **Failure fan-out**: unpublished or silent peers fail every waiter identically
//! 4. **Settings reload**: a UDP port change after bring-up asks for a reconnect

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures::future::join_all;

    use qc_dht_bootstrap::adapters::mocks::{
        AllowAllPolicy, MockDhtNode, RecordingReconnect,
    };
    use qc_dht_bootstrap::adapters::{StaticSettingsProvider, TomlSettingsProvider};
    use qc_dht_bootstrap::{DhtBootstrapApi, DhtBootstrapCoordinator, DhtLifecycle, DhtSettings};

    use qc_handshake::adapters::identity_cache::{IdentityCacheClient, IdentityFetcher};
    use qc_handshake::adapters::mocks::{MockPacketSender, StaticLocalNode};
    use qc_handshake::adapters::outbox::OutboxSender;
    use qc_handshake::{
        CacheError, HandshakeConfig, HandshakeError, HandshakeService, IdUrl, IdentityDocument,
    };

    use crate::init_test_tracing;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Identity server holding the documents peers published.
    #[derive(Default)]
    struct IdentityDirectory {
        published: HashMap<IdUrl, IdentityDocument>,
        fetches: AtomicU32,
    }

    impl IdentityDirectory {
        fn publish(mut self, idurl: &IdUrl) -> Self {
            let body = format!("<identity {}/>", idurl);
            self.published
                .insert(idurl.clone(), IdentityDocument::new(idurl.clone(), body, true));
            self
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    /// Fetcher reading from a shared `IdentityDirectory`.
    struct DirectoryFetcher(Arc<IdentityDirectory>);

    #[async_trait]
    impl IdentityFetcher for DirectoryFetcher {
        async fn fetch(&self, idurl: &IdUrl) -> Result<IdentityDocument, CacheError> {
            self.0.fetches.fetch_add(1, Ordering::SeqCst);
            self.0
                .published
                .get(idurl)
                .cloned()
                .ok_or_else(|| CacheError::Fetch(format!("{} not published", idurl)))
        }
    }

    /// A node with both services wired.
    struct Overlay {
        dht: Arc<DhtBootstrapCoordinator>,
        dht_node: Arc<MockDhtNode>,
        reconnect: Arc<RecordingReconnect>,
        handshakes: HandshakeService,
        directory: Arc<IdentityDirectory>,
        transport: Arc<MockPacketSender>,
        config: HandshakeConfig,
    }

    fn overlay(settings: DhtSettings, directory: IdentityDirectory, transport: MockPacketSender) -> Overlay {
        init_test_tracing();

        let dht_node = Arc::new(MockDhtNode::new());
        let reconnect = Arc::new(RecordingReconnect::new());
        let dht = Arc::new(DhtBootstrapCoordinator::new(
            dht_node.clone(),
            Arc::new(StaticSettingsProvider::new(settings)),
            Arc::new(AllowAllPolicy),
            reconnect.clone(),
        ));

        let config = HandshakeConfig {
            use_queued_send: true,
            ..HandshakeConfig::for_testing()
        };
        let directory = Arc::new(directory);
        let transport = Arc::new(transport);
        let (outbox, _worker) = OutboxSender::spawn(transport.clone(), config.outbox_capacity);
        let handshakes = HandshakeService::new(
            Arc::new(IdentityCacheClient::new(DirectoryFetcher(directory.clone()))),
            transport.clone(),
            Arc::new(outbox),
            Arc::new(StaticLocalNode::new(peer("me"))),
        );

        Overlay {
            dht,
            dht_node,
            reconnect,
            handshakes,
            directory,
            transport,
            config,
        }
    }

    fn peer(name: &str) -> IdUrl {
        IdUrl::new(format!("http://id.quantum-chain.net/{}.xml", name)).unwrap()
    }

    // =============================================================================
    // INTEGRATION TESTS: DHT START → HANDSHAKES
    // =============================================================================

    #[tokio::test]
    async fn test_bringup_then_handshake_every_peer() {
        let peers = [peer("alice"), peer("bob"), peer("carol")];
        let directory = peers
            .iter()
            .fold(IdentityDirectory::default(), |dir, p| dir.publish(p));
        let settings = DhtSettings {
            attached_layers: "1,2".into(),
            ..DhtSettings::for_testing()
        };
        let node = overlay(settings, directory, MockPacketSender::acking());

        node.dht.start().await.unwrap();
        assert_eq!(node.dht.lifecycle(), DhtLifecycle::Running);
        assert_eq!(node.dht.attached_layers(), vec![0, 1, 2]);

        let outcomes = join_all(
            peers
                .iter()
                .map(|p| node.handshakes.request_handshake(p.clone(), node.config.options())),
        )
        .await;

        for (p, outcome) in peers.iter().zip(outcomes) {
            assert_eq!(&outcome.unwrap().response.creator, p);
        }
        assert_eq!(node.directory.fetches(), 3);
        assert_eq!(node.transport.send_count(), 3);
        assert_eq!(node.handshakes.running_count(), 0);
    }

    #[tokio::test]
    async fn test_cached_peer_is_not_fetched_twice() {
        let alice = peer("alice");
        let node = overlay(
            DhtSettings::for_testing(),
            IdentityDirectory::default().publish(&alice),
            MockPacketSender::acking(),
        );

        node.handshakes
            .request_handshake(alice.clone(), node.config.options())
            .await
            .unwrap();
        node.handshakes
            .request_handshake(alice.clone(), node.config.options())
            .await
            .unwrap();

        assert_eq!(node.directory.fetches(), 1);
        assert_eq!(node.transport.send_count(), 2);
    }

    // =============================================================================
    // INTEGRATION TESTS: COALESCING AND FAILURE FAN-OUT
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_requests_share_one_exchange() {
        let alice = peer("alice");
        let node = overlay(
            DhtSettings::for_testing(),
            IdentityDirectory::default().publish(&alice),
            MockPacketSender::acking(),
        );

        let handles: Vec<_> = (0..5)
            .map(|_| {
                node.handshakes
                    .request_handshake(alice.clone(), node.config.options())
            })
            .collect();
        assert!(node.handshakes.is_handshake_running(&alice));

        let outcomes = join_all(handles).await;

        let first = outcomes[0].clone().unwrap();
        assert!(outcomes.iter().all(|o| o.as_ref() == Ok(&first)));
        assert_eq!(node.directory.fetches(), 1);
        assert_eq!(node.transport.send_count(), 1);
    }

    #[tokio::test]
    async fn test_unpublished_peer_fails_all_waiters() {
        let ghost = peer("ghost");
        let node = overlay(
            DhtSettings::for_testing(),
            IdentityDirectory::default(),
            MockPacketSender::acking(),
        );

        let outcomes = join_all((0..3).map(|_| {
            node.handshakes
                .request_handshake(ghost.clone(), node.config.options())
        }))
        .await;

        for outcome in &outcomes {
            assert!(matches!(outcome, Err(HandshakeError::CacheExhausted { .. })));
        }
        assert_eq!(outcomes[0], outcomes[2]);
        assert_eq!(node.directory.fetches(), node.config.cache_retries + 1);
        assert_eq!(node.transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_through_outbox() {
        let alice = peer("alice");
        let node = overlay(
            DhtSettings::for_testing(),
            IdentityDirectory::default().publish(&alice),
            MockPacketSender::silent(),
        );

        let outcome = node
            .handshakes
            .request_handshake(alice.clone(), node.config.options())
            .await;

        assert!(matches!(outcome, Err(HandshakeError::AckTimeout { .. })));
        assert_eq!(
            node.transport.send_count(),
            node.config.ping_retries as usize + 1
        );
    }

    // =============================================================================
    // INTEGRATION TESTS: SETTINGS
    // =============================================================================

    #[tokio::test]
    async fn test_toml_settings_drive_bringup() {
        let provider = TomlSettingsProvider::parse(
            r#"
            [dht]
            udp_port = 15441
            known_nodes = "10.1.0.1:14441, 10.1.0.2:14441"
            attached_layers = "3"

            [kademlia]
            rpc_timeout_secs = 2
            "#,
        )
        .unwrap();
        let node = Arc::new(MockDhtNode::new());
        let dht = DhtBootstrapCoordinator::new(
            node.clone(),
            Arc::new(provider),
            Arc::new(AllowAllPolicy),
            Arc::new(RecordingReconnect::new()),
        );

        let params = dht.network_parameters().unwrap();
        assert_eq!(params.known_nodes.len(), 2);

        dht.start().await.unwrap();
        assert_eq!(node.connected_layers(), vec![0, 3]);
    }

    #[tokio::test]
    async fn test_port_change_after_bringup_requests_reconnect() {
        let node = overlay(
            DhtSettings::for_testing(),
            IdentityDirectory::default(),
            MockPacketSender::acking(),
        );
        let api: Arc<dyn DhtBootstrapApi> = node.dht.clone();

        api.start().await.unwrap();
        node.dht.on_udp_port_modified(14441, 15441);
        assert!(api.stop().await);
        node.dht.on_udp_port_modified(15441, 16441);

        assert_eq!(node.reconnect.requests(), 1);
        assert!(node.dht_node.validator(qc_dht_bootstrap::RpcKind::Store).is_none());
    }
}
