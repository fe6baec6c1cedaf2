use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::registry::HandshakeRegistry;
use crate::domain::{
    ChannelCounters, HandshakeAction, HandshakeError, HandshakeEvent, HandshakeMachine,
    HandshakeOptions, HandshakeOutcome, IdUrl, OutboundPacket, PacketCommand, PacketId,
    SendOptions,
};
use crate::ports::{IdentityCache, LocalNode, PacketSender, SendOutcome};

// =============================================================================
// SHARED CONTEXT
// =============================================================================

/// Collaborators and shared tables every coordinator of one service uses.
#[derive(Clone)]
pub(crate) struct HandshakeContext {
    pub(crate) registry: Arc<HandshakeRegistry>,
    pub(crate) counters: Arc<ChannelCounters>,
    pub(crate) identity_cache: Arc<dyn IdentityCache>,
    pub(crate) direct_sender: Arc<dyn PacketSender>,
    pub(crate) queued_sender: Arc<dyn PacketSender>,
    pub(crate) local_node: Arc<dyn LocalNode>,
}

// =============================================================================
// COORDINATOR (driver of one HandshakeMachine)
// =============================================================================

/// Executes the side effects of one handshake.
///
/// All events of a coordinator flow through `run`, one at a time, so at most
/// one fetch or send is outstanding per peer. The coordinator removes its own
/// registry entry when it reports; if it is dropped before reporting (task
/// cancelled, runtime shut down) its waiters resolve to `Aborted`.
pub(crate) struct HandshakeCoordinator {
    name: String,
    generation: u64,
    machine: HandshakeMachine,
    options: HandshakeOptions,
    ctx: HandshakeContext,
    reported: bool,
}

impl HandshakeCoordinator {
    pub(crate) fn new(
        name: String,
        generation: u64,
        idurl: IdUrl,
        options: HandshakeOptions,
        ctx: HandshakeContext,
    ) -> Self {
        let machine = HandshakeMachine::new(idurl, options.cache_retries, options.ping_retries);
        Self {
            name,
            generation,
            machine,
            options,
            ctx,
            reported: false,
        }
    }

    /// Feed one event to the machine and return the actions it requested.
    pub(crate) fn dispatch(&mut self, event: HandshakeEvent) -> Vec<HandshakeAction> {
        let from = self.machine.state();
        let event_name = event.name();
        let actions = self.machine.handle(event);

        if actions.is_empty() {
            debug!(
                instance = %self.name,
                state = %from,
                event = event_name,
                "event ignored"
            );
        } else {
            debug!(
                instance = %self.name,
                event = event_name,
                "{} -> {}",
                from,
                self.machine.state()
            );
        }
        actions
    }

    /// Drive the coordinator until it reports.
    pub(crate) async fn run(mut self, initial: Vec<HandshakeAction>) {
        let mut pending: VecDeque<HandshakeAction> = initial.into();

        while let Some(action) = pending.pop_front() {
            let event = match action {
                HandshakeAction::FetchIdentity { attempt } => self.fetch_identity(attempt).await,
                HandshakeAction::SendIdentity { attempt } => self.send_identity(attempt).await,
                HandshakeAction::Report(outcome) => {
                    self.report(outcome);
                    continue;
                }
            };
            pending.extend(self.dispatch(event));
        }
    }

    async fn fetch_identity(&self, attempt: u32) -> HandshakeEvent {
        let idurl = self.machine.idurl();
        debug!(instance = %self.name, idurl = %idurl, attempt, "caching remote identity");

        match self
            .ctx
            .identity_cache
            .immediately_caching(idurl, self.options.cache_timeout)
            .await
        {
            Ok(_) => HandshakeEvent::RemoteIdentityCached,
            Err(err) => {
                debug!(instance = %self.name, attempt, error = %err, "identity fetch failed");
                HandshakeEvent::RemoteIdentityFailed(err)
            }
        }
    }

    async fn send_identity(&self, attempt: u32) -> HandshakeEvent {
        let identity = match &self.options.substitute_identity {
            Some(identity) => identity.clone(),
            None => self.ctx.local_node.identity(),
        };
        if !identity.is_valid() {
            warn!(instance = %self.name, "can not use invalid identity for ping");
            return HandshakeEvent::LocalIdentityInvalid;
        }

        let channel = &self.options.channel;
        let counter = self
            .options
            .channel_shared_counter
            .then(|| self.ctx.counters.current(channel));
        let packet_id = PacketId::generate(channel, counter, attempt);

        let local = self.ctx.local_node.idurl();
        let packet = self.ctx.local_node.sign(OutboundPacket {
            command: PacketCommand::Identity,
            owner_id: local.clone(),
            creator_id: local,
            packet_id: packet_id.clone(),
            payload: identity.serialize(),
            remote_id: self.machine.idurl().clone(),
        });

        let sender = if self.options.use_queued_send {
            &self.ctx.queued_sender
        } else {
            &self.ctx.direct_sender
        };
        let send_options = SendOptions {
            response_timeout: self.options.ack_timeout,
            keep_alive: self.options.keep_alive,
            wide: true,
        };

        debug!(
            instance = %self.name,
            packet_id = %packet_id,
            attempt,
            queued = self.options.use_queued_send,
            "sending identity"
        );

        match sender.send(packet, send_options).await {
            Ok(SendOutcome::Ack(response, info)) => HandshakeEvent::AckReceived(response, info),
            Ok(SendOutcome::Fail(response, info)) => HandshakeEvent::FailReceived(response, info),
            Ok(SendOutcome::Timeout) => HandshakeEvent::AckTimeout,
            Err(err) => HandshakeEvent::OutboxFailed(err),
        }
    }

    fn report(&mut self, outcome: HandshakeOutcome) {
        match &outcome {
            Ok(success) => info!(
                instance = %self.name,
                proto = %success.info.proto,
                host = %success.info.host,
                "handshake finished"
            ),
            Err(err) => warn!(instance = %self.name, state = %self.machine.state(), "{}", err),
        }

        self.reported = true;
        let delivered = self
            .ctx
            .registry
            .finish(self.machine.idurl(), self.generation, outcome);
        debug!(instance = %self.name, delivered, "destroyed");
    }
}

impl Drop for HandshakeCoordinator {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        let idurl = self.machine.idurl().clone();
        warn!(instance = %self.name, state = %self.machine.state(), "dropped before reporting");
        self.ctx.registry.finish(
            &idurl,
            self.generation,
            Err(HandshakeError::Aborted {
                idurl: idurl.to_string(),
            }),
        );
    }
}
