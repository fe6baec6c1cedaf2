//! Queued sender backend.
//!
//! Identity packets are pushed onto a bounded queue; a single worker hands
//! them to the transport in arrival order. Each packet's answer is awaited
//! off the worker so one slow peer never stalls the queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::{OutboxError, SendOptions, SignedPacket};
use crate::ports::{PacketSender, SendOutcome};

struct OutboxJob {
    packet: SignedPacket,
    options: SendOptions,
    reply: oneshot::Sender<Result<SendOutcome, OutboxError>>,
}

/// `PacketSender` that routes packets through the outbox queue.
#[derive(Clone)]
pub struct OutboxSender {
    queue: mpsc::Sender<OutboxJob>,
}

impl OutboxSender {
    /// Start the outbox worker over `transport`.
    ///
    /// The worker exits once every `OutboxSender` clone is dropped.
    pub fn spawn(transport: Arc<dyn PacketSender>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (queue, jobs) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(transport, jobs));
        (Self { queue }, worker)
    }
}

async fn run_worker(transport: Arc<dyn PacketSender>, mut jobs: mpsc::Receiver<OutboxJob>) {
    while let Some(job) = jobs.recv().await {
        trace!(packet_id = %job.packet.packet_id(), "outbox dispatch");
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let result = transport.send(job.packet, job.options).await;
            // The requester may have gone away; nothing to deliver then.
            let _ = job.reply.send(result);
        });
    }
    debug!("outbox worker stopped");
}

#[async_trait]
impl PacketSender for OutboxSender {
    async fn send(
        &self,
        packet: SignedPacket,
        options: SendOptions,
    ) -> Result<SendOutcome, OutboxError> {
        let (reply, answer) = oneshot::channel();
        self.queue
            .try_send(OutboxJob {
                packet,
                options,
                reply,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => OutboxError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => OutboxError::Closed,
            })?;

        answer.await.map_err(|_| OutboxError::Closed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mocks::{MockPacketSender, MockReply};
    use crate::domain::{IdUrl, OutboundPacket, PacketCommand, PacketId};
    use std::time::Duration;

    fn packet(attempt: u32) -> SignedPacket {
        let local = IdUrl::new("http://id.example.net/me.xml").unwrap();
        SignedPacket {
            packet: OutboundPacket {
                command: PacketCommand::Identity,
                owner_id: local.clone(),
                creator_id: local,
                packet_id: PacketId::generate("identity", Some(1), attempt),
                payload: b"<identity/>".to_vec(),
                remote_id: IdUrl::new("http://id.example.net/alice.xml").unwrap(),
            },
            signature: b"sig".to_vec(),
        }
    }

    fn options() -> SendOptions {
        SendOptions {
            response_timeout: Duration::from_secs(15),
            keep_alive: true,
            wide: true,
        }
    }

    #[tokio::test]
    async fn test_outbox_forwards_to_transport() {
        let transport = Arc::new(MockPacketSender::new(MockReply::Ack));
        let (outbox, _worker) = OutboxSender::spawn(transport.clone(), 4);

        let outcome = outbox.send(packet(1), options()).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Ack(..)));
        assert_eq!(transport.send_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let transport = Arc::new(MockPacketSender::new(MockReply::Error(
            OutboxError::Transport("no route".into()),
        )));
        let (outbox, _worker) = OutboxSender::spawn(transport, 4);

        let result = outbox.send(packet(1), options()).await;

        assert_eq!(result, Err(OutboxError::Transport("no route".into())));
    }

    #[tokio::test]
    async fn test_stopped_worker_reports_closed() {
        let transport = Arc::new(MockPacketSender::new(MockReply::Ack));
        let (outbox, worker) = OutboxSender::spawn(transport, 4);
        worker.abort();
        let _ = worker.await;

        let result = outbox.send(packet(1), options()).await;

        assert_eq!(result, Err(OutboxError::Closed));
    }

    #[tokio::test]
    async fn test_full_queue_is_rejected() {
        let (queue, _jobs) = mpsc::channel(1);
        let outbox = OutboxSender { queue };

        // Nobody drains the queue: this job occupies the only slot.
        let (reply, _answer) = oneshot::channel();
        assert!(outbox
            .queue
            .try_send(OutboxJob {
                packet: packet(1),
                options: options(),
                reply,
            })
            .is_ok());

        let result = outbox.send(packet(2), options()).await;
        assert_eq!(result, Err(OutboxError::QueueFull));
    }
}
