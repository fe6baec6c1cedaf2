//! Outcome handle returned to each handshake caller.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::{HandshakeError, HandshakeOutcome, IdUrl};

/// Resolves exactly once with the outcome of the handshake the caller joined.
///
/// Await it directly, or poll it alongside other work. If the coordinator
/// disappears without reporting, the handle resolves to
/// `HandshakeError::Aborted`.
#[derive(Debug)]
pub struct HandshakeHandle {
    idurl: IdUrl,
    receiver: oneshot::Receiver<HandshakeOutcome>,
}

impl HandshakeHandle {
    pub(crate) fn new(idurl: IdUrl, receiver: oneshot::Receiver<HandshakeOutcome>) -> Self {
        Self { idurl, receiver }
    }

    /// Peer this handle waits on.
    pub fn idurl(&self) -> &IdUrl {
        &self.idurl
    }
}

impl Future for HandshakeHandle {
    type Output = HandshakeOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HandshakeError::Aborted {
                idurl: this.idurl.to_string(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
