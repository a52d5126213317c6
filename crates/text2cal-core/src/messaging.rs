//! Request/response plumbing between execution contexts.
//!
//! A context owns a [`Mailbox`] and hands out [`Port`]s. Every request
//! travels with a [`Responder`] that can be used once. A router answers
//! synchronous messages on the spot, moves the responder into a task for
//! awaited work, or drops it for messages it does not handle; the requester
//! then sees [`PipelineError::NotHandled`] instead of a fault.

use kanal::{AsyncReceiver, AsyncSender};
use tokio::sync::oneshot;

use crate::error::PipelineError;

/// Reply continuation, consumed on use
pub struct Responder<R> {
    tx: oneshot::Sender<R>,
}

impl<R> Responder<R> {
    pub fn respond(self, reply: R) {
        if self.tx.send(reply).is_err() {
            tracing::debug!("Requester dropped before the reply arrived");
        }
    }
}

pub struct Envelope<M, R> {
    pub message: M,
    pub responder: Responder<R>,
}

/// What a router did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Answered before returning
    Replied,
    /// Responder moved into an async handler
    Pending,
    /// Responder dropped unanswered
    Unhandled,
}

/// Sending side of a context's mailbox
pub struct Port<M, R> {
    context: &'static str,
    tx: AsyncSender<Envelope<M, R>>,
}

impl<M, R> Clone for Port<M, R> {
    fn clone(&self) -> Self {
        Self {
            context: self.context,
            tx: self.tx.clone(),
        }
    }
}

impl<M, R> Port<M, R> {
    /// Sends `message` and waits for its single reply
    pub async fn request(&self, message: M) -> Result<R, PipelineError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                responder: Responder { tx },
            })
            .await
            .map_err(|e| PipelineError::ChannelClosed(format!("{}: {e}", self.context)))?;

        rx.await.map_err(|_| PipelineError::NotHandled(self.context))
    }
}

pub struct Mailbox<M, R> {
    rx: AsyncReceiver<Envelope<M, R>>,
}

impl<M, R> Clone for Mailbox<M, R> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<M, R> Mailbox<M, R> {
    /// `None` once every port is gone
    pub async fn recv(&self) -> Option<Envelope<M, R>> {
        self.rx.recv().await.ok()
    }
}

pub fn channel<M, R>(context: &'static str, capacity: usize) -> (Port<M, R>, Mailbox<M, R>) {
    let (tx, rx) = kanal::bounded_async(capacity);
    (Port { context, tx }, Mailbox { rx })
}
