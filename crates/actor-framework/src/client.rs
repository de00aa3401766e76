//! # Service Client
//!
//! [`ServiceClient`] is the *interface* half of an actor. It holds only a sender,
//! so cloning it is cheap and clones can be handed to any number of tasks.

use crate::error::FrameworkError;
use crate::handler::ActorHandler;
use crate::message::Envelope;
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for interacting with a [`ServiceActor`](crate::ServiceActor).
pub struct ServiceClient<H: ActorHandler> {
    sender: mpsc::Sender<Envelope<H>>,
}

impl<H: ActorHandler> Clone for ServiceClient<H> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<H: ActorHandler> ServiceClient<H> {
    pub fn new(sender: mpsc::Sender<Envelope<H>>) -> Self {
        Self { sender }
    }

    /// Sends a request and waits for the handler's reply.
    pub async fn call(&self, request: H::Request) -> Result<H::Reply, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(Envelope {
                request,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// True once the actor's run loop has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
