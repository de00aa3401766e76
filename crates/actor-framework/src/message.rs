//! # Messages
//!
//! Every request travels to the actor inside an [`Envelope`] that carries the
//! one-shot channel the reply goes back on.

use crate::handler::ActorHandler;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// A request paired with its reply channel.
pub struct Envelope<H: ActorHandler> {
    pub request: H::Request,
    pub respond_to: Response<H::Reply>,
}

impl<H: ActorHandler> std::fmt::Debug for Envelope<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
