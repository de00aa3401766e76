//! # Service Actor
//!
//! [`ServiceActor`] is the *server* half of an actor: it owns the handler and the
//! receiving end of the channel, and it runs in its own Tokio task.

use crate::client::ServiceClient;
use crate::error::FrameworkError;
use crate::handler::ActorHandler;
use crate::message::Envelope;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// The generic actor that drives an [`ActorHandler`].
///
/// # Concurrency Model
///
/// Requests are processed strictly one after another. Two callers racing on the
/// same client never interleave inside the handler, which is what lets a handler
/// perform read-modify-write sequences on its state without locks.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ServiceActor::new(buffer, handler)` returns the actor and a client.
/// 2.  **Wire**: pass dependencies into `actor.run(context)`.
/// 3.  **Run**: spawn the run loop in a background task.
///
/// ```rust
/// use actor_framework::{ActorHandler, ServiceActor};
/// use async_trait::async_trait;
///
/// struct Tally { total: u64 }
///
/// #[derive(Debug)] enum TallyRequest { Add(u64), Total }
/// #[derive(Debug, PartialEq)] enum TallyReply { Added, Total(u64) }
/// #[derive(Debug, thiserror::Error)] #[error("tally error")] struct TallyError;
///
/// #[async_trait]
/// impl ActorHandler for Tally {
///     type Request = TallyRequest;
///     type Reply = TallyReply;
///     type Context = ();
///     type Error = TallyError;
///
///     async fn handle(&mut self, req: TallyRequest, _: &()) -> Result<TallyReply, TallyError> {
///         match req {
///             TallyRequest::Add(n) => { self.total += n; Ok(TallyReply::Added) }
///             TallyRequest::Total => Ok(TallyReply::Total(self.total)),
///         }
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = ServiceActor::new(10, Tally { total: 0 });
///     tokio::spawn(actor.run(()));
///
///     client.call(TallyRequest::Add(3)).await.unwrap();
///     assert_eq!(client.call(TallyRequest::Total).await.unwrap(), TallyReply::Total(3));
/// }
/// ```
pub struct ServiceActor<H: ActorHandler> {
    receiver: mpsc::Receiver<Envelope<H>>,
    handler: H,
}

impl<H: ActorHandler> ServiceActor<H> {
    /// Creates a new `ServiceActor` and its associated `ServiceClient`.
    ///
    /// `buffer_size` is the capacity of the MPSC channel. When it is full,
    /// callers wait until there is space.
    pub fn new(buffer_size: usize, handler: H) -> (Self, ServiceClient<H>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self { receiver, handler };
        (actor, ServiceClient::new(sender))
    }

    /// Runs the actor's event loop until every client has been dropped.
    ///
    /// # Context Injection
    /// `context` is handed to every handler hook. It is supplied here rather than
    /// in [`ServiceActor::new`] so actors can be wired to each other's clients
    /// after all of them have been created.
    pub async fn run(mut self, context: H::Context) {
        // "Counter" instead of "my_app::counter::Counter"
        let actor_type = std::any::type_name::<H>()
            .split("::")
            .last()
            .unwrap_or("Unknown");

        if let Err(e) = self.handler.on_start(&context).await {
            error!(actor_type, error = %e, "on_start failed, actor not started");
            return;
        }
        info!(actor_type, "Actor started");

        let mut processed: u64 = 0;
        while let Some(Envelope {
            request,
            respond_to,
        }) = self.receiver.recv().await
        {
            debug!(actor_type, ?request, "Request");
            let result = self
                .handler
                .handle(request, &context)
                .await
                .map_err(|e| {
                    warn!(actor_type, error = %e, "Request failed");
                    FrameworkError::handler(e)
                });
            processed += 1;
            if respond_to.send(result).is_err() {
                debug!(actor_type, "Caller went away before the reply");
            }
        }

        self.handler.on_stop(&context).await;
        info!(actor_type, processed, "Shutdown");
    }
}
