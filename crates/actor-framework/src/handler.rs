//! # Actor Handler
//!
//! The [`ActorHandler`] trait is where a service's business logic lives. The framework
//! owns the channel, the task and the reply plumbing; the handler owns its state and
//! decides what each request means.
//!
//! A handler sees one request at a time. Whatever it keeps in `&mut self` (a storage
//! handle, a registry of running tasks, counters) is never touched concurrently, so
//! none of it needs a lock.

use async_trait::async_trait;
use std::fmt::Debug;

/// Business logic driven by a [`ServiceActor`](crate::ServiceActor).
///
/// # Associated types
///
/// - `Request` / `Reply`: usually a pair of enums whose variants match 1:1
///   (`FooAction::Bar` answers with `FooActionResult::Bar`).
/// - `Context`: dependencies injected when the actor starts running (other clients,
///   configuration). Use `()` when there are none.
/// - `Error`: one error enum per actor, not per request.
#[async_trait]
pub trait ActorHandler: Send + 'static {
    type Request: Send + Debug + 'static;
    type Reply: Send + Debug + 'static;
    type Context: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once before the first request is processed.
    ///
    /// Returning an error stops the actor; pending and future callers observe
    /// [`FrameworkError::ActorClosed`](crate::FrameworkError::ActorClosed).
    async fn on_start(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle a single request.
    async fn handle(
        &mut self,
        request: Self::Request,
        ctx: &Self::Context,
    ) -> Result<Self::Reply, Self::Error>;

    /// Called once after the last client is dropped.
    async fn on_stop(&mut self, _ctx: &Self::Context) {}
}
