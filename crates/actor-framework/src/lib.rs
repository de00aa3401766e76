//! # Actor Framework
//!
//! Building blocks for type-safe, concurrent request/reply services on Tokio.
//! Each service is an **actor**: a task that owns its state outright and receives
//! work through a channel, so the state is never shared and never locked.
//!
//! ## Why the Actor Model?
//!
//! - Isolated state (no shared memory, no locks)
//! - Message-passing concurrency
//! - Sequential processing within each actor eliminates race conditions on its state
//!
//! A service that must make a *check-then-act* decision atomically ("is this order
//! already being watched? if not, start watching it") gets that atomicity for free
//! by doing both steps inside one `handle` call.
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model)
//! - [Actors with Tokio](https://ryhl.io/blog/actors-with-tokio/)
//!
//! ## Architecture
//!
//! The framework separates concerns into three layers:
//!
//! 1. **Logic Layer** ([`ActorHandler`]) - your state and what each request does
//! 2. **Runtime Layer** ([`ServiceActor`]) - message loop, lifecycle hooks, logging
//! 3. **Interface Layer** ([`ServiceClient`], [`ActorClient`]) - type-safe calls
//!
//! ```text
//!   caller ──call(req)──▶ ServiceClient ──mpsc──▶ ServiceActor ──▶ ActorHandler::handle
//!     ▲                                                                  │
//!     └──────────────────────── oneshot reply ◀──────────────────────────┘
//! ```
//!
//! ## Context Injection Pattern
//!
//! Dependencies are injected when the actor starts running, via
//! [`ServiceActor::run`], not when it is constructed. Actors that need each other's
//! clients can all be created first and wired afterwards.
//!
//! ## Error Handling
//!
//! Handlers return their own error type. The framework boxes it into
//! [`FrameworkError::Handler`] for transport and domain clients get it back with
//! [`FrameworkError::into_handler_error`], so callers match on domain errors rather
//! than strings.
//!
//! ## Testing
//!
//! See [`mock`] for a scripted [`ServiceClient`] that needs no running actor.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod error;
pub mod handler;
pub mod message;
pub mod mock;
pub mod tracing;

// Re-exports for convenience
pub use actor::ServiceActor;
pub use client::ServiceClient;
pub use client_trait::ActorClient;
pub use error::FrameworkError;
pub use handler::ActorHandler;
pub use message::{Envelope, Response};
