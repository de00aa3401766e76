//! # Mock Framework & Testing Guide
//!
//! [`MockClient<H>`] hands out a real [`ServiceClient<H>`] whose requests are answered
//! from a queue of expectations instead of by a handler. Code that only talks to
//! an actor through its client can be tested without spawning the actor.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **State** | None, replies are scripted | Real handler state |
//! | **Use Case** | Logic *around* the client | The handler itself or the full system |
//! | **Error Injection** | Easy (`return_err`) | Needs the right state |
//!
//! ## Example
//!
//! ```rust
//! use actor_framework::mock::MockClient;
//! use actor_framework::{ActorHandler, FrameworkError};
//! use async_trait::async_trait;
//!
//! struct Counter;
//! #[derive(Debug)] enum CounterRequest { Bump }
//! #[derive(Debug, PartialEq)] enum CounterReply { Bumped(u32) }
//! #[derive(Debug, thiserror::Error)] #[error("counter")] struct CounterError;
//!
//! #[async_trait]
//! impl ActorHandler for Counter {
//!     type Request = CounterRequest;
//!     type Reply = CounterReply;
//!     type Context = ();
//!     type Error = CounterError;
//!     async fn handle(&mut self, _: CounterRequest, _: &()) -> Result<CounterReply, CounterError> {
//!         Ok(CounterReply::Bumped(1))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Counter>::new();
//!     mock.expect_call().return_ok(CounterReply::Bumped(7));
//!     mock.expect_call().return_err(FrameworkError::ActorClosed);
//!
//!     let client = mock.client();
//!     assert_eq!(client.call(CounterRequest::Bump).await.unwrap(), CounterReply::Bumped(7));
//!     assert!(matches!(client.call(CounterRequest::Bump).await, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! For finer control (inspecting the exact request, replying late, never replying)
//! use [`create_mock_client`] with [`expect_request`].

use crate::client::ServiceClient;
use crate::error::FrameworkError;
use crate::handler::ActorHandler;
use crate::message::{Envelope, Response};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type Matcher<R> = Box<dyn Fn(&R) -> bool + Send>;

struct Expectation<H: ActorHandler> {
    matcher: Option<Matcher<H::Request>>,
    response: Result<H::Reply, FrameworkError>,
}

type Expectations<H> = Arc<Mutex<VecDeque<Expectation<H>>>>;

/// A mock client with FIFO expectation tracking.
pub struct MockClient<H: ActorHandler> {
    client: ServiceClient<H>,
    expectations: Expectations<H>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<H: ActorHandler> Default for MockClient<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ActorHandler> MockClient<H> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<Envelope<H>>(100);
        let expectations: Expectations<H> = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        // Answers requests in arrival order from the expectation queue
        let handle = tokio::spawn(async move {
            while let Some(Envelope {
                request,
                respond_to,
            }) = receiver.recv().await
            {
                let expectation = expectations_clone.lock().unwrap().pop_front();
                match expectation {
                    Some(Expectation { matcher, response }) => {
                        if let Some(matcher) = matcher {
                            assert!(matcher(&request), "Unexpected request: {request:?}");
                        }
                        let _ = respond_to.send(response);
                    }
                    None => panic!("No expectation left for request: {request:?}"),
                }
            }
        });

        Self {
            client: ServiceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ServiceClient<H> {
        self.client.clone()
    }

    /// Expects the next call, whatever the request.
    pub fn expect_call(&mut self) -> CallExpectationBuilder<H> {
        CallExpectationBuilder {
            matcher: None,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects the next call and asserts the request satisfies `matcher`.
    pub fn expect_call_where<F>(&mut self, matcher: F) -> CallExpectationBuilder<H>
    where
        F: Fn(&H::Request) -> bool + Send + 'static,
    {
        CallExpectationBuilder {
            matcher: Some(Box::new(matcher)),
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for call expectations.
pub struct CallExpectationBuilder<H: ActorHandler> {
    matcher: Option<Matcher<H::Request>>,
    expectations: Expectations<H>,
}

impl<H: ActorHandler> CallExpectationBuilder<H> {
    /// Sets the expectation to return a successful reply.
    pub fn return_ok(self, reply: H::Reply) {
        self.push(Ok(reply));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<H::Reply, FrameworkError>) {
        self.expectations.lock().unwrap().push_back(Expectation {
            matcher: self.matcher,
            response,
        });
    }
}

/// Creates a client and the receiver its requests arrive on.
///
/// The test drives the "actor" side by hand with [`expect_request`].
pub fn create_mock_client<H: ActorHandler>(
    buffer_size: usize,
) -> (ServiceClient<H>, mpsc::Receiver<Envelope<H>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ServiceClient::new(sender), receiver)
}

/// Waits for the next request, returning it with its reply channel.
pub async fn expect_request<H: ActorHandler>(
    receiver: &mut mpsc::Receiver<Envelope<H>>,
) -> Option<(H::Request, Response<H::Reply>)> {
    receiver
        .recv()
        .await
        .map(|Envelope { request, respond_to }| (request, respond_to))
}
