use crate::{ActorHandler, FrameworkError, ServiceClient};
use async_trait::async_trait;

/// Trait for domain clients that wrap a [`ServiceClient`].
///
/// Implementors supply the inner client and an error mapping; `request` is
/// provided, instrumented, and returns the domain error type.
///
/// # Example
///
/// ```rust
/// use actor_framework::{ActorClient, ActorHandler, FrameworkError, ServiceClient};
/// use async_trait::async_trait;
///
/// struct Echo;
/// #[derive(Debug, thiserror::Error)]
/// enum EchoError {
///     #[error("Actor communication error: {0}")]
///     ActorCommunicationError(String),
/// }
/// impl From<String> for EchoError {
///     fn from(s: String) -> Self { EchoError::ActorCommunicationError(s) }
/// }
///
/// #[async_trait]
/// impl ActorHandler for Echo {
///     type Request = String;
///     type Reply = String;
///     type Context = ();
///     type Error = EchoError;
///     async fn handle(&mut self, req: String, _: &()) -> Result<String, EchoError> { Ok(req) }
/// }
///
/// struct EchoClient { inner: ServiceClient<Echo> }
///
/// impl ActorClient<Echo> for EchoClient {
///     type Error = EchoError;
///     fn inner(&self) -> &ServiceClient<Echo> { &self.inner }
///     fn map_error(e: FrameworkError) -> EchoError {
///         e.into_handler_error::<EchoError>()
///             .unwrap_or_else(|other| EchoError::from(other.to_string()))
///     }
/// }
///
/// async fn usage(client: EchoClient) -> Result<String, EchoError> {
///     client.request("ping".to_string()).await
/// }
/// ```
#[async_trait]
pub trait ActorClient<H: ActorHandler>: Send + Sync {
    /// The domain error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic ServiceClient.
    fn inner(&self) -> &ServiceClient<H>;

    /// Map framework errors to the domain error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Send a request and map any failure into the domain error.
    #[tracing::instrument(skip(self))]
    async fn request(&self, request: H::Request) -> Result<H::Reply, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().call(request).await.map_err(Self::map_error)
    }
}
