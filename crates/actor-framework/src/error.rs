//! # Framework Errors
//!
//! Errors raised by the message plumbing itself, plus a carrier for the handler's
//! own error type so clients can recover it with [`FrameworkError::into_handler_error`].

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Handler error: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Wraps a handler error.
    pub fn handler<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FrameworkError::Handler(Box::new(error))
    }

    /// Recovers the typed handler error, or gives `self` back if this is a
    /// transport failure or a different error type.
    pub fn into_handler_error<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            FrameworkError::Handler(inner) => inner
                .downcast::<E>()
                .map(|typed| *typed)
                .map_err(FrameworkError::Handler),
            other => Err(other),
        }
    }
}
