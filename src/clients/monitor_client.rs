//! # Monitor Client
//!
//! Typed API over the monitor registry actor.

use crate::model::{OrderId, TxHash};
use crate::monitor::{MonitorAction, MonitorActionResult, MonitorError, MonitorKind, MonitorRegistry};
use actor_framework::{ActorClient, FrameworkError, ServiceClient};
use tracing::instrument;

#[derive(Clone)]
pub struct MonitorClient {
    inner: ServiceClient<MonitorRegistry>,
}

impl MonitorClient {
    pub fn new(inner: ServiceClient<MonitorRegistry>) -> Self {
        Self { inner }
    }

    /// Starts the unpaid-reservation hold for a freshly claimed order.
    #[instrument(skip(self))]
    pub async fn start_hold(&self, order_id: OrderId) -> Result<(), MonitorError> {
        match self.request(MonitorAction::StartHold(order_id)).await? {
            MonitorActionResult::StartHold(()) => Ok(()),
            _ => unreachable!("StartHold must return StartHold result"),
        }
    }

    /// Starts polling the ledger for `tx_hash`. Replaces a running hold.
    #[instrument(skip(self))]
    pub async fn start_payment(
        &self,
        order_id: OrderId,
        tx_hash: TxHash,
        units: usize,
    ) -> Result<(), MonitorError> {
        let action = MonitorAction::StartPayment {
            order_id,
            tx_hash,
            units,
        };
        match self.request(action).await? {
            MonitorActionResult::StartPayment(()) => Ok(()),
            _ => unreachable!("StartPayment must return StartPayment result"),
        }
    }

    /// Returns whether a task was running for the order.
    pub async fn cancel(&self, order_id: OrderId) -> Result<bool, MonitorError> {
        match self.request(MonitorAction::Cancel(order_id)).await? {
            MonitorActionResult::Cancel(cancelled) => Ok(cancelled),
            _ => unreachable!("Cancel must return Cancel result"),
        }
    }

    pub async fn active(&self, order_id: OrderId) -> Result<Option<MonitorKind>, MonitorError> {
        match self.request(MonitorAction::Active(order_id)).await? {
            MonitorActionResult::Active(kind) => Ok(kind),
            _ => unreachable!("Active must return Active result"),
        }
    }

    pub async fn active_count(&self) -> Result<usize, MonitorError> {
        match self.request(MonitorAction::ActiveCount).await? {
            MonitorActionResult::ActiveCount(count) => Ok(count),
            _ => unreachable!("ActiveCount must return ActiveCount result"),
        }
    }
}

impl ActorClient<MonitorRegistry> for MonitorClient {
    type Error = MonitorError;

    fn inner(&self) -> &ServiceClient<MonitorRegistry> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        e.into_handler_error::<MonitorError>()
            .unwrap_or_else(|other| MonitorError::ActorCommunicationError(other.to_string()))
    }
}
