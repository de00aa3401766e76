//! # Inventory Client
//!
//! Typed API over the inventory ledger actor. Every method sends one
//! [`InventoryAction`] and unwraps the matching [`InventoryActionResult`].

use crate::inventory::{InventoryAction, InventoryActionResult, InventoryError, InventoryLedger};
use crate::model::{
    OrderId, OrderView, RetirementRecord, SerialNumber, StockLevels, TxHash, WalletAddress,
};
use actor_framework::{ActorClient, FrameworkError, ServiceClient};
use chrono::{DateTime, Utc};
use tracing::instrument;

#[derive(Clone)]
pub struct InventoryClient {
    inner: ServiceClient<InventoryLedger>,
}

impl InventoryClient {
    pub fn new(inner: ServiceClient<InventoryLedger>) -> Self {
        Self { inner }
    }

    pub async fn provision(&self, serials: Vec<SerialNumber>) -> Result<usize, InventoryError> {
        match self.request(InventoryAction::Provision(serials)).await? {
            InventoryActionResult::Provision(created) => Ok(created),
            _ => unreachable!("Provision must return Provision result"),
        }
    }

    #[instrument(skip(self, wallet, message))]
    pub async fn claim(
        &self,
        order_id: OrderId,
        count: u32,
        wallet: WalletAddress,
        message: String,
    ) -> Result<Vec<SerialNumber>, InventoryError> {
        let action = InventoryAction::Claim {
            order_id,
            count,
            wallet,
            message,
        };
        match self.request(action).await? {
            InventoryActionResult::Claim(serials) => Ok(serials),
            _ => unreachable!("Claim must return Claim result"),
        }
    }

    #[instrument(skip(self))]
    pub async fn stamp_payment(
        &self,
        order_id: OrderId,
        tx_hash: TxHash,
    ) -> Result<OrderView, InventoryError> {
        match self
            .request(InventoryAction::StampPayment { order_id, tx_hash })
            .await?
        {
            InventoryActionResult::StampPayment(view) => Ok(view),
            _ => unreachable!("StampPayment must return StampPayment result"),
        }
    }

    #[instrument(skip(self))]
    pub async fn retire(&self, order_id: OrderId) -> Result<OrderView, InventoryError> {
        match self.request(InventoryAction::Retire(order_id)).await? {
            InventoryActionResult::Retire(view) => Ok(view),
            _ => unreachable!("Retire must return Retire result"),
        }
    }

    pub async fn attach_reward(
        &self,
        order_id: OrderId,
        reward_tx_hash: String,
    ) -> Result<(), InventoryError> {
        match self
            .request(InventoryAction::AttachReward {
                order_id,
                reward_tx_hash,
            })
            .await?
        {
            InventoryActionResult::AttachReward(()) => Ok(()),
            _ => unreachable!("AttachReward must return AttachReward result"),
        }
    }

    #[instrument(skip(self))]
    pub async fn release(&self, order_id: OrderId) -> Result<usize, InventoryError> {
        match self.request(InventoryAction::Release(order_id)).await? {
            InventoryActionResult::Release(released) => Ok(released),
            _ => unreachable!("Release must return Release result"),
        }
    }

    pub async fn release_if_pending(&self, order_id: OrderId) -> Result<usize, InventoryError> {
        match self.request(InventoryAction::ReleaseIfPending(order_id)).await? {
            InventoryActionResult::ReleaseIfPending(released) => Ok(released),
            _ => unreachable!("ReleaseIfPending must return ReleaseIfPending result"),
        }
    }

    pub async fn order_view(&self, order_id: OrderId) -> Result<Option<OrderView>, InventoryError> {
        match self.request(InventoryAction::OrderView(order_id)).await? {
            InventoryActionResult::OrderView(view) => Ok(view),
            _ => unreachable!("OrderView must return OrderView result"),
        }
    }

    pub async fn list_retired(&self, limit: usize) -> Result<Vec<RetirementRecord>, InventoryError> {
        match self.request(InventoryAction::ListRetired(limit)).await? {
            InventoryActionResult::ListRetired(records) => Ok(records),
            _ => unreachable!("ListRetired must return ListRetired result"),
        }
    }

    pub async fn stock(&self) -> Result<StockLevels, InventoryError> {
        match self.request(InventoryAction::Stock).await? {
            InventoryActionResult::Stock(stock) => Ok(stock),
            _ => unreachable!("Stock must return Stock result"),
        }
    }

    pub async fn in_flight(&self) -> Result<Vec<OrderView>, InventoryError> {
        match self.request(InventoryAction::InFlight).await? {
            InventoryActionResult::InFlight(views) => Ok(views),
            _ => unreachable!("InFlight must return InFlight result"),
        }
    }

    pub async fn expired(
        &self,
        pending_before: DateTime<Utc>,
        paid_before: DateTime<Utc>,
    ) -> Result<Vec<OrderView>, InventoryError> {
        match self
            .request(InventoryAction::Expired {
                pending_before,
                paid_before,
            })
            .await?
        {
            InventoryActionResult::Expired(views) => Ok(views),
            _ => unreachable!("Expired must return Expired result"),
        }
    }
}

impl ActorClient<InventoryLedger> for InventoryClient {
    type Error = InventoryError;

    fn inner(&self) -> &ServiceClient<InventoryLedger> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        e.into_handler_error::<InventoryError>()
            .unwrap_or_else(|other| InventoryError::ActorCommunicationError(other.to_string()))
    }
}
