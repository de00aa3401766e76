//! [`ActorHandler`] implementation that fronts the inventory store.
//!
//! Every store mutation in the process goes through this one actor, one request
//! at a time, and each transition is logged once here.

use super::actions::{InventoryAction, InventoryActionResult};
use super::error::InventoryError;
use super::storage::InventoryStorage;
use crate::model::OrderStatus;
use actor_framework::ActorHandler;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

pub struct InventoryLedger {
    storage: InventoryStorage,
}

impl InventoryLedger {
    pub fn new(storage: InventoryStorage) -> Self {
        Self { storage }
    }

    fn apply(&mut self, action: InventoryAction) -> Result<InventoryActionResult, InventoryError> {
        let storage = &self.storage;
        let result = match action {
            InventoryAction::Provision(serials) => {
                let created = storage.provision(&serials)?;
                info!(created, offered = serials.len(), "Provisioned allowances");
                InventoryActionResult::Provision(created)
            }
            InventoryAction::Claim {
                order_id,
                count,
                wallet,
                message,
            } => match storage.claim(order_id, count, &wallet, &message, Utc::now()) {
                Ok(serials) => {
                    info!(%order_id, count, %wallet, "Reserved");
                    InventoryActionResult::Claim(serials)
                }
                Err(e) => {
                    warn!(%order_id, count, error = %e, "Reservation refused");
                    return Err(e.into());
                }
            },
            InventoryAction::StampPayment { order_id, tx_hash } => {
                let view = storage.stamp_payment(order_id, &tx_hash)?;
                info!(%order_id, tx = %tx_hash, "Payment reference recorded");
                InventoryActionResult::StampPayment(view)
            }
            InventoryAction::Retire(order_id) => {
                let view = storage.retire(order_id)?;
                info!(%order_id, count = view.count(), "Retired");
                InventoryActionResult::Retire(view)
            }
            InventoryAction::AttachReward {
                order_id,
                reward_tx_hash,
            } => {
                storage.attach_reward(order_id, &reward_tx_hash)?;
                info!(%order_id, reward_tx = %reward_tx_hash, "Reward recorded");
                InventoryActionResult::AttachReward(())
            }
            InventoryAction::Release(order_id) => {
                let released = storage.release(order_id)?;
                info!(%order_id, released, "Released");
                InventoryActionResult::Release(released)
            }
            InventoryAction::ReleaseIfPending(order_id) => {
                let released = storage.release_if_pending(order_id)?;
                if released > 0 {
                    info!(%order_id, released, "Released unpaid reservation");
                }
                InventoryActionResult::ReleaseIfPending(released)
            }
            InventoryAction::OrderView(order_id) => {
                let view = storage.order_view(order_id)?;
                if let Some(view) = view.as_ref().filter(|v| v.status == OrderStatus::Error) {
                    error!(%order_id, serials = ?view.serials, "Order units disagree, manual reconciliation needed");
                }
                InventoryActionResult::OrderView(view)
            }
            InventoryAction::ListRetired(limit) => {
                InventoryActionResult::ListRetired(storage.list_retired(limit)?)
            }
            InventoryAction::Stock => InventoryActionResult::Stock(storage.stock()?),
            InventoryAction::InFlight => InventoryActionResult::InFlight(storage.in_flight()?),
            InventoryAction::Expired {
                pending_before,
                paid_before,
            } => InventoryActionResult::Expired(storage.expired(pending_before, paid_before)?),
        };
        Ok(result)
    }
}

#[async_trait]
impl ActorHandler for InventoryLedger {
    type Request = InventoryAction;
    type Reply = InventoryActionResult;
    type Context = ();
    type Error = InventoryError;

    async fn on_start(&mut self, _ctx: &()) -> Result<(), InventoryError> {
        let stock = self.storage.stock()?;
        info!(
            available = stock.available,
            reserved = stock.reserved,
            retired = stock.retired,
            "Inventory opened"
        );
        Ok(())
    }

    async fn handle(
        &mut self,
        action: InventoryAction,
        _ctx: &(),
    ) -> Result<InventoryActionResult, InventoryError> {
        self.apply(action)
    }
}
