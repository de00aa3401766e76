//! Per-order background tasks: the payment monitor and the reservation hold.

use super::machine::{PaymentWatch, WatchEvent, WatchState};
use crate::clients::InventoryClient;
use crate::inventory::InventoryError;
use crate::model::{OrderId, OrderView, TxHash};
use crate::payment::{reward_amount, PaymentVerifier, RewardIssuer};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Polling cadence shared by payment monitors and reservation holds.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    /// Wall-clock budget of one monitor.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Collaborators a monitor needs.
#[derive(Clone)]
pub struct MonitorDeps {
    pub inventory: InventoryClient,
    pub verifier: PaymentVerifier,
    pub rewards: Arc<dyn RewardIssuer>,
    pub poll: PollSettings,
}

/// Attempts at retiring a verified order before the monitor gives up.
const RETIRE_ATTEMPTS: u32 = 4;
const RETIRE_BACKOFF: Duration = Duration::from_millis(500);

/// How a monitor ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Confirmed { reward_tx_hash: Option<String> },
    /// The payment is valid but the order could not be retired. The order
    /// stays paid and the sweeper re-arms a monitor for it.
    RetireFailed(String),
    Failed(String),
    TimedOut,
    /// The hold expired and released this many units.
    Released(usize),
    Cancelled,
}

/// Watches `tx_hash` until the order is retired or released.
///
/// The first poll happens one interval after start.
pub async fn run_payment_monitor(
    order_id: OrderId,
    tx_hash: TxHash,
    units: usize,
    deps: MonitorDeps,
    cancel: CancellationToken,
) -> MonitorOutcome {
    let mut watch = PaymentWatch::new(deps.poll.max_attempts);
    info!(%order_id, tx = %tx_hash, units, "Payment monitor started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(%order_id, attempt = watch.attempts(), "Payment monitor cancelled");
                return MonitorOutcome::Cancelled;
            }
            _ = tokio::time::sleep(deps.poll.poll_interval) => {}
        }

        let event = match deps.verifier.verify(&tx_hash, units).await {
            Ok(verdict) => WatchEvent::from(verdict),
            Err(e) => {
                warn!(%order_id, attempt = watch.attempts() + 1, error = %e, "Receipt query failed");
                WatchEvent::QueryError(e.to_string())
            }
        };

        match watch.step(event).clone() {
            WatchState::AwaitingReceipt => continue,
            WatchState::Confirmed => return confirm(order_id, &deps, &cancel).await,
            WatchState::Failed(reason) => {
                warn!(%order_id, tx = %tx_hash, %reason, "Payment rejected");
                release(order_id, &deps).await;
                return MonitorOutcome::Failed(reason);
            }
            WatchState::TimedOut => {
                warn!(%order_id, tx = %tx_hash, attempts = watch.attempts(), "Payment not final in time");
                release(order_id, &deps).await;
                return MonitorOutcome::TimedOut;
            }
        }
    }
}

async fn confirm(order_id: OrderId, deps: &MonitorDeps, cancel: &CancellationToken) -> MonitorOutcome {
    let view = match retire_with_backoff(order_id, &deps.inventory, cancel).await {
        Ok(view) => view,
        Err(e) => {
            error!(%order_id, error = %e, "Retirement failed after confirmed payment");
            return MonitorOutcome::RetireFailed(e.to_string());
        }
    };

    let Some(wallet) = view.wallet.as_ref() else {
        return MonitorOutcome::Confirmed {
            reward_tx_hash: None,
        };
    };
    let amount = reward_amount(view.count());
    let reward_tx_hash = match deps.rewards.issue(wallet, amount).await {
        Ok(hash) => {
            if let Err(e) = deps.inventory.attach_reward(order_id, hash.clone()).await {
                warn!(%order_id, error = %e, "Could not record reward transaction");
            }
            Some(hash)
        }
        Err(e) => {
            warn!(%order_id, %wallet, amount = %amount, error = %e, "Reward issuance failed, retirement kept");
            None
        }
    };

    info!(%order_id, count = view.count(), rewarded = reward_tx_hash.is_some(), "Order completed");
    MonitorOutcome::Confirmed { reward_tx_hash }
}

/// Retries storage and channel failures with doubling delays. State errors
/// are final.
async fn retire_with_backoff(
    order_id: OrderId,
    inventory: &InventoryClient,
    cancel: &CancellationToken,
) -> Result<OrderView, InventoryError> {
    let mut delay = RETIRE_BACKOFF;
    let mut attempt = 1;
    loop {
        match inventory.retire(order_id).await {
            Ok(view) => return Ok(view),
            Err(e @ (InventoryError::DatabaseError(_) | InventoryError::ActorCommunicationError(_)))
                if attempt < RETIRE_ATTEMPTS =>
            {
                warn!(%order_id, attempt, error = %e, "Retirement failed, retrying");
            }
            Err(e) => return Err(e),
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(InventoryError::ActorCommunicationError(
                    "monitor cancelled before retirement".to_string(),
                ));
            }
            _ = tokio::time::sleep(delay) => {}
        }
        delay *= 2;
        attempt += 1;
    }
}

async fn release(order_id: OrderId, deps: &MonitorDeps) {
    if let Err(e) = deps.inventory.release(order_id).await {
        error!(%order_id, error = %e, "Release failed, sweeper will retry");
    }
}

/// Releases a reservation that never received a payment reference.
///
/// Cancelled when a payment monitor takes over the order.
pub async fn run_reservation_hold(
    order_id: OrderId,
    inventory: InventoryClient,
    budget: Duration,
    cancel: CancellationToken,
) -> MonitorOutcome {
    tokio::select! {
        _ = cancel.cancelled() => MonitorOutcome::Cancelled,
        _ = tokio::time::sleep(budget) => {
            match inventory.release_if_pending(order_id).await {
                Ok(released) => {
                    if released > 0 {
                        info!(%order_id, released, "Unpaid reservation expired");
                    }
                    MonitorOutcome::Released(released)
                }
                Err(e) => {
                    error!(%order_id, error = %e, "Hold release failed, sweeper will retry");
                    MonitorOutcome::Released(0)
                }
            }
        }
    }
}
