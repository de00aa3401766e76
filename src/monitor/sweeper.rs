//! Periodic cleanup of reservations nothing is watching any more, plus
//! start-up recovery of in-flight orders.

use super::registry::MonitorKind;
use crate::clients::{InventoryClient, MonitorClient};
use crate::inventory::InventoryError;
use crate::model::OrderStatus;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Sweeper {
    inventory: InventoryClient,
    monitors: MonitorClient,
    reservation_timeout: chrono::Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Sweeper {
    pub fn new(
        inventory: InventoryClient,
        monitors: MonitorClient,
        reservation_timeout: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inventory,
            monitors,
            reservation_timeout: chrono::Duration::from_std(reservation_timeout)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
            interval,
            shutdown,
        }
    }

    /// Main loop: sweep every `interval` until shutdown.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.sweep_once().await {
                        Ok(summary) if summary != SweepSummary::default() => {
                            info!(released = summary.released, rearmed = summary.rearmed, "Sweep finished");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Sweep failed"),
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Sweeper received shutdown signal");
                    return;
                }
            }
        }
    }

    /// Releases pending orders older than the reservation timeout. Paid orders
    /// older than twice that get a fresh payment monitor, which re-verifies the
    /// payment and then retires or releases them. Orders a payment monitor
    /// still owns are skipped.
    pub async fn sweep_once(&self) -> Result<SweepSummary, InventoryError> {
        let now = Utc::now();
        let pending_before = now - self.reservation_timeout;
        let paid_before = now - self.reservation_timeout * 2;
        let expired = self.inventory.expired(pending_before, paid_before).await?;

        let mut summary = SweepSummary::default();
        for view in expired {
            let order_id = view.order_id;
            match self.monitors.active(order_id).await {
                Ok(Some(MonitorKind::Payment)) => {
                    debug!(%order_id, "Still being monitored, skipping");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%order_id, error = %e, "Monitor registry unavailable, skipping");
                    continue;
                }
            }

            match (view.status, view.tx_hash.clone()) {
                (OrderStatus::Pending, _) => {
                    let released = self.inventory.release_if_pending(order_id).await?;
                    if released > 0 {
                        summary.released += 1;
                        if let Err(e) = self.monitors.cancel(order_id).await {
                            debug!(%order_id, error = %e, "Could not cancel hold");
                        }
                        info!(%order_id, released, "Swept stale reservation");
                    }
                }
                (OrderStatus::PaidButNotRetired, Some(tx_hash)) => {
                    match self.monitors.start_payment(order_id, tx_hash, view.count()).await {
                        Ok(()) => {
                            summary.rearmed += 1;
                            info!(%order_id, "Re-armed payment monitor for stale paid order");
                        }
                        Err(e) => warn!(%order_id, error = %e, "Could not re-arm payment monitor"),
                    }
                }
                (status, _) => {
                    error!(%order_id, %status, "Stale order in unexpected state, needs reconciliation");
                }
            }
        }
        Ok(summary)
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Pending orders whose units went back to stock.
    pub released: usize,
    /// Paid orders handed to a new payment monitor.
    pub rearmed: usize,
}

/// Re-arms monitors for orders that were in flight when the process stopped.
///
/// Returns how many monitors were started.
pub async fn recover_in_flight(
    inventory: &InventoryClient,
    monitors: &MonitorClient,
) -> Result<usize, InventoryError> {
    let mut started = 0;
    for view in inventory.in_flight().await? {
        let order_id = view.order_id;
        let result = match (view.status, view.tx_hash.clone()) {
            (OrderStatus::Pending, _) => monitors.start_hold(order_id).await,
            (OrderStatus::PaidButNotRetired, Some(tx_hash)) => {
                monitors.start_payment(order_id, tx_hash, view.count()).await
            }
            (status, _) => {
                error!(%order_id, %status, "In-flight order in unexpected state, needs reconciliation");
                continue;
            }
        };
        match result {
            Ok(()) => started += 1,
            Err(e) => warn!(%order_id, error = %e, "Could not re-arm monitor"),
        }
    }
    if started > 0 {
        info!(started, "Recovered in-flight orders");
    }
    Ok(started)
}
