//! One monitor per order.
//!
//! The registry is an actor, so "is anything already watching this order?" and
//! "start watching it" happen inside one request and cannot interleave with a
//! second start for the same order.

use super::task::{run_payment_monitor, run_reservation_hold, MonitorDeps};
use crate::model::{OrderId, TxHash};
use actor_framework::ActorHandler;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which kind of task watches an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// Reserved, waiting for a payment reference.
    Hold,
    /// Payment reference recorded, polling the ledger.
    Payment,
}

#[derive(Debug, Clone)]
pub enum MonitorAction {
    StartHold(OrderId),
    StartPayment {
        order_id: OrderId,
        tx_hash: TxHash,
        units: usize,
    },
    Cancel(OrderId),
    Active(OrderId),
    ActiveCount,
}

/// Results from MonitorActions - variants match 1:1 with MonitorAction
#[derive(Debug, Clone)]
pub enum MonitorActionResult {
    StartHold(()),
    StartPayment(()),
    Cancel(bool),
    Active(Option<MonitorKind>),
    ActiveCount(usize),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    #[error("order {0} is already being monitored")]
    AlreadyMonitored(OrderId),

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for MonitorError {
    fn from(msg: String) -> Self {
        MonitorError::ActorCommunicationError(msg)
    }
}

struct Tracked {
    kind: MonitorKind,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct MonitorRegistry {
    tasks: HashMap<OrderId, Tracked>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self) {
        self.tasks.retain(|_, tracked| !tracked.handle.is_finished());
    }

    fn start_hold(&mut self, order_id: OrderId, deps: &MonitorDeps) -> Result<(), MonitorError> {
        if self.tasks.contains_key(&order_id) {
            return Err(MonitorError::AlreadyMonitored(order_id));
        }
        let cancel = CancellationToken::new();
        let task = run_reservation_hold(
            order_id,
            deps.inventory.clone(),
            deps.poll.budget(),
            cancel.clone(),
        );
        let handle = tokio::spawn(async move {
            let outcome = task.await;
            debug!(%order_id, ?outcome, "Hold finished");
        });
        self.tasks.insert(
            order_id,
            Tracked {
                kind: MonitorKind::Hold,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    fn start_payment(
        &mut self,
        order_id: OrderId,
        tx_hash: TxHash,
        units: usize,
        deps: &MonitorDeps,
    ) -> Result<(), MonitorError> {
        match self.tasks.get(&order_id).map(|t| t.kind) {
            Some(MonitorKind::Payment) => return Err(MonitorError::AlreadyMonitored(order_id)),
            Some(MonitorKind::Hold) => {
                if let Some(hold) = self.tasks.remove(&order_id) {
                    hold.cancel.cancel();
                }
            }
            None => {}
        }

        let cancel = CancellationToken::new();
        let task = run_payment_monitor(order_id, tx_hash, units, deps.clone(), cancel.clone());
        let handle = tokio::spawn(async move {
            let outcome = task.await;
            info!(%order_id, ?outcome, "Payment monitor finished");
        });
        self.tasks.insert(
            order_id,
            Tracked {
                kind: MonitorKind::Payment,
                cancel,
                handle,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ActorHandler for MonitorRegistry {
    type Request = MonitorAction;
    type Reply = MonitorActionResult;
    type Context = MonitorDeps;
    type Error = MonitorError;

    async fn handle(
        &mut self,
        action: MonitorAction,
        deps: &MonitorDeps,
    ) -> Result<MonitorActionResult, MonitorError> {
        self.prune();
        let result = match action {
            MonitorAction::StartHold(order_id) => {
                MonitorActionResult::StartHold(self.start_hold(order_id, deps)?)
            }
            MonitorAction::StartPayment {
                order_id,
                tx_hash,
                units,
            } => MonitorActionResult::StartPayment(self.start_payment(
                order_id, tx_hash, units, deps,
            )?),
            MonitorAction::Cancel(order_id) => {
                let cancelled = match self.tasks.remove(&order_id) {
                    Some(tracked) => {
                        tracked.cancel.cancel();
                        true
                    }
                    None => false,
                };
                MonitorActionResult::Cancel(cancelled)
            }
            MonitorAction::Active(order_id) => {
                MonitorActionResult::Active(self.tasks.get(&order_id).map(|t| t.kind))
            }
            MonitorAction::ActiveCount => MonitorActionResult::ActiveCount(self.tasks.len()),
        };
        Ok(result)
    }

    async fn on_stop(&mut self, _deps: &MonitorDeps) {
        let running = self.tasks.len();
        for tracked in self.tasks.values() {
            tracked.cancel.cancel();
        }
        for (order_id, tracked) in self.tasks.drain() {
            if let Err(e) = tracked.handle.await {
                warn!(%order_id, error = %e, "Monitor task panicked");
            }
        }
        info!(running, "Monitors stopped");
    }
}
