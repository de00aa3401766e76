//! Requests understood by the inventory ledger actor.
//!
//! Each [`InventoryAction`] variant answers with the [`InventoryActionResult`]
//! variant of the same name.

use crate::model::{
    OrderId, OrderView, RetirementRecord, SerialNumber, StockLevels, TxHash, WalletAddress,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum InventoryAction {
    /// Adds units that do not exist yet.
    Provision(Vec<SerialNumber>),
    /// Atomically reserves `count` units for a new order.
    Claim {
        order_id: OrderId,
        count: u32,
        wallet: WalletAddress,
        message: String,
    },
    /// Records the payment reference of a pending order.
    StampPayment { order_id: OrderId, tx_hash: TxHash },
    /// Retires a paid order.
    Retire(OrderId),
    /// Records the reward transfer of a completed order.
    AttachReward {
        order_id: OrderId,
        reward_tx_hash: String,
    },
    /// Returns reserved units to the pool.
    Release(OrderId),
    /// Returns reserved units to the pool only if no payment was recorded.
    ReleaseIfPending(OrderId),
    OrderView(OrderId),
    ListRetired(usize),
    Stock,
    InFlight,
    Expired {
        pending_before: DateTime<Utc>,
        paid_before: DateTime<Utc>,
    },
}

/// Results from InventoryActions - variants match 1:1 with InventoryAction
#[derive(Debug, Clone)]
pub enum InventoryActionResult {
    Provision(usize),
    Claim(Vec<SerialNumber>),
    StampPayment(OrderView),
    Retire(OrderView),
    AttachReward(()),
    Release(usize),
    ReleaseIfPending(usize),
    OrderView(Option<OrderView>),
    ListRetired(Vec<RetirementRecord>),
    Stock(StockLevels),
    InFlight(Vec<OrderView>),
    Expired(Vec<OrderView>),
}
