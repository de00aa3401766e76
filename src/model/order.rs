//! The order ledger: an order's state is computed from its units, never stored.

use super::allowance::{AllowanceStatus, AllowanceUnit, SerialNumber};
use super::identifiers::{OrderId, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Derived status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Reserved, no payment reference yet.
    Pending,
    /// Reserved with a payment reference; the payment monitor is deciding.
    PaidButNotRetired,
    /// Every unit retired.
    Completed,
    /// Units disagree with each other. Requires manual reconciliation.
    Error,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaidButNotRetired => "paid_but_not_retired",
            OrderStatus::Completed => "completed",
            OrderStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A read-only projection of all units sharing one order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub serials: Vec<SerialNumber>,
    pub wallet: Option<WalletAddress>,
    pub message: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub tx_hash: Option<TxHash>,
    pub reward_tx_hash: Option<String>,
}

impl OrderView {
    /// Projects the order's units into a view.
    ///
    /// Returns `None` when no unit carries the order id, i.e. the order never
    /// existed or was released.
    ///
    /// - all units retired → `Completed`
    /// - all reserved, all with the same payment reference → `PaidButNotRetired`
    /// - all reserved, none with a payment reference → `Pending`
    /// - anything else (mixed statuses, differing claims, a unit without a claim
    ///   or claimed by another order) → `Error`
    pub fn project(order_id: OrderId, units: &[AllowanceUnit]) -> Option<Self> {
        let first = units.first()?;
        let first_claim = first.claim.as_ref();

        let mut serials: Vec<SerialNumber> = units.iter().map(|u| u.serial).collect();
        serials.sort_unstable();

        let uniform = units.iter().all(|u| {
            u.status == first.status
                && u.claim.as_ref().is_some_and(|c| {
                    c.order_id == order_id
                        && first_claim.is_some_and(|f| {
                            c.wallet == f.wallet
                                && c.message == f.message
                                && c.claimed_at == f.claimed_at
                                && c.tx_hash == f.tx_hash
                        })
                })
        });

        let status = match (uniform, first.status, first_claim.and_then(|c| c.tx_hash.as_ref())) {
            (false, _, _) => OrderStatus::Error,
            (true, AllowanceStatus::Retired, _) => OrderStatus::Completed,
            (true, AllowanceStatus::Reserved, Some(_)) => OrderStatus::PaidButNotRetired,
            (true, AllowanceStatus::Reserved, None) => OrderStatus::Pending,
            (true, AllowanceStatus::Available, _) => OrderStatus::Error,
        };

        Some(Self {
            order_id,
            status,
            serials,
            wallet: first_claim.map(|c| c.wallet.clone()),
            message: first_claim.map(|c| c.message.clone()),
            claimed_at: first_claim.map(|c| c.claimed_at),
            tx_hash: first_claim.and_then(|c| c.tx_hash.clone()),
            reward_tx_hash: first_claim.and_then(|c| c.reward_tx_hash.clone()),
        })
    }

    pub fn count(&self) -> usize {
        self.serials.len()
    }
}
