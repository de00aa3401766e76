use super::allowance::SerialNumber;
use super::identifiers::{OrderId, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retired allowance as shown in the public history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementRecord {
    pub serial_number: SerialNumber,
    pub order_id: OrderId,
    pub wallet: WalletAddress,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: Option<TxHash>,
    pub reward_tx_hash: Option<String>,
}

/// Unit counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub available: u64,
    pub reserved: u64,
    pub retired: u64,
}

impl StockLevels {
    pub fn total(&self) -> u64 {
        self.available + self.reserved + self.retired
    }
}
