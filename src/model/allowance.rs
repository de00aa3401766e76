//! Allowance units, the inventory the desk sells and retires.

use super::identifiers::{OrderId, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Width of the zero-padded storage key, enough for `u64::MAX`. Padding keeps
/// lexical order equal to numeric order, which the claim path relies on to pick
/// ascending serials.
const SERIAL_KEY_WIDTH: usize = 20;

/// Externally meaningful serial number of one allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNumber(pub u64);

impl SerialNumber {
    /// Sortable storage key.
    pub fn key(&self) -> String {
        format!("{:0width$}", self.0, width = SERIAL_KEY_WIDTH)
    }

    pub fn from_key(key: &str) -> Result<Self, SerialRangeError> {
        key.parse()
    }
}

impl Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SerialNumber {
    type Err = SerialRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| SerialRangeError::BadSerial(s.to_string()))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SerialRangeError {
    #[error("not a serial number: {0:?}")]
    BadSerial(String),

    #[error("range {start} - {end} is reversed")]
    Reversed { start: u64, end: u64 },
}

/// Parses provisioning input such as `"1000 - 1099, 2000 - 2009, 3000"`.
///
/// Ranges are inclusive. A bare number is a range of one.
pub fn parse_serial_ranges(input: &str) -> Result<Vec<SerialNumber>, SerialRangeError> {
    let mut serials = Vec::new();
    for part in input.split([',', ';', '\n']).map(str::trim) {
        if part.is_empty() {
            continue;
        }
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (start.parse::<SerialNumber>()?, end.parse::<SerialNumber>()?),
            None => {
                let single = part.parse::<SerialNumber>()?;
                (single, single)
            }
        };
        if start > end {
            return Err(SerialRangeError::Reversed {
                start: start.0,
                end: end.0,
            });
        }
        serials.extend((start.0..=end.0).map(SerialNumber));
    }
    serials.sort_unstable();
    serials.dedup();
    Ok(serials)
}

/// Lifecycle status of an allowance unit. `Retired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowanceStatus {
    Available,
    Reserved,
    Retired,
}

impl Display for AllowanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AllowanceStatus::Available => "available",
            AllowanceStatus::Reserved => "reserved",
            AllowanceStatus::Retired => "retired",
        };
        f.write_str(s)
    }
}

/// The order-association fields. Present exactly when a unit is not available.
///
/// Every unit of one order carries an identical claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderClaim {
    pub order_id: OrderId,
    pub wallet: WalletAddress,
    pub message: String,
    pub claimed_at: DateTime<Utc>,
    pub tx_hash: Option<TxHash>,
    pub reward_tx_hash: Option<String>,
}

/// One allowance as persisted in the inventory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceUnit {
    pub serial: SerialNumber,
    pub status: AllowanceStatus,
    pub claim: Option<OrderClaim>,
}

impl AllowanceUnit {
    /// A freshly provisioned unit.
    pub fn available(serial: SerialNumber) -> Self {
        Self {
            serial,
            status: AllowanceStatus::Available,
            claim: None,
        }
    }

    /// `claim` is `None` iff the unit is available.
    pub fn is_consistent(&self) -> bool {
        (self.status == AllowanceStatus::Available) == self.claim.is_none()
    }
}
