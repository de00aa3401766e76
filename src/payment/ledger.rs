//! Access to the external chain ledger.

use crate::model::TxHash;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Execution outcome recorded in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// The ledger's record of a mined transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub to: Option<String>,
    pub from: Option<String>,
    /// Transferred value in wei, when the ledger reports it.
    pub value: Option<u128>,
}

/// Failures talking to the ledger. All of them are treated as transient.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// Read access to transaction receipts.
#[async_trait]
pub trait ChainLedger: Send + Sync {
    /// `Ok(None)` while the transaction is not mined yet.
    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<Receipt>, LedgerError>;
}

/// Parses a `0x` hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u128, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Malformed(format!("quantity without 0x: {raw}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Malformed(format!("bad quantity {raw}: {e}")))
}

/// Ethereum JSON-RPC client (`eth_getTransactionReceipt` + `eth_getTransactionByHash`).
pub struct JsonRpcLedger {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp: Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.get("error") {
            return Err(LedgerError::Rpc {
                code: err["code"].as_i64().unwrap_or_default(),
                message: err["message"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        resp.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed(format!("{method}: no result field")))
    }
}

/// Builds a [`Receipt`] from the JSON-RPC receipt and (optional) transaction objects.
pub fn receipt_from_json(receipt: &Value, transaction: Option<&Value>) -> Result<Receipt, LedgerError> {
    let status = match receipt["status"].as_str() {
        Some("0x1") => ReceiptStatus::Success,
        Some("0x0") => ReceiptStatus::Failure,
        other => {
            return Err(LedgerError::Malformed(format!(
                "unexpected receipt status {other:?}"
            )))
        }
    };
    let address = |v: &Value| v.as_str().map(str::to_ascii_lowercase);
    let value = transaction
        .and_then(|tx| tx["value"].as_str())
        .map(parse_quantity)
        .transpose()?;

    Ok(Receipt {
        status,
        to: address(&receipt["to"]),
        from: address(&receipt["from"]),
        value,
    })
}

#[async_trait]
impl ChainLedger for JsonRpcLedger {
    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let receipt = self
            .call("eth_getTransactionReceipt", json!([tx.as_str()]))
            .await?;
        if receipt.is_null() {
            return Ok(None);
        }
        // A receipt has no value field; the transaction object does
        let transaction = self
            .call("eth_getTransactionByHash", json!([tx.as_str()]))
            .await?;
        let transaction = (!transaction.is_null()).then_some(transaction);
        receipt_from_json(&receipt, transaction.as_ref()).map(Some)
    }
}
