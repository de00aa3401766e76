//! Payment acceptance rules.

use super::ledger::{ChainLedger, LedgerError, ReceiptStatus};
use super::price::{quote, PriceSource};
use crate::model::{TxHash, WalletAddress};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Outcome of checking one payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Mined, succeeded, paid the treasury (and the right amount, if enforced).
    Valid,
    /// Mined but not an acceptable payment.
    Invalid(String),
    /// No receipt yet.
    NotYetFinal,
}

/// Amount enforcement settings. Off unless configured.
#[derive(Clone)]
pub struct AmountPolicy {
    pub price: Arc<dyn PriceSource>,
    pub allowance_price_usd: Decimal,
    pub tolerance: Decimal,
}

#[derive(Clone)]
pub struct PaymentVerifier {
    ledger: Arc<dyn ChainLedger>,
    treasury: WalletAddress,
    amount_policy: Option<AmountPolicy>,
}

impl PaymentVerifier {
    pub fn new(ledger: Arc<dyn ChainLedger>, treasury: WalletAddress) -> Self {
        Self {
            ledger,
            treasury,
            amount_policy: None,
        }
    }

    pub fn with_amount_policy(mut self, policy: AmountPolicy) -> Self {
        self.amount_policy = Some(policy);
        self
    }

    /// Checks `tx` as payment for `units` allowances.
    ///
    /// Ledger failures are returned as errors, never as `Invalid`; whether to
    /// retry is the caller's decision.
    pub async fn verify(&self, tx: &TxHash, units: usize) -> Result<Verdict, LedgerError> {
        let Some(receipt) = self.ledger.transaction_receipt(tx).await? else {
            return Ok(Verdict::NotYetFinal);
        };

        if receipt.status == ReceiptStatus::Failure {
            return Ok(Verdict::Invalid("transaction reverted".to_string()));
        }

        let to_treasury = receipt
            .to
            .as_deref()
            .is_some_and(|to| to.eq_ignore_ascii_case(self.treasury.as_str()));
        if !to_treasury {
            return Ok(Verdict::Invalid(format!(
                "paid {} instead of the treasury",
                receipt.to.as_deref().unwrap_or("nobody")
            )));
        }

        if let Some(policy) = &self.amount_policy {
            let Some(rate) = policy.price.eth_usd() else {
                return Err(LedgerError::Malformed("no exchange rate available".to_string()));
            };
            let Some(band) = quote(units, policy.allowance_price_usd, rate, policy.tolerance)
            else {
                return Err(LedgerError::Malformed(format!("cannot quote {units} units at {rate}")));
            };
            let paid = receipt.value.unwrap_or(0);
            debug!(%tx, paid, min = band.min_wei, max = band.max_wei, "Checking amount");
            if !band.accepts(paid) {
                return Ok(Verdict::Invalid(format!(
                    "paid {paid} wei, expected {}..={} wei",
                    band.min_wei, band.max_wei
                )));
            }
        }

        Ok(Verdict::Valid)
    }
}
