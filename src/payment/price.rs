//! Expected payment amounts.
//!
//! The exchange rate comes from outside; this module only turns a rate into an
//! accepted wei band.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const WEI_PER_ETH: i64 = 1_000_000_000_000_000_000;

/// Read-only ETH/USD rate. Refreshing it is the caller's business.
pub trait PriceSource: Send + Sync {
    fn eth_usd(&self) -> Option<Decimal>;
}

/// A rate fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub Decimal);

impl PriceSource for FixedPrice {
    fn eth_usd(&self) -> Option<Decimal> {
        Some(self.0).filter(|rate| rate.is_sign_positive() && !rate.is_zero())
    }
}

/// Accepted payment range for an order, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentQuote {
    pub expected_wei: u128,
    pub min_wei: u128,
    pub max_wei: u128,
}

impl PaymentQuote {
    pub fn accepts(&self, paid_wei: u128) -> bool {
        (self.min_wei..=self.max_wei).contains(&paid_wei)
    }
}

/// `count × price_usd ÷ eth_usd` ETH, widened by `tolerance` on both sides.
pub fn quote(
    count: usize,
    price_usd: Decimal,
    eth_usd: Decimal,
    tolerance: Decimal,
) -> Option<PaymentQuote> {
    if eth_usd <= Decimal::ZERO {
        return None;
    }
    let wei_per_eth = Decimal::from(WEI_PER_ETH);
    let eth = Decimal::from(count as u64).checked_mul(price_usd)?.checked_div(eth_usd)?;
    let expected = eth.checked_mul(wei_per_eth)?;
    let min = expected.checked_mul(Decimal::ONE - tolerance)?;
    let max = expected.checked_mul(Decimal::ONE + tolerance)?;

    Some(PaymentQuote {
        expected_wei: expected.floor().to_u128()?,
        min_wei: min.floor().max(Decimal::ZERO).to_u128()?,
        max_wei: max.ceil().to_u128()?,
    })
}
