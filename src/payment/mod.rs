//! Payment verification, pricing, and reward issuance.
//!
//! The chain ledger and the reward engine are outside collaborators reached
//! through the [`ChainLedger`] and [`RewardIssuer`] traits.

pub mod ledger;
pub mod price;
pub mod reward;
pub mod verifier;

pub use ledger::{ChainLedger, JsonRpcLedger, LedgerError, Receipt, ReceiptStatus};
pub use price::{FixedPrice, PaymentQuote, PriceSource};
pub use reward::{
    reward_amount, EngineRewardIssuer, EngineSettings, NoopRewardIssuer, RewardError,
    RewardIssuer, TOKEN_UNIT,
};
pub use verifier::{AmountPolicy, PaymentVerifier, Verdict};
