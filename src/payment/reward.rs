//! Reward token issuance.
//!
//! Rewards are a bonus on top of a retirement: an issuer failure is reported to
//! the caller, which logs it and keeps the retirement.

use crate::model::WalletAddress;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Smallest units per whole reward token (18 decimals).
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("reward transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("reward engine rejected transfer ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("reward engine response has no transaction hash: {0}")]
    MissingHash(String),

    #[error("reward issuance is not configured")]
    NotConfigured,
}

/// Volume bonus in basis points: +5% from 20 allowances, +10% from 50.
pub fn bonus_bps(count: usize) -> u128 {
    match count {
        50.. => 11_000,
        20.. => 10_500,
        _ => 10_000,
    }
}

/// Reward for retiring `count` allowances, in smallest token units.
pub fn reward_amount(count: usize) -> u128 {
    count as u128 * TOKEN_UNIT * bonus_bps(count) / 10_000
}

/// Transfers reward tokens to a wallet.
#[async_trait]
pub trait RewardIssuer: Send + Sync {
    /// Returns the transfer's transaction hash.
    async fn issue(&self, wallet: &WalletAddress, amount: u128) -> Result<String, RewardError>;
}

/// Issuer used when no engine is configured. Every call fails with
/// [`RewardError::NotConfigured`].
pub struct NoopRewardIssuer;

#[async_trait]
impl RewardIssuer for NoopRewardIssuer {
    async fn issue(&self, _wallet: &WalletAddress, _amount: u128) -> Result<String, RewardError> {
        Err(RewardError::NotConfigured)
    }
}

/// Settings for [`EngineRewardIssuer`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_url: String,
    pub secret: String,
    pub chain_id: u64,
    pub token_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferBody<'a> {
    to_address: &'a str,
    amount: String,
}

/// Issues ERC-20 rewards through a hosted transaction engine.
pub struct EngineRewardIssuer {
    client: reqwest::Client,
    settings: EngineSettings,
}

impl EngineRewardIssuer {
    pub fn new(settings: EngineSettings, timeout: Duration) -> Result<Self, RewardError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    fn transfer_url(&self) -> String {
        format!(
            "{}/contract/{}/{}/erc20/transfer",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.chain_id,
            self.settings.token_address
        )
    }
}

/// Pulls `result.transactionHash` out of an engine response.
pub fn transfer_hash(resp: &Value) -> Result<String, RewardError> {
    resp["result"]["transactionHash"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| RewardError::MissingHash(resp.to_string()))
}

#[async_trait]
impl RewardIssuer for EngineRewardIssuer {
    async fn issue(&self, wallet: &WalletAddress, amount: u128) -> Result<String, RewardError> {
        let body = TransferBody {
            to_address: wallet.as_str(),
            amount: amount.to_string(),
        };
        let resp = self
            .client
            .post(self.transfer_url())
            .bearer_auth(&self.settings.secret)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RewardError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let json: Value = resp.json().await?;
        transfer_hash(&json)
    }
}
