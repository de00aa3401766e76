//! Shared fixtures: a scripted chain ledger, a recording reward issuer, and a
//! system builder over an in-memory inventory.

#![allow(dead_code)]

use allowance_desk::config::Config;
use allowance_desk::inventory::InventoryStorage;
use allowance_desk::lifecycle::{Collaborators, RetirementSystem};
use allowance_desk::model::{OrderId, OrderStatus, TxHash, WalletAddress};
use allowance_desk::payment::{
    ChainLedger, FixedPrice, LedgerError, Receipt, ReceiptStatus, RewardError, RewardIssuer,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WALLET: &str = "0x1111111111111111111111111111111111111111";

pub fn treasury() -> String {
    Config::for_tests().treasury_address
}

pub fn tx(n: u8) -> TxHash {
    TxHash::parse(&format!("0x{}", format!("{n:02x}").repeat(32))).unwrap()
}

pub fn paid_to_treasury() -> Receipt {
    Receipt {
        status: ReceiptStatus::Success,
        to: Some(treasury()),
        from: Some(WALLET.to_string()),
        value: Some(0),
    }
}

pub fn reverted() -> Receipt {
    Receipt {
        status: ReceiptStatus::Failure,
        ..paid_to_treasury()
    }
}

/// What one `transaction_receipt` call returns.
#[derive(Debug, Clone)]
pub enum Poll {
    Pending,
    Mined(Receipt),
    Unreachable,
}

/// Ledger answering from a per-transaction script. Once a script runs out its
/// last entry repeats; unknown transactions stay pending.
#[derive(Default)]
pub struct ScriptedLedger {
    scripts: Mutex<HashMap<TxHash, VecDeque<Poll>>>,
    calls: Mutex<HashMap<TxHash, usize>>,
}

impl ScriptedLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, tx: &TxHash, polls: Vec<Poll>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(tx.clone(), polls.into_iter().collect());
    }

    pub fn calls(&self, tx: &TxHash) -> usize {
        self.calls.lock().unwrap().get(tx).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ChainLedger for ScriptedLedger {
    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        *self.calls.lock().unwrap().entry(tx.clone()).or_default() += 1;
        let poll = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(tx) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };
        match poll.unwrap_or(Poll::Pending) {
            Poll::Pending => Ok(None),
            Poll::Mined(receipt) => Ok(Some(receipt)),
            Poll::Unreachable => Err(LedgerError::Malformed("connection reset".to_string())),
        }
    }
}

/// Reward issuer that records every issue call.
#[derive(Default)]
pub struct RecordingIssuer {
    pub issued: Mutex<Vec<(WalletAddress, u128)>>,
    pub fail: bool,
}

impl RecordingIssuer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl RewardIssuer for RecordingIssuer {
    async fn issue(&self, wallet: &WalletAddress, amount: u128) -> Result<String, RewardError> {
        if self.fail {
            return Err(RewardError::Rejected {
                status: 503,
                body: "engine down".to_string(),
            });
        }
        let mut issued = self.issued.lock().unwrap();
        issued.push((wallet.clone(), amount));
        Ok(format!("0xreward{}", issued.len()))
    }
}

pub fn config(units: u64) -> Config {
    let mut config = Config::for_tests();
    config.seed_serial_ranges = Some(format!("1 - {units}"));
    config
}

pub fn collaborators(ledger: Arc<ScriptedLedger>, rewards: Arc<RecordingIssuer>) -> Collaborators {
    Collaborators {
        ledger,
        rewards,
        price: Arc::new(FixedPrice(Decimal::from(2000))),
    }
}

pub async fn start_with(
    config: &Config,
    storage: InventoryStorage,
    ledger: Arc<ScriptedLedger>,
    rewards: Arc<RecordingIssuer>,
) -> RetirementSystem {
    RetirementSystem::start(config, storage, collaborators(ledger, rewards))
        .await
        .expect("system starts")
}

pub async fn start(
    units: u64,
    ledger: Arc<ScriptedLedger>,
    rewards: Arc<RecordingIssuer>,
) -> RetirementSystem {
    let storage = InventoryStorage::open_in_memory().unwrap();
    start_with(&config(units), storage, ledger, rewards).await
}

/// Polls the order until `done` holds for its status (`None` = released).
/// Under paused time each wait auto-advances the clock.
pub async fn wait_for_order<F>(system: &RetirementSystem, order_id: OrderId, done: F)
where
    F: Fn(Option<OrderStatus>) -> bool,
{
    for _ in 0..2_000 {
        let status = system
            .inventory
            .order_view(order_id)
            .await
            .unwrap()
            .map(|view| view.status);
        if done(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("order {order_id} never reached the expected state");
}
