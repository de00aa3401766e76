use crate::clients::{InventoryClient, MonitorClient};
use crate::config::Config;
use crate::history::HistoryReader;
use crate::inventory::{self, InventoryError, InventoryStorage, StorageError};
use crate::model::{parse_serial_ranges, SerialRangeError, WalletAddress};
use crate::monitor::{self, recover_in_flight, MonitorDeps, PollSettings, Sweeper};
use crate::payment::{
    AmountPolicy, ChainLedger, EngineRewardIssuer, EngineSettings, FixedPrice, JsonRpcLedger,
    LedgerError, NoopRewardIssuer, PaymentVerifier, PriceSource, RewardError, RewardIssuer,
};
use crate::reservation::ReservationService;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Reward(#[from] RewardError),

    #[error(transparent)]
    Serials(#[from] SerialRangeError),

    #[error("task failed: {0}")]
    Task(String),
}

/// Outside systems the desk talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn ChainLedger>,
    pub rewards: Arc<dyn RewardIssuer>,
    pub price: Arc<dyn PriceSource>,
}

impl Collaborators {
    /// Real collaborators built from configuration. Without a reward engine URL
    /// rewards are disabled.
    pub fn from_config(config: &Config) -> Result<Self, SystemError> {
        let ledger = JsonRpcLedger::new(config.rpc_url.clone(), config.request_timeout)?;
        let rewards: Arc<dyn RewardIssuer> = match &config.reward_engine_url {
            Some(base_url) => Arc::new(EngineRewardIssuer::new(
                EngineSettings {
                    base_url: base_url.clone(),
                    secret: config.reward_engine_secret.clone(),
                    chain_id: config.reward_chain_id,
                    token_address: config.reward_token_address.clone(),
                },
                config.request_timeout,
            )?),
            None => {
                info!("No reward engine configured, rewards disabled");
                Arc::new(NoopRewardIssuer)
            }
        };
        Ok(Self {
            ledger: Arc::new(ledger),
            rewards,
            price: Arc::new(FixedPrice(config.eth_usd_rate)),
        })
    }
}

/// The running desk: inventory actor, monitor registry, sweeper, and the
/// services built on their clients.
///
/// Actors stop once every client is dropped, so [`shutdown`](Self::shutdown)
/// must only be called after other holders of these clients (the HTTP router)
/// are gone.
pub struct RetirementSystem {
    pub inventory: InventoryClient,
    pub monitors: MonitorClient,
    pub reservations: ReservationService,
    pub history: HistoryReader,
    shutdown: CancellationToken,
    sweeper: JoinHandle<()>,
    actors: Vec<JoinHandle<()>>,
}

impl RetirementSystem {
    pub async fn start(
        config: &Config,
        storage: InventoryStorage,
        collaborators: Collaborators,
    ) -> Result<Self, SystemError> {
        let treasury = WalletAddress::parse(&config.treasury_address)
            .map_err(|e| SystemError::Config(e.to_string()))?;

        let mut verifier = PaymentVerifier::new(collaborators.ledger, treasury);
        if config.enforce_payment_amount {
            verifier = verifier.with_amount_policy(AmountPolicy {
                price: collaborators.price,
                allowance_price_usd: config.allowance_price_usd,
                tolerance: config.price_slippage_tolerance,
            });
        }

        // 1. Inventory has no dependencies
        let (inventory_actor, inventory) = inventory::new(storage);
        let inventory_handle = tokio::spawn(inventory_actor.run(()));

        if let Some(ranges) = &config.seed_serial_ranges {
            let serials = parse_serial_ranges(ranges)?;
            inventory.provision(serials).await?;
        }

        // 2. Monitors need inventory, the verifier and the reward issuer
        let (monitor_actor, monitors) = monitor::new();
        let deps = MonitorDeps {
            inventory: inventory.clone(),
            verifier,
            rewards: collaborators.rewards,
            poll: PollSettings {
                poll_interval: config.poll_interval,
                max_attempts: config.max_poll_attempts,
            },
        };
        let monitor_handle = tokio::spawn(monitor_actor.run(deps));

        recover_in_flight(&inventory, &monitors).await?;

        // 3. Sweeper
        let shutdown = CancellationToken::new();
        let sweeper = Sweeper::new(
            inventory.clone(),
            monitors.clone(),
            config.reservation_timeout,
            config.sweep_interval,
            shutdown.clone(),
        );
        let sweeper = tokio::spawn(sweeper.run());

        let stock = inventory.stock().await?;
        info!(
            available = stock.available,
            reserved = stock.reserved,
            retired = stock.retired,
            "Retirement system started"
        );

        Ok(Self {
            reservations: ReservationService::new(inventory.clone(), monitors.clone()),
            history: HistoryReader::new(inventory.clone()),
            inventory,
            monitors,
            shutdown,
            sweeper,
            actors: vec![monitor_handle, inventory_handle],
        })
    }

    /// Stops the sweeper, then the monitors (cancelling running monitors),
    /// then the inventory actor.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down retirement system...");

        self.shutdown.cancel();
        if let Err(e) = self.sweeper.await {
            error!(error = %e, "Sweeper task failed");
        }

        drop(self.reservations);
        drop(self.history);
        drop(self.monitors);
        drop(self.inventory);

        // Monitor registry first: it holds an inventory client in its context
        for handle in self.actors {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(SystemError::Task(e.to_string()));
            }
        }

        info!("Retirement system shutdown complete.");
        Ok(())
    }
}
