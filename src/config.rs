use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_PATH | allowances.redb | inventory database file |
/// | HTTP_PORT | 8000 | HTTP listen port |
/// | RPC_URL | http://localhost:8545 | JSON-RPC endpoint of the payment chain |
/// | TREASURY_ADDRESS | 0x742d…2b | account that must receive payments |
/// | POLL_INTERVAL_SECS | 5 | delay between receipt polls |
/// | MAX_POLL_ATTEMPTS | 60 | polls before a payment times out |
/// | RESERVATION_TIMEOUT_MINUTES | 15 | age at which the sweeper frees pending orders |
/// | SWEEP_INTERVAL_MINUTES | 20 | sweeper period |
/// | ALLOWANCE_PRICE_USD | 24 | price of one allowance |
/// | ETH_USD_RATE | 2000 | fixed exchange rate used for quotes |
/// | ENFORCE_PAYMENT_AMOUNT | false | reject underpaying transactions |
/// | PRICE_SLIPPAGE_TOLERANCE | 0.05 | accepted deviation from the quote |
/// | REWARD_ENGINE_URL | unset | reward engine base URL, rewards disabled when unset |
/// | REWARD_ENGINE_SECRET | empty | bearer token for the reward engine |
/// | REWARD_TOKEN_ADDRESS | empty | reward token contract |
/// | REWARD_CHAIN_ID | 11155111 | chain of the reward token |
/// | SEED_SERIAL_RANGES | unset | serials to provision at start, e.g. `1000 - 1099` |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    pub rpc_url: String,
    pub treasury_address: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub reservation_timeout: Duration,
    pub sweep_interval: Duration,
    pub allowance_price_usd: Decimal,
    pub eth_usd_rate: Decimal,
    pub enforce_payment_amount: bool,
    pub price_slippage_tolerance: Decimal,
    pub reward_engine_url: Option<String>,
    pub reward_engine_secret: String,
    pub reward_token_address: String,
    pub reward_chain_id: u64,
    pub seed_serial_ranges: Option<String>,
    /// Timeout of outbound HTTP calls (ledger, reward engine).
    pub request_timeout: Duration,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from the environment. Unset or unparsable values
    /// fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            database_path: env_or("DATABASE_PATH", "allowances.redb".to_string()),
            http_port: env_or("HTTP_PORT", 8000),
            rpc_url: env_or("RPC_URL", "http://localhost:8545".to_string()),
            treasury_address: env_or(
                "TREASURY_ADDRESS",
                "0x742d35cc6634c0532925a3b8d11d2d7d2ae30b2b".to_string(),
            ),
            poll_interval: Duration::from_secs(env_or("POLL_INTERVAL_SECS", 5)),
            max_poll_attempts: env_or("MAX_POLL_ATTEMPTS", 60),
            reservation_timeout: Duration::from_secs(60 * env_or("RESERVATION_TIMEOUT_MINUTES", 15)),
            sweep_interval: Duration::from_secs(60 * env_or("SWEEP_INTERVAL_MINUTES", 20)),
            allowance_price_usd: env_or("ALLOWANCE_PRICE_USD", Decimal::from(24)),
            eth_usd_rate: env_or("ETH_USD_RATE", Decimal::from(2000)),
            enforce_payment_amount: env_or("ENFORCE_PAYMENT_AMOUNT", false),
            price_slippage_tolerance: env_or("PRICE_SLIPPAGE_TOLERANCE", Decimal::new(5, 2)),
            reward_engine_url: env_opt("REWARD_ENGINE_URL"),
            reward_engine_secret: env_or("REWARD_ENGINE_SECRET", String::new()),
            reward_token_address: env_or("REWARD_TOKEN_ADDRESS", String::new()),
            reward_chain_id: env_or("REWARD_CHAIN_ID", 11_155_111),
            seed_serial_ranges: env_opt("SEED_SERIAL_RANGES"),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 10)),
        }
    }

    /// In-process defaults for tests: in-memory friendly, short intervals,
    /// and no reward engine. Never reads the environment.
    pub fn for_tests() -> Self {
        Self {
            database_path: String::new(),
            http_port: 0,
            rpc_url: "http://127.0.0.1:9".to_string(),
            treasury_address: "0x742d35cc6634c0532925a3b8d11d2d7d2ae30b2b".to_string(),
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            reservation_timeout: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(20 * 60),
            allowance_price_usd: Decimal::from(24),
            eth_usd_rate: Decimal::from(2000),
            enforce_payment_amount: false,
            price_slippage_tolerance: Decimal::new(5, 2),
            reward_engine_url: None,
            reward_engine_secret: String::new(),
            reward_token_address: String::new(),
            reward_chain_id: 11_155_111,
            seed_serial_ranges: None,
            request_timeout: Duration::from_secs(1),
        }
    }
}
