use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::pricing::{Aggregate, FeeStrategy};
use crate::signer::PrivateKey;
use crate::translator::Name;

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key of the miner permission (legacy WIF or `PVT_K1_`)
    pub private_key: PrivateKey,
    pub miner_account: Name,
    pub miner_permission: Name,
    /// Ledger endpoints, in failover order
    pub rpc_endpoints: Vec<String>,
    /// Optional endpoints used for resource-market samples
    pub pricing_endpoints: Vec<String>,
    /// RPC server port
    pub port: u16,
    pub evm_account: Name,
    pub evm_scope: String,
    pub fee_strategy: FeeStrategy,
    /// Gas-token units per native token unit
    pub gas_token_exchange_rate: f64,
    pub expire_sec: u32,
    pub retry_tx: bool,
    pub refresh_interval: Duration,
    pub initial_refresh_delay: Duration,
    pub priority_fee_window: Duration,
    pub priority_fee_aggregate: Aggregate,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Call dotenvy::dotenv() before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("Missing {}", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let private_key: PrivateKey = required("PRIVATE_KEY")?
            .parse()
            .context("PRIVATE_KEY is not a valid K1 private key")?;

        let miner_account: Name = required("MINER_ACCOUNT")?
            .parse()
            .context("MINER_ACCOUNT must be a valid account name")?;

        let miner_permission: Name = or_default("MINER_PERMISSION", "active")
            .parse()
            .context("MINER_PERMISSION must be a valid permission name")?;

        let rpc_endpoints = split_endpoints(&required("RPC_ENDPOINTS")?);
        if rpc_endpoints.is_empty() {
            bail!("Not enough RPC_ENDPOINTS");
        }
        let pricing_endpoints = lookup("PRICING_ENDPOINTS")
            .map(|v| split_endpoints(&v))
            .unwrap_or_default();

        let port: u16 = parse(&or_default("PORT", "50305"), "PORT")?;

        let evm_account: Name = or_default("EVM_ACCOUNT", "eosio.evm")
            .parse()
            .context("EVM_ACCOUNT must be a valid account name")?;
        let evm_scope = or_default("EVM_SCOPE", "eosio.evm");

        let fee_strategy = FeeStrategy::parse(
            &or_default("MINER_FEE_MODE", "fixed"),
            parse(&or_default("FIXED_MINER_FEE", "0"), "FIXED_MINER_FEE")?,
            parse(&or_default("MINER_FEE_RATIO", "0"), "MINER_FEE_RATIO")?,
            parse(&or_default("GAS_PER_US", "74"), "GAS_PER_US")?,
            parse(&or_default("MINER_MARKUP_PERCENTAGE", "0"), "MINER_MARKUP_PERCENTAGE")?,
        );
        let gas_token_exchange_rate: f64 =
            parse(&or_default("GAS_TOKEN_EXCHANGE_RATE", "1"), "GAS_TOKEN_EXCHANGE_RATE")?;

        let expire_sec: u32 = parse(&or_default("EXPIRE_SEC", "60"), "EXPIRE_SEC")?;
        let retry_tx = or_default("RETRY_TX", "true") == "true";

        let refresh_interval = millis(&or_default("REFRESH_INTERVAL_MS", "5000"), "REFRESH_INTERVAL_MS")?;
        let initial_refresh_delay =
            millis(&or_default("INITIAL_REFRESH_DELAY_MS", "100"), "INITIAL_REFRESH_DELAY_MS")?;
        let priority_fee_window =
            millis(&or_default("PRIORITY_FEE_WINDOW_MS", "60000"), "PRIORITY_FEE_WINDOW_MS")?;
        let priority_fee_aggregate: Aggregate =
            parse(&or_default("PRIORITY_FEE_AGGREGATE", "min"), "PRIORITY_FEE_AGGREGATE")?;
        let request_timeout = millis(&or_default("REQUEST_TIMEOUT_MS", "10000"), "REQUEST_TIMEOUT_MS")?;

        Ok(Config {
            private_key,
            miner_account,
            miner_permission,
            rpc_endpoints,
            pricing_endpoints,
            port,
            evm_account,
            evm_scope,
            fee_strategy,
            gas_token_exchange_rate,
            expire_sec,
            retry_tx,
            refresh_interval,
            initial_refresh_delay,
            priority_fee_window,
            priority_fee_aggregate,
            request_timeout,
        })
    }
}

fn split_endpoints(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse<T>(value: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, value, e))
}

fn millis(value: &str, key: &str) -> Result<Duration> {
    parse(value, key).map(Duration::from_millis)
}
