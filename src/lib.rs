//! EVM Miner Gateway
//!
//! This crate implements a JSON-RPC server that accepts the Ethereum calls
//! a wallet needs to submit a transaction (`eth_sendRawTransaction`,
//! `eth_gasPrice`, `eth_maxPriorityFeePerGas`) and relays them to the
//! `eosio.evm` contract of an Antelope chain as signed `pushtx` actions.
//!
//! # Architecture
//!
//! ```text
//! Wallet (MetaMask/ethers.js)
//!     |
//!     | eth_* JSON-RPC calls
//!     v
//! EVM Miner Gateway (this crate)
//!     |
//!     | /v1/chain/* (get_info, get_table_rows, send_transaction2)
//!     v
//! Antelope endpoints (failover list)
//! ```
//!
//! # Modules
//!
//! - `config` - Environment and configuration management
//! - `server` - JSON-RPC server setup and method registration
//! - `methods` - RPC method handlers
//! - `gateway` - Facade tying endpoints, pricing and relay together
//! - `endpoint` - Endpoint failover and signing sessions
//! - `pricing` - Gas price oracle and safety windows
//! - `relay` - Raw transaction to `pushtx` relay
//! - `translator` - Antelope names, binary packing and transactions
//! - `antelope` - Chain API client
//! - `signer` - K1 keys and canonical signatures

pub mod antelope;
pub mod config;
pub mod endpoint;
pub mod gateway;
pub mod methods;
pub mod pricing;
pub mod relay;
pub mod server;
pub mod signer;
pub mod translator;
