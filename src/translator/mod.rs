pub mod action;
pub mod name;
pub mod pack;
pub mod tx;

use thiserror::Error;

pub use action::{Action, PermissionLevel, PushTx, PUSHTX};
pub use name::Name;
pub use pack::Pack;
pub use tx::{content_hash, decode_payload, ChainId, Transaction, TransactionHeader};

/// Errors raised while translating an EVM payload into an Antelope transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
    #[error("invalid account name: {0:?}")]
    InvalidName(String),
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("invalid block id: {0}")]
    InvalidBlockId(String),
    #[error("invalid block timestamp: {0}")]
    InvalidTimestamp(String),
}
