use chrono::NaiveDateTime;
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use tracing::debug;

use super::action::Action;
use super::pack::{write_varuint32, Pack};
use super::TranslateError;
use crate::antelope::types::ChainInfo;

/// 32-byte chain identifier reported by `get_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainId([u8; 32]);

impl ChainId {
    pub fn from_hex(hex_str: &str) -> Result<Self, TranslateError> {
        let bytes = hex::decode(hex_str)
            .map_err(|_| TranslateError::InvalidChainId(hex_str.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TranslateError::InvalidChainId(hex_str.to_string()))?;
        Ok(ChainId(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// TaPoS header of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionHeader {
    /// Seconds since epoch after which the transaction is rejected
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
}

impl TransactionHeader {
    /// Build a header referencing the last irreversible block, expiring
    /// `expire_sec` seconds after the current head block time.
    pub fn from_info(info: &ChainInfo, expire_sec: u32) -> Result<Self, TranslateError> {
        let block_id = hex::decode(&info.last_irreversible_block_id)
            .ok()
            .filter(|id| id.len() == 32)
            .ok_or_else(|| TranslateError::InvalidBlockId(info.last_irreversible_block_id.clone()))?;

        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&block_id[8..12]);

        let head_time = parse_block_time(&info.head_block_time)?;
        let expiration = u32::try_from(head_time + expire_sec as i64)
            .map_err(|_| TranslateError::InvalidTimestamp(info.head_block_time.clone()))?;

        Ok(TransactionHeader {
            expiration,
            ref_block_num: (info.last_irreversible_block_num & 0xffff) as u16,
            ref_block_prefix: u32::from_le_bytes(prefix),
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        })
    }
}

impl Pack for TransactionHeader {
    fn pack(&self, out: &mut Vec<u8>) {
        self.expiration.pack(out);
        self.ref_block_num.pack(out);
        self.ref_block_prefix.pack(out);
        write_varuint32(out, self.max_net_usage_words);
        self.max_cpu_usage_ms.pack(out);
        write_varuint32(out, self.delay_sec);
    }
}

/// Parse a head block time such as `2024-05-01T12:00:00.500` (UTC, no zone suffix).
fn parse_block_time(s: &str) -> Result<i64, TranslateError> {
    let trimmed = s.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.and_utc().timestamp())
        .map_err(|_| TranslateError::InvalidTimestamp(s.to_string()))
}

/// Unsigned Antelope transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new(header: TransactionHeader, actions: Vec<Action>) -> Self {
        Self {
            header,
            context_free_actions: Vec::new(),
            actions,
        }
    }

    /// Digest that is signed: `sha256(chain_id || packed_trx || cfd_digest)`.
    /// There is no context-free data, so its digest is 32 zero bytes.
    pub fn signing_digest(&self, chain_id: &ChainId) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(chain_id.as_bytes());
        hasher.update(self.packed());
        hasher.update([0u8; 32]);
        hasher.finalize().into()
    }
}

impl Pack for Transaction {
    fn pack(&self, out: &mut Vec<u8>) {
        self.header.pack(out);
        self.context_free_actions.pack(out);
        self.actions.pack(out);
        // transaction_extensions
        write_varuint32(out, 0);
    }
}

/// Decode a `0x`-prefixed hex payload into raw bytes.
pub fn decode_payload(raw_hex: &str) -> Result<Vec<u8>, TranslateError> {
    let stripped = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
    hex::decode(stripped).map_err(|e| TranslateError::InvalidHex(e.to_string()))
}

/// Keccak256 content hash of a raw EVM transaction, `0x`-prefixed.
pub fn content_hash(payload: &[u8]) -> String {
    let hash = Keccak256::digest(payload);
    let hex_hash = format!("0x{}", hex::encode(hash));
    debug!("content hash of {} bytes -> {}", payload.len(), hex_hash);
    hex_hash
}
