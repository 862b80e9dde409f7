//! K1 (secp256k1) keys and signatures in Antelope string formats.
//!
//! Private keys are accepted as legacy WIF (`5...`) or `PVT_K1_...`.
//! Signatures are always canonical and rendered as `SIG_K1_...`.

use std::fmt;
use std::str::FromStr;

use libsecp256k1::{Message, PublicKey, SecretKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("private key is not valid base58")]
    Base58,
    #[error("private key has an unexpected length or prefix")]
    Format,
    #[error("private key checksum mismatch")]
    Checksum,
    #[error("private key is not a valid secp256k1 scalar")]
    Scalar,
    #[error("could not produce a canonical signature")]
    NonCanonical,
}

fn ripemd160_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

fn double_sha256_checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `<prefix>` + base58(data || ripemd160(data || "K1")[..4])
fn encode_k1(prefix: &str, data: &[u8]) -> String {
    let mut buf = data.to_vec();
    buf.extend_from_slice(&ripemd160_checksum(data, b"K1"));
    format!("{}{}", prefix, bs58::encode(buf).into_string())
}

/// Private key used to sign miner transactions.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::Format)?;
        let secret = SecretKey::parse(&arr).map_err(|_| KeyError::Scalar)?;
        Ok(Self { secret })
    }

    fn public(&self) -> [u8; 33] {
        PublicKey::from_secret_key(&self.secret).serialize_compressed()
    }

    /// Public key in the current `PUB_K1_` format.
    pub fn public_key(&self) -> String {
        encode_k1("PUB_K1_", &self.public())
    }

    /// Public key in the legacy `EOS` format.
    pub fn legacy_public_key(&self) -> String {
        let public = self.public();
        let mut buf = public.to_vec();
        buf.extend_from_slice(&ripemd160_checksum(&public, b""));
        format!("EOS{}", bs58::encode(buf).into_string())
    }

    /// Sign a 32-byte digest. Returns `None` when the (deterministic)
    /// signature is not canonical; the caller must change the digest and
    /// try again.
    pub fn sign_canonical(&self, digest: &[u8; 32]) -> Option<Signature> {
        let (signature, recovery_id) = libsecp256k1::sign(&Message::parse(digest), &self.secret);
        let mut data = [0u8; 65];
        data[0] = recovery_id.serialize() + 27 + 4;
        data[1..].copy_from_slice(&signature.serialize());
        let signature = Signature(data);
        signature.is_canonical().then_some(signature)
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("PVT_K1_") {
            let raw = bs58::decode(rest).into_vec().map_err(|_| KeyError::Base58)?;
            if raw.len() != 36 {
                return Err(KeyError::Format);
            }
            let (key, checksum) = raw.split_at(32);
            if ripemd160_checksum(key, b"K1") != checksum {
                return Err(KeyError::Checksum);
            }
            return Self::from_bytes(key);
        }

        // Legacy WIF: 0x80 || key || sha256d checksum
        let raw = bs58::decode(s).into_vec().map_err(|_| KeyError::Base58)?;
        if raw.len() != 37 || raw[0] != 0x80 {
            return Err(KeyError::Format);
        }
        let (payload, checksum) = raw.split_at(33);
        if double_sha256_checksum(payload) != checksum {
            return Err(KeyError::Checksum);
        }
        Self::from_bytes(&payload[1..])
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish()
    }
}

/// Compact recoverable signature: `[recovery header, r(32), s(32)]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 65]);

impl Signature {
    /// Antelope only accepts signatures whose `r` and `s` have no
    /// superfluous leading byte in DER form.
    pub fn is_canonical(&self) -> bool {
        let c = &self.0;
        (c[1] & 0x80) == 0
            && !(c[1] == 0 && (c[2] & 0x80) == 0)
            && (c[33] & 0x80) == 0
            && !(c[33] == 0 && (c[34] & 0x80) == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_k1("SIG_K1_", &self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}
