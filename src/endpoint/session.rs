use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::antelope::{ClientError, LedgerApi, PackedTransaction, SendOptions, SendTransactionResponse};
use crate::signer::{KeyError, PrivateKey, Signature};
use crate::translator::{Action, ChainId, Name, Pack, PermissionLevel, Transaction, TransactionHeader, TranslateError};

/// Expiration bumps tried before giving up on a canonical signature.
const MAX_SIGN_ATTEMPTS: u32 = 32;

/// Account, permission and key that authorize every relayed action.
#[derive(Debug)]
pub struct MinerIdentity {
    pub account: Name,
    pub permission: Name,
    pub key: PrivateKey,
}

impl MinerIdentity {
    pub fn authorizer(&self) -> PermissionLevel {
        PermissionLevel {
            actor: self.account,
            permission: self.permission,
        }
    }
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("could not build transaction: {0}")]
    Translate(#[from] TranslateError),
    #[error("could not sign transaction: {0}")]
    Key(#[from] KeyError),
}

impl PushError {
    /// Human-readable cause, unwrapping structured chain errors.
    pub fn detail(&self) -> String {
        match self {
            PushError::Client(e) => e.ledger_detail(),
            other => other.to_string(),
        }
    }
}

/// Signing session bound to one endpoint and chain.
///
/// Rebuilt whole whenever the endpoint manager adopts an endpoint.
pub struct Session {
    identity: Arc<MinerIdentity>,
    chain_id: ChainId,
    client: Arc<dyn LedgerApi>,
}

impl Session {
    pub fn new(identity: Arc<MinerIdentity>, chain_id: ChainId, client: Arc<dyn LedgerApi>) -> Self {
        Self {
            identity,
            chain_id,
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn client(&self) -> &Arc<dyn LedgerApi> {
        &self.client
    }

    pub fn identity(&self) -> &MinerIdentity {
        &self.identity
    }

    /// Sign `transaction`, bumping its expiration by one second until the
    /// signature is canonical. Returns the transaction that was signed.
    pub fn sign(&self, mut transaction: Transaction) -> Result<(Transaction, Signature), KeyError> {
        for _ in 0..MAX_SIGN_ATTEMPTS {
            let digest = transaction.signing_digest(&self.chain_id);
            if let Some(signature) = self.identity.key.sign_canonical(&digest) {
                return Ok((transaction, signature));
            }
            debug!("non-canonical signature, bumping expiration");
            transaction.header.expiration += 1;
        }
        Err(KeyError::NonCanonical)
    }

    /// Build a transaction around `actions` with a fresh header, sign and submit it.
    pub async fn push(
        &self,
        actions: Vec<Action>,
        expire_sec: u32,
        options: &SendOptions,
    ) -> Result<SendTransactionResponse, PushError> {
        let info = self.client.get_info().await?;
        let header = TransactionHeader::from_info(&info, expire_sec)?;
        let (transaction, signature) = self.sign(Transaction::new(header, actions))?;

        let packed = PackedTransaction::new(signature.to_string(), &transaction.packed());
        Ok(self.client.send_transaction(&packed, options).await?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint())
            .field("chain_id", &self.chain_id.to_string())
            .finish()
    }
}
