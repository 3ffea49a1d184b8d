// Sol TWAP Swap: Signers
// TransactionSigner (embedded key | external provider) and SignerSelector.
//
// Selection order: embedded key if the vault is unlocked, else a connected
// external provider, else NoSignerAvailable.

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::transaction::{SignedTransaction, UnsignedTransaction};
use crate::atoms::constants::PUBKEY_LEN;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::SignerKind;
use crate::engine::vault::{KeyVault, UnlockedKey, VaultStore};

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn kind(&self) -> SignerKind;
    fn public_key(&self) -> [u8; PUBKEY_LEN];
    async fn sign(&self, tx: UnsignedTransaction) -> EngineResult<SignedTransaction>;
}

// ── Embedded ──────────────────────────────────────────────────────────

/// Signs locally with a snapshot of the vault's unlocked key.
pub struct EmbeddedSigner {
    key: Arc<UnlockedKey>,
}

impl EmbeddedSigner {
    pub fn new(key: Arc<UnlockedKey>) -> Self {
        Self { key }
    }
}

#[async_trait]
impl TransactionSigner for EmbeddedSigner {
    fn kind(&self) -> SignerKind {
        SignerKind::Embedded
    }

    fn public_key(&self) -> [u8; PUBKEY_LEN] {
        self.key.public_key()
    }

    async fn sign(&self, tx: UnsignedTransaction) -> EngineResult<SignedTransaction> {
        let signature = self.key.sign(tx.message());
        tx.apply_signature(&self.key.public_key(), signature)
    }
}

// ── External ──────────────────────────────────────────────────────────

/// A wallet outside this process. `sign_transaction` may block on a human.
#[async_trait]
pub trait ExternalSignerProvider: Send + Sync {
    fn is_connected(&self) -> bool;
    fn public_identity(&self) -> Option<[u8; PUBKEY_LEN]>;
    /// Serialized unsigned transaction in, serialized signed transaction out.
    async fn sign_transaction(&self, tx: Vec<u8>) -> EngineResult<Vec<u8>>;
}

pub struct ExternalSigner {
    provider: Arc<dyn ExternalSignerProvider>,
    public_key: [u8; PUBKEY_LEN],
}

#[async_trait]
impl TransactionSigner for ExternalSigner {
    fn kind(&self) -> SignerKind {
        SignerKind::External
    }

    fn public_key(&self) -> [u8; PUBKEY_LEN] {
        self.public_key
    }

    async fn sign(&self, tx: UnsignedTransaction) -> EngineResult<SignedTransaction> {
        let message = tx.message().to_vec();
        let signed = self.provider.sign_transaction(tx.as_bytes().to_vec()).await?;
        let signed = SignedTransaction::from_bytes(signed)?;
        let returned = UnsignedTransaction::from_bytes(signed.as_bytes().to_vec())?;
        if returned.message() != message.as_slice() {
            return Err(EngineError::Signing("external signer altered the transaction message".into()));
        }
        Ok(signed)
    }
}

// ── Selection ─────────────────────────────────────────────────────────

/// Read side of the vault: the unlocked key, if any, as a snapshot.
pub trait KeySource: Send + Sync {
    fn current_key(&self) -> Option<Arc<UnlockedKey>>;
}

impl<S: VaultStore> KeySource for KeyVault<S> {
    fn current_key(&self) -> Option<Arc<UnlockedKey>> {
        KeyVault::current_key(self)
    }
}

pub struct SignerSelector {
    keys: Arc<dyn KeySource>,
    external: Option<Arc<dyn ExternalSignerProvider>>,
}

impl SignerSelector {
    pub fn new(keys: Arc<dyn KeySource>, external: Option<Arc<dyn ExternalSignerProvider>>) -> Self {
        Self { keys, external }
    }

    /// Pick the signer for one run. Performs no I/O.
    pub fn select(&self) -> EngineResult<Box<dyn TransactionSigner>> {
        if let Some(key) = self.keys.current_key() {
            info!("[swap] Using embedded signer {}", key.address());
            return Ok(Box::new(EmbeddedSigner::new(key)));
        }
        if let Some(provider) = self.external.as_ref().filter(|p| p.is_connected()) {
            if let Some(public_key) = provider.public_identity() {
                info!("[swap] Using external signer {}", bs58::encode(public_key).into_string());
                return Ok(Box::new(ExternalSigner { provider: Arc::clone(provider), public_key }));
            }
        }
        Err(EngineError::NoSignerAvailable)
    }
}
