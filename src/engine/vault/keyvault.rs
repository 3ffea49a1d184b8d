// Sol TWAP Engine: Key Vault
// One logical wallet slot over a VaultStore, with an optional in-memory key.
//
//   Empty     no stored record
//   Locked    record stored, no key in memory
//   Unlocked  record stored, key in memory
//
// Every mutation is encrypt-then-persist or decrypt-then-assign: the in-memory
// slot is only written after the fallible steps have all succeeded.

use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use zeroize::Zeroizing;

use super::crypto::{open, seal, KdfParams};
use super::key::UnlockedKey;
use super::store::VaultStore;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::VaultState;

pub struct KeyVault<S: VaultStore> {
    store: S,
    kdf: KdfParams,
    slot: RwLock<Option<Arc<UnlockedKey>>>,
}

impl<S: VaultStore> KeyVault<S> {
    pub fn new(store: S) -> Self {
        Self::with_kdf(store, KdfParams::default())
    }

    pub fn with_kdf(store: S, kdf: KdfParams) -> Self {
        Self { store, kdf, slot: RwLock::new(None) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> EngineResult<VaultState> {
        if self.slot.read().is_some() {
            return Ok(VaultState::Unlocked);
        }
        Ok(match self.store.get()? {
            Some(_) => VaultState::Locked,
            None => VaultState::Empty,
        })
    }

    /// Snapshot of the unlocked key for one signing operation.
    pub fn current_key(&self) -> Option<Arc<UnlockedKey>> {
        self.slot.read().clone()
    }

    pub fn address(&self) -> Option<String> {
        self.slot.read().as_ref().map(|k| k.address())
    }

    /// Create a fresh keypair, seal it and hold it unlocked.
    ///
    /// Destructive: any previously stored wallet is overwritten and cannot be
    /// recovered unless it was exported first.
    pub fn generate(&self, passphrase: &str) -> EngineResult<String> {
        require_passphrase(passphrase)?;
        let key = UnlockedKey::generate();
        let address = self.persist_and_hold(key, passphrase)?;
        info!("[vault] Generated new wallet {}", address);
        Ok(address)
    }

    /// Seal caller-supplied key material (32-byte seed or 64-byte keypair).
    /// Overwrites any stored wallet, like `generate`.
    pub fn import_secret(&self, secret: &[u8], passphrase: &str) -> EngineResult<String> {
        require_passphrase(passphrase)?;
        let key = UnlockedKey::from_secret_bytes(secret)?;
        let address = self.persist_and_hold(key, passphrase)?;
        info!("[vault] Imported wallet {}", address);
        Ok(address)
    }

    /// `import_secret` for a base58 string as exported by wallets.
    pub fn import_base58(&self, secret_b58: &str, passphrase: &str) -> EngineResult<String> {
        require_passphrase(passphrase)?;
        let key = UnlockedKey::from_base58(secret_b58)?;
        let address = self.persist_and_hold(key, passphrase)?;
        info!("[vault] Imported wallet {}", address);
        Ok(address)
    }

    /// Decrypt the stored record into memory. A failed unlock leaves the
    /// in-memory slot exactly as it was.
    pub fn unlock(&self, passphrase: &str) -> EngineResult<String> {
        require_passphrase(passphrase)?;
        let key = self.decrypt_stored(passphrase)?;
        let address = key.address();
        *self.slot.write() = Some(Arc::new(key));
        info!("[vault] Wallet {} unlocked", address);
        Ok(address)
    }

    /// Decrypt and return the base58 secret. Does not change state.
    pub fn export_secret(&self, passphrase: &str) -> EngineResult<Zeroizing<String>> {
        require_passphrase(passphrase)?;
        let key = self.decrypt_stored(passphrase)?;
        info!("[vault] Secret exported for {}", key.address());
        Ok(key.to_base58_secret())
    }

    /// Drop the in-memory key. The stored record is untouched.
    pub fn clear_memory(&self) {
        if self.slot.write().take().is_some() {
            info!("[vault] Cleared wallet from memory (encrypted record remains)");
        }
    }

    /// Remove the stored record and the in-memory key.
    pub fn wipe(&self) -> EngineResult<()> {
        self.store.clear()?;
        self.slot.write().take();
        warn!("[vault] Stored wallet wiped");
        Ok(())
    }

    fn persist_and_hold(&self, key: UnlockedKey, passphrase: &str) -> EngineResult<String> {
        match self.store.get() {
            Ok(None) => {}
            Ok(Some(_)) => {
                warn!("[vault] Overwriting the stored wallet; the previous key is unrecoverable unless exported")
            }
            Err(e) => warn!("[vault] Replacing an unreadable stored wallet: {}", e),
        }
        let secret = key.to_base58_secret();
        let record = seal(passphrase, secret.as_bytes(), self.kdf)?;
        self.store.put(&record)?;
        let address = key.address();
        *self.slot.write() = Some(Arc::new(key));
        Ok(address)
    }

    fn decrypt_stored(&self, passphrase: &str) -> EngineResult<UnlockedKey> {
        let record = self.store.get()?.ok_or(EngineError::NoVaultRecord)?;
        let plaintext = open(&record, passphrase).map_err(|e| {
            warn!("[vault] Decryption failed");
            e
        })?;
        let secret = std::str::from_utf8(&plaintext)
            .map_err(|_| EngineError::InvalidSecretMaterial("stored secret is not valid UTF-8".into()))?;
        UnlockedKey::from_base58(secret)
    }
}

fn require_passphrase(passphrase: &str) -> EngineResult<()> {
    if passphrase.is_empty() {
        return Err(EngineError::EmptyPassphrase);
    }
    Ok(())
}
