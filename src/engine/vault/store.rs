// Sol TWAP Engine: Vault Store
// Persists exactly one named encrypted record. Last write wins.
//
// Backends:
//   FileVaultStore      JSON file, temp-file + rename so a crash never
//                        leaves a half-written record
//   KeyringVaultStore   OS keychain entry
//   MemoryVaultStore    process-local, for tests and throwaway sessions

use log::info;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::crypto::EncryptedVaultRecord;
use crate::atoms::constants::{APP_DIR_NAME, VAULT_FILE_NAME, VAULT_KEYRING_SERVICE, VAULT_RECORD_NAME};
use crate::atoms::error::{EngineError, EngineResult};

/// Key-value contract over the single vault slot.
pub trait VaultStore: Send + Sync {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()>;
    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>>;
    fn clear(&self) -> EngineResult<()>;
}

impl<S: VaultStore + ?Sized> VaultStore for Arc<S> {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()> {
        (**self).put(record)
    }

    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>> {
        (**self).get()
    }

    fn clear(&self) -> EngineResult<()> {
        (**self).clear()
    }
}

impl<S: VaultStore + ?Sized> VaultStore for Box<S> {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()> {
        (**self).put(record)
    }

    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>> {
        (**self).get()
    }

    fn clear(&self) -> EngineResult<()> {
        (**self).clear()
    }
}

// ── File ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileVaultStore {
    path: PathBuf,
}

impl FileVaultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/sol-twap/vault.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join(VAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl VaultStore for FileVaultStore {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.tmp_path();
        write_private(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        info!("[vault] Encrypted record written to {}", self.path.display());
        Ok(())
    }

    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::Storage(format!("vault file {} is corrupt: {}", self.path.display(), e)))?;
        Ok(Some(record))
    }

    fn clear(&self) -> EngineResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("[vault] Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut f = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    f.write_all(data)?;
    f.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}

// ── OS keychain ────────────────────────────────────────────────────────────

pub struct KeyringVaultStore {
    entry: keyring::Entry,
}

impl KeyringVaultStore {
    /// Keychain entry `sol-twap-vault` / `enc_wallet`.
    pub fn new() -> EngineResult<Self> {
        Self::with_names(VAULT_KEYRING_SERVICE, VAULT_RECORD_NAME)
    }

    pub fn with_names(service: &str, user: &str) -> EngineResult<Self> {
        let entry = keyring::Entry::new(service, user)
            .map_err(|e| EngineError::Storage(format!("Keyring init failed: {}", e)))?;
        Ok(Self { entry })
    }
}

impl VaultStore for KeyringVaultStore {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()> {
        let json = serde_json::to_string(record)?;
        self.entry
            .set_password(&json)
            .map_err(|e| EngineError::Storage(format!("Failed to store vault in keychain: {}", e)))?;
        info!("[vault] Encrypted record stored in OS keychain");
        Ok(())
    }

    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>> {
        match self.entry.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| EngineError::Storage(format!("keychain vault entry is corrupt: {}", e))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::Storage(format!("Keyring error: {}", e))),
        }
    }

    fn clear(&self) -> EngineResult<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(EngineError::Storage(format!("Keyring error: {}", e))),
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryVaultStore {
    slot: Mutex<Option<EncryptedVaultRecord>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryVaultStore {
    fn put(&self, record: &EncryptedVaultRecord) -> EngineResult<()> {
        *self.slot.lock() = Some(record.clone());
        Ok(())
    }

    fn get(&self) -> EngineResult<Option<EncryptedVaultRecord>> {
        Ok(self.slot.lock().clone())
    }

    fn clear(&self) -> EngineResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fill: u8) -> EncryptedVaultRecord {
        EncryptedVaultRecord {
            salt: [fill; 16],
            iv: [fill; 12],
            ciphertext: vec![fill; 48],
            iterations: 250_000,
        }
    }

    #[test]
    fn file_store_put_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path().join("nested").join("vault.json"));
        assert!(store.get().unwrap().is_none());

        store.put(&record(1)).unwrap();
        assert_eq!(store.get().unwrap(), Some(record(1)));

        store.put(&record(2)).unwrap();
        assert_eq!(store.get().unwrap(), Some(record(2)));
        assert!(!store.tmp_path().exists());

        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        FileVaultStore::new(&path).put(&record(3)).unwrap();
        assert_eq!(FileVaultStore::new(&path).get().unwrap(), Some(record(3)));
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = FileVaultStore::new(&path).get().unwrap_err();
        assert_eq!(err.kind(), crate::atoms::error::ErrorKind::Storage);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path().join("vault.json"));
        store.put(&record(4)).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_last_write_wins() {
        let store = Arc::new(MemoryVaultStore::new());
        store.put(&record(5)).unwrap();
        store.put(&record(6)).unwrap();
        assert_eq!(store.get().unwrap(), Some(record(6)));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
