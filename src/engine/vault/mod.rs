// Sol TWAP Engine: Secure Key Vault
// Passphrase-encrypted storage for the single embedded Solana wallet.
//
// Module layout:
//   crypto     derive_key, encrypt, decrypt, seal, open, EncryptedVaultRecord
//   key        UnlockedKey (in-memory ed25519 keypair)
//   store      VaultStore trait + file / keychain / memory backends
//   keyvault   KeyVault state machine (generate, import, unlock, export, clear, wipe)

pub mod crypto;
pub mod key;
pub mod keyvault;
pub mod store;

pub use crypto::{EncryptedVaultRecord, KdfParams};
pub use key::UnlockedKey;
pub use keyvault::KeyVault;
pub use store::{FileVaultStore, KeyringVaultStore, MemoryVaultStore, VaultStore};
