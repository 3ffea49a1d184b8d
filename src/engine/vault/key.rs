// Sol TWAP Engine: In-memory Wallet Key
// UnlockedKey wraps an ed25519 signing key. It is never persisted in plaintext
// and never cloned; the vault hands out `Arc` references for signing.

use ed25519_dalek::{Signer, SigningKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::atoms::constants::{KEYPAIR_LEN, PUBKEY_LEN, SEED_LEN, SIGNATURE_LEN};
use crate::atoms::error::{EngineError, EngineResult};

pub struct UnlockedKey {
    signing_key: SigningKey,
}

impl UnlockedKey {
    /// Fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Accept either a 32-byte seed or a 64-byte Solana keypair
    /// (seed followed by public key). A keypair whose public half does not
    /// match its seed is rejected.
    pub fn from_secret_bytes(secret: &[u8]) -> EngineResult<Self> {
        let signing_key = match secret.len() {
            SEED_LEN => {
                let mut seed = Zeroizing::new([0u8; SEED_LEN]);
                seed.copy_from_slice(secret);
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LEN => {
                let mut pair = Zeroizing::new([0u8; KEYPAIR_LEN]);
                pair.copy_from_slice(secret);
                SigningKey::from_keypair_bytes(&pair).map_err(|_| {
                    EngineError::InvalidSecretMaterial("public key does not match secret key".into())
                })?
            }
            n => {
                return Err(EngineError::InvalidSecretMaterial(format!(
                    "expected {} or {} bytes, got {}",
                    SEED_LEN, KEYPAIR_LEN, n
                )))
            }
        };
        Ok(Self { signing_key })
    }

    /// Decode a base58-encoded secret (the format wallets export).
    pub fn from_base58(secret_b58: &str) -> EngineResult<Self> {
        let bytes = Zeroizing::new(
            bs58::decode(secret_b58.trim())
                .into_vec()
                .map_err(|e| EngineError::InvalidSecretMaterial(format!("invalid base58: {}", e)))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    pub fn public_key(&self) -> [u8; PUBKEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Base58 public address.
    pub fn address(&self) -> String {
        bs58::encode(self.public_key()).into_string()
    }

    /// Base58 of the 64-byte keypair, the plaintext sealed into the vault.
    pub fn to_base58_secret(&self) -> Zeroizing<String> {
        let pair = Zeroizing::new(self.signing_key.to_keypair_bytes());
        Zeroizing::new(bs58::encode(&pair[..]).into_string())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for UnlockedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockedKey").field("address", &self.address()).finish_non_exhaustive()
    }
}
