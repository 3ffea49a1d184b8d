// Sol TWAP Engine: Vault Crypto Primitives
// PBKDF2-HMAC-SHA256 key derivation feeding AES-256-GCM.
//
// Salt and IV are drawn from the OS CSPRNG inside `seal()` on every call.
// There is no API that encrypts with a caller-chosen IV under a derived key
// outside of `encrypt()`, and the vault only ever goes through `seal()`.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::atoms::constants::{
    DEFAULT_KDF_ITERATIONS, IV_LEN, KEY_LEN, MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS, SALT_LEN,
};
use crate::atoms::error::{EngineError, EngineResult};

// ── KDF parameters ─────────────────────────────────────────────────────────

/// PBKDF2 cost. Higher is slower to brute-force and slower to unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl KdfParams {
    pub fn new(iterations: u32) -> EngineResult<Self> {
        if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&iterations) {
            return Err(EngineError::Config(format!(
                "KDF iterations must be within {}..={}, got {}",
                MIN_KDF_ITERATIONS, MAX_KDF_ITERATIONS, iterations
            )));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { iterations: DEFAULT_KDF_ITERATIONS }
    }
}

// ── Derived key ────────────────────────────────────────────────────────────

/// AES-256-GCM cipher keyed from a passphrase. Raw key bytes are wiped
/// right after the cipher is initialised.
pub struct KeyHandle {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyHandle(..)")
    }
}

/// Derive an encryption key. Deterministic for identical passphrase, salt and
/// iteration count.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN], iterations: u32) -> KeyHandle {
    let mut raw = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, raw.as_mut());
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(raw.as_ref()));
    KeyHandle { cipher }
}

/// Authenticated encryption. The returned ciphertext carries the 16-byte tag.
pub fn encrypt(key: &KeyHandle, iv: &[u8; IV_LEN], plaintext: &[u8]) -> EngineResult<Vec<u8>> {
    key.cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| EngineError::InvalidInput("plaintext too large to encrypt".into()))
}

/// Authenticated decryption. Any tag mismatch is an `Integrity` error.
pub fn decrypt(key: &KeyHandle, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> EngineResult<Zeroizing<Vec<u8>>> {
    key.cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| EngineError::Integrity)
}

// ── Encrypted record ───────────────────────────────────────────────────────

/// The persisted vault blob. Written and replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord", into = "StoredRecord")]
pub struct EncryptedVaultRecord {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
    /// PBKDF2 rounds this record was sealed with.
    pub iterations: u32,
}

/// On-disk shape: base64 strings, as stored by earlier wallet versions.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    salt: String,
    iv: String,
    ciphertext: String,
    #[serde(default = "default_iterations")]
    iterations: u32,
}

fn default_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

impl From<EncryptedVaultRecord> for StoredRecord {
    fn from(r: EncryptedVaultRecord) -> Self {
        StoredRecord {
            salt: B64.encode(r.salt),
            iv: B64.encode(r.iv),
            ciphertext: B64.encode(&r.ciphertext),
            iterations: r.iterations,
        }
    }
}

impl TryFrom<StoredRecord> for EncryptedVaultRecord {
    type Error = String;

    fn try_from(s: StoredRecord) -> Result<Self, Self::Error> {
        let salt = decode_fixed::<SALT_LEN>("salt", &s.salt)?;
        let iv = decode_fixed::<IV_LEN>("iv", &s.iv)?;
        let ciphertext = B64.decode(&s.ciphertext).map_err(|e| format!("ciphertext: {}", e))?;
        if ciphertext.is_empty() {
            return Err("ciphertext is empty".into());
        }
        if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&s.iterations) {
            return Err(format!("iterations {} out of range", s.iterations));
        }
        Ok(EncryptedVaultRecord { salt, iv, ciphertext, iterations: s.iterations })
    }
}

fn decode_fixed<const N: usize>(field: &str, b64: &str) -> Result<[u8; N], String> {
    let bytes = B64.decode(b64).map_err(|e| format!("{}: {}", field, e))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| format!("{}: expected {} bytes, got {}", field, N, v.len()))
}

// ── Seal / open ────────────────────────────────────────────────────────────

/// Encrypt `plaintext` under `passphrase` with a fresh salt and IV.
pub fn seal(passphrase: &str, plaintext: &[u8], params: KdfParams) -> EngineResult<EncryptedVaultRecord> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt, params.iterations());
    let ciphertext = encrypt(&key, &iv, plaintext)?;
    Ok(EncryptedVaultRecord { salt, iv, ciphertext, iterations: params.iterations() })
}

/// Decrypt a record. Wrong passphrase and tampering both yield `Integrity`.
pub fn open(record: &EncryptedVaultRecord, passphrase: &str) -> EngineResult<Zeroizing<Vec<u8>>> {
    if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&record.iterations) {
        return Err(EngineError::Integrity);
    }
    let key = derive_key(passphrase, &record.salt, record.iterations);
    decrypt(&key, &record.iv, &record.ciphertext)
}
