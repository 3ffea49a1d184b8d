// ── Sol TWAP Atoms: Constants ──────────────────────────────────────────────
// All named constants for the crate live here.

// ── Vault crypto parameters ────────────────────────────────────────────────
// PBKDF2-HMAC-SHA256 feeding AES-256-GCM. The iteration count is a tunable
// cost; records remember the count they were sealed with.
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
pub const MIN_KDF_ITERATIONS: u32 = 250_000;
pub const DEFAULT_KDF_ITERATIONS: u32 = MIN_KDF_ITERATIONS;
// Upper bound on a stored record's cost; keeps a tampered count from stalling unlock.
pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;

// ── Vault persistence identifiers ──────────────────────────────────────────
// The single well-known blob name. Changing it strands existing wallets.
pub const VAULT_RECORD_NAME: &str = "enc_wallet";
pub(crate) const VAULT_KEYRING_SERVICE: &str = "sol-twap-vault";
pub(crate) const VAULT_FILE_NAME: &str = "vault.json";
pub(crate) const APP_DIR_NAME: &str = "sol-twap";
pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";

// ── Ed25519 / Solana key sizes ─────────────────────────────────────────────
pub const PUBKEY_LEN: usize = 32;
pub const SEED_LEN: usize = 32;
pub const KEYPAIR_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = 64;
pub const BLOCKHASH_LEN: usize = 32;

/// Well-known SPL tokens on Solana mainnet (symbol, mint_address, decimals)
pub(crate) const KNOWN_TOKENS: &[(&str, &str, u8)] = &[
    ("SOL",   "So11111111111111111111111111111111111111112",  9),
    ("USDC",  "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6),
    ("USDT",  "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",  6),
    ("BONK",  "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",  5),
    ("JUP",   "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",   6),
    ("RAY",   "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R",  6),
    ("PYTH",  "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3",  6),
    ("WIF",   "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",  6),
    ("MSOL",  "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",   9),
];

// ── Endpoints ──────────────────────────────────────────────────────────────
pub(crate) const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
/// REST quote endpoint that answers with a serialized swap transaction.
pub(crate) const DEFAULT_QUOTE_API: &str = "https://quote-api.jup.ag/v4/swap";
/// Jupiter swap API used by the embedded router (quote + swap build).
pub(crate) const DEFAULT_JUPITER_API: &str = "https://api.jup.ag/swap/v1";
pub(crate) const TWAP_REGISTER_PATH: &str = "register-job";

// ── Route payload field names ──────────────────────────────────────────────
// The REST quote answers in one of two shapes; JSON pointers to the base64
// transaction, checked in order.
pub(crate) const REST_TX_POINTERS: &[&str] = &["/data/0/swapTransaction", "/swapTransaction"];
/// Field names the embedded router's build step may use for the transaction.
pub(crate) const SDK_TX_FIELDS: &[&str] = &["swapTransaction", "swapTxn"];

// ── Swap defaults ──────────────────────────────────────────────────────────
pub const DEFAULT_SLIPPAGE: f64 = 0.03;
pub(crate) const BPS_PER_UNIT: f64 = 10_000.0;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
/// External signers may wait on a human.
pub(crate) const DEFAULT_SIGN_TIMEOUT_SECS: u64 = 120;
/// Delay between `getSignatureStatuses` polls while confirming.
pub(crate) const CONFIRM_POLL_INTERVAL_MS: u64 = 500;
