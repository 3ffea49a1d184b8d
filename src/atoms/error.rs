// ── Sol TWAP Atoms: Error Types ────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Every terminal failure of a vault operation or swap run maps to exactly
//     one variant, and `EngineError::kind()` exposes it as a `Copy` tag so a
//     front end can render "wrong passphrase" vs "no route" vs "no wallet".
//   • `reqwest::Error` is split into `TransportTimeout` / `Transport` by hand
//     instead of `#[from]`, so timeouts stay distinguishable.
//   • No variant carries secret material (keys, passphrases, plaintext).

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Authenticated decryption failed: wrong passphrase or a tampered record.
    #[error("Integrity error: vault record could not be decrypted (wrong passphrase or corrupted data)")]
    Integrity,

    /// Unlock / export was requested but no encrypted record is stored.
    #[error("No encrypted wallet stored. Generate or import one first.")]
    NoVaultRecord,

    /// A passphrase is required and an empty one was supplied.
    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    /// Caller-supplied key material is not a structurally valid keypair.
    #[error("Invalid secret material: {0}")]
    InvalidSecretMaterial(String),

    /// Neither resolver path produced a route.
    #[error("No route found: {0}")]
    NoRouteFound(String),

    /// A route payload did not contain a usable transaction.
    #[error("Malformed route response: {0}")]
    MalformedRouteResponse(String),

    /// No embedded key is unlocked and no external signer is connected.
    #[error("No signer available: unlock the embedded wallet or connect an external signer")]
    NoSignerAvailable,

    /// A signer refused or returned an unusable transaction.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Component-local failure of the embedded routing capability.
    /// Triggers fallback; never surfaced as a terminal swap error.
    #[error("Routing error: {0}")]
    Routing(String),

    /// Serialized transaction bytes could not be parsed or edited.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A network operation exceeded its time budget.
    #[error("Transport timeout: {0}")]
    TransportTimeout(String),

    /// Network, submission or confirmation failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Rejected intent, amount, or TWAP job parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vault persistence backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

// ── Error kinds ────────────────────────────────────────────────────────────

/// Field-less discriminant of [`EngineError`] for UI dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Integrity,
    NoVaultRecord,
    EmptyPassphrase,
    InvalidSecretMaterial,
    NoRouteFound,
    MalformedRouteResponse,
    NoSignerAvailable,
    Signing,
    Routing,
    InvalidTransaction,
    TransportTimeout,
    Transport,
    InvalidInput,
    Storage,
    Config,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Integrity => ErrorKind::Integrity,
            Self::NoVaultRecord => ErrorKind::NoVaultRecord,
            Self::EmptyPassphrase => ErrorKind::EmptyPassphrase,
            Self::InvalidSecretMaterial(_) => ErrorKind::InvalidSecretMaterial,
            Self::NoRouteFound(_) => ErrorKind::NoRouteFound,
            Self::MalformedRouteResponse(_) => ErrorKind::MalformedRouteResponse,
            Self::NoSignerAvailable => ErrorKind::NoSignerAvailable,
            Self::Signing(_) => ErrorKind::Signing,
            Self::Routing(_) => ErrorKind::Routing,
            Self::InvalidTransaction(_) => ErrorKind::InvalidTransaction,
            Self::TransportTimeout(_) => ErrorKind::TransportTimeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Short, actionable message for end users.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Integrity => "Wrong passphrase, or the stored wallet is corrupted.",
            ErrorKind::NoVaultRecord => "No wallet stored yet. Generate or import one first.",
            ErrorKind::EmptyPassphrase => "Enter a passphrase.",
            ErrorKind::InvalidSecretMaterial => "That private key is not a valid Solana keypair.",
            ErrorKind::NoRouteFound => "No swap route is available for this pair and amount.",
            ErrorKind::MalformedRouteResponse => "The quote service returned no usable transaction.",
            ErrorKind::NoSignerAvailable => "No wallet connected. Unlock your wallet or connect a signer.",
            ErrorKind::Signing => "The transaction could not be signed.",
            ErrorKind::Routing => "The embedded router failed.",
            ErrorKind::InvalidTransaction => "The transaction payload could not be decoded.",
            ErrorKind::TransportTimeout => "The network did not respond in time.",
            ErrorKind::Transport => "A network request failed.",
            ErrorKind::InvalidInput => "Check the amount, slippage and token fields.",
            ErrorKind::Storage => "The wallet store could not be read or written.",
            ErrorKind::Config => "The configuration file is invalid.",
        }
    }
}

// ── Conversion: reqwest → EngineError ──────────────────────────────────────

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EngineError::TransportTimeout(e.to_string())
        } else {
            EngineError::Transport(e.to_string())
        }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;
