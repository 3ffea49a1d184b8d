// ── Sol TWAP Atoms: Pure Data Types ────────────────────────────────────────
// Plain struct/enum definitions shared by the vault and swap engines.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use serde::{Deserialize, Serialize};

// ── Vault ──────────────────────────────────────────────────────────────────

/// Observable state of the single wallet slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultState {
    /// No encrypted record stored.
    Empty,
    /// Record stored, no key in memory.
    Locked,
    /// Record stored and key decrypted into memory.
    Unlocked,
}

impl std::fmt::Display for VaultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

// ── Routes ─────────────────────────────────────────────────────────────────

/// Which resolver path produced a route. Decides the transaction extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Embedded routing capability (compute routes + build step).
    Sdk,
    /// Remote quote service returning a serialized transaction.
    Rest,
}

impl std::fmt::Display for RouteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sdk => write!(f, "sdk"),
            Self::Rest => write!(f, "rest"),
        }
    }
}

/// A resolved route: opaque payload tagged once, at creation, with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    source: RouteSource,
    payload: serde_json::Value,
}

impl Route {
    pub fn sdk(candidate: serde_json::Value) -> Self {
        Self { source: RouteSource::Sdk, payload: candidate }
    }

    pub fn rest(raw_response: serde_json::Value) -> Self {
        Self { source: RouteSource::Rest, payload: raw_response }
    }

    pub fn source(&self) -> RouteSource {
        self.source
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

/// One candidate returned by the embedded routing capability.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    /// Quoted output in base units, when the capability reports one.
    pub out_amount: Option<u64>,
    /// Capability-specific route object handed back to its build step.
    pub payload: serde_json::Value,
}

/// Wire parameters shared by both quoting paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount scaled to integer base units by the intent's decimal exponent.
    pub amount: u64,
    pub slippage_bps: u16,
}

// ── Signing / network ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerKind {
    /// In-memory key held by the vault.
    Embedded,
    /// External wallet provider.
    External,
}

impl std::fmt::Display for SignerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Ledger commitment levels, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for Commitment {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            _ => Err(format!("Unknown commitment level: {}", s)),
        }
    }
}

// ── Swap run ───────────────────────────────────────────────────────────────

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStage {
    Idle,
    Resolving,
    Building,
    Signing,
    Submitting,
    Confirming,
    Confirmed,
    Failed,
}

impl std::fmt::Display for SwapStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Building => "building",
            Self::Signing => "signing",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Successful swap outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    /// Base58 transaction signature.
    pub signature: String,
    pub route_source: RouteSource,
    pub signer: SignerKind,
}

// ── TWAP scheduler ─────────────────────────────────────────────────────────

/// Registration request for the remote TWAP scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwapJob {
    pub input_mint: String,
    pub output_mint: String,
    pub total_amount: f64,
    pub chunk_size: f64,
    pub interval_ms: u64,
}

impl TwapJob {
    /// Reject jobs the scheduler could never run.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_mint.trim().is_empty() || self.output_mint.trim().is_empty() {
            return Err("input and output mints are required".into());
        }
        if !(self.total_amount.is_finite() && self.total_amount > 0.0) {
            return Err(format!("total amount must be positive, got {}", self.total_amount));
        }
        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return Err(format!("chunk size must be positive, got {}", self.chunk_size));
        }
        if self.chunk_size > self.total_amount {
            return Err(format!(
                "chunk size {} exceeds total amount {}",
                self.chunk_size, self.total_amount
            ));
        }
        if self.interval_ms == 0 {
            return Err("interval must be at least 1 ms".into());
        }
        Ok(())
    }
}

/// Scheduler verdict, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapRegistration {
    pub accepted: bool,
    pub status: u16,
    pub body: serde_json::Value,
}
