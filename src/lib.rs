// Sol TWAP: passphrase-encrypted Solana wallet vault and swap orchestrator.
//
//   atoms    errors, constants and plain data types (no I/O)
//   engine   vault, swap pipeline, configuration

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult, ErrorKind};
pub use atoms::types::{
    Commitment, Route, RouteCandidate, RouteSource, SignerKind, SwapResult, SwapStage, TwapJob, TwapRegistration,
    VaultState,
};
pub use engine::config::SwapConfig;
pub use engine::swap::{SwapIntent, SwapOrchestrator};
pub use engine::vault::{KeyVault, UnlockedKey};
