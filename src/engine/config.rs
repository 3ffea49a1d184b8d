// Sol TWAP Engine: Configuration
//
// Reads `<config_dir>/sol-twap/config.toml`. Every field has a default, so a
// missing file or a partial file is fine; `validate()` rejects values that
// would make a run unsafe or impossible.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::atoms::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_JUPITER_API, DEFAULT_KDF_ITERATIONS,
    DEFAULT_QUOTE_API, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RPC_URL, DEFAULT_SIGN_TIMEOUT_SECS, DEFAULT_SLIPPAGE,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::Commitment;
use crate::engine::swap::fetcher::FetchEndpoints;
use crate::engine::swap::orchestrator::SwapTimeouts;
use crate::engine::swap::quote::parse_endpoint;
use crate::engine::vault::{FileVaultStore, KdfParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub rpc_url: String,
    /// REST quote endpoint (answers with a serialized transaction).
    pub quote_api_url: String,
    /// Jupiter swap API used by the embedded router.
    pub jupiter_api_url: String,
    pub jupiter_api_key: Option<String>,
    /// Load the embedded router at startup.
    pub embedded_router: bool,
    pub twap_scheduler_url: Option<String>,
    /// Overrides `<data_dir>/sol-twap/vault.json`.
    pub vault_path: Option<PathBuf>,
    pub kdf_iterations: u32,
    pub request_timeout_secs: u64,
    pub sign_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub commitment: Commitment,
    pub default_slippage: f64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            quote_api_url: DEFAULT_QUOTE_API.into(),
            jupiter_api_url: DEFAULT_JUPITER_API.into(),
            jupiter_api_key: None,
            embedded_router: true,
            twap_scheduler_url: None,
            vault_path: None,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sign_timeout_secs: DEFAULT_SIGN_TIMEOUT_SECS,
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            commitment: Commitment::Confirmed,
            default_slippage: DEFAULT_SLIPPAGE,
        }
    }
}

impl SwapConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse and validate. A missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(EngineError::Config(format!("Cannot read {}: {}", path.display(), e))),
        };
        let config = Self::from_toml(&content)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// `load` from `default_path()`, or defaults when there is no config dir.
    pub fn load_default() -> EngineResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| EngineError::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        parse_endpoint(&self.rpc_url, "RPC")?;
        parse_endpoint(&self.quote_api_url, "quote API")?;
        parse_endpoint(&self.jupiter_api_url, "Jupiter API")?;
        if let Some(url) = &self.twap_scheduler_url {
            parse_endpoint(url, "TWAP scheduler")?;
        }
        KdfParams::new(self.kdf_iterations)?;
        for (name, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("sign_timeout_secs", self.sign_timeout_secs),
            ("confirm_timeout_secs", self.confirm_timeout_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::Config(format!("{} must be greater than zero", name)));
            }
        }
        if !(self.default_slippage.is_finite() && (0.0..1.0).contains(&self.default_slippage)) {
            return Err(EngineError::Config(format!(
                "default_slippage must be in [0, 1), got {}",
                self.default_slippage
            )));
        }
        Ok(())
    }

    pub fn vault_path(&self) -> EngineResult<PathBuf> {
        self.vault_path
            .clone()
            .or_else(FileVaultStore::default_path)
            .ok_or_else(|| EngineError::Config("No data directory; set vault_path".into()))
    }

    pub fn kdf_params(&self) -> EngineResult<KdfParams> {
        KdfParams::new(self.kdf_iterations)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn timeouts(&self) -> SwapTimeouts {
        SwapTimeouts {
            request: self.request_timeout(),
            sign: Duration::from_secs(self.sign_timeout_secs),
            confirm: self.confirm_timeout(),
        }
    }

    pub fn fetch_endpoints(&self) -> EngineResult<FetchEndpoints> {
        Ok(FetchEndpoints {
            quote: parse_endpoint(&self.quote_api_url, "quote API")?,
            twap_scheduler: self
                .twap_scheduler_url
                .as_deref()
                .map(|u| parse_endpoint(u, "TWAP scheduler"))
                .transpose()?,
        })
    }
}
