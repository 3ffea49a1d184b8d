// Sol TWAP Swap: TWAP Job Registration
// Hands a TwapJob to the remote scheduler. The scheduler's verdict and body
// are surfaced verbatim; only transport failures are errors.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::atoms::constants::TWAP_REGISTER_PATH;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{TwapJob, TwapRegistration};

#[async_trait]
pub trait TwapScheduler: Send + Sync {
    async fn register(&self, job: &TwapJob) -> EngineResult<TwapRegistration>;
}

/// `{scheduler}/register-job`, appended to whatever path the base URL has.
pub fn register_url(scheduler: &Url) -> EngineResult<Url> {
    let base = scheduler.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/{}", base, TWAP_REGISTER_PATH))
        .map_err(|e| EngineError::Config(format!("Invalid TWAP scheduler URL '{}': {}", scheduler, e)))
}

pub fn validate_job(job: &TwapJob) -> EngineResult<()> {
    job.validate().map_err(EngineError::InvalidInput)
}

pub fn registration_from_reply(status: u16, body: Value) -> TwapRegistration {
    TwapRegistration { accepted: (200..300).contains(&status), status, body }
}
