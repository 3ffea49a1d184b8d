// Sol TWAP Swap: Remote Quote Service
// QuoteService trait and the REST quote URL format.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::QuoteParams;

/// External quoting service. Returns the raw JSON payload; interpreting it
/// (error field, transaction field) is the resolver's and builder's job.
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn fetch_quote(&self, params: &QuoteParams) -> EngineResult<Value>;
}

/// `{endpoint}?inputMint=..&outputMint=..&amount=..&slippageBps=..`
pub fn quote_url(endpoint: &Url, params: &QuoteParams) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("inputMint", &params.input_mint)
        .append_pair("outputMint", &params.output_mint)
        .append_pair("amount", &params.amount.to_string())
        .append_pair("slippageBps", &params.slippage_bps.to_string());
    url
}

pub fn parse_endpoint(raw: &str, what: &str) -> EngineResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| EngineError::Config(format!("Invalid {} URL '{}': {}", what, raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EngineError::Config(format!("{} URL must be http(s), got '{}'", what, other))),
    }
}
