// Sol TWAP Swap: Embedded Routing Capability
// RoutingCapability trait, JupiterRouter (Jupiter swap API), load_embedded_router
//
// The capability is optional. `load_embedded_router` returns `None` when it is
// disabled or cannot be constructed; callers treat that as "unavailable" and
// go straight to the REST quote path.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{QuoteParams, Route, RouteCandidate};
use crate::engine::config::SwapConfig;

#[async_trait]
pub trait RoutingCapability: Send + Sync {
    /// Candidates in the capability's own ranking order.
    async fn compute_routes(&self, params: &QuoteParams) -> EngineResult<Vec<RouteCandidate>>;

    /// Exchange step for a route this capability produced. Returns the raw
    /// payload carrying the serialized transaction.
    async fn build_transaction(&self, route: &Route, signer_hint: Option<&str>) -> EngineResult<Value>;
}

pub struct JupiterRouter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JupiterRouter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> EngineResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| EngineError::Config(format!("Invalid Jupiter API URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Routing(format!("HTTP client init failed: {}", e)))?;
        Ok(JupiterRouter { client, base_url, api_key })
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[async_trait]
impl RoutingCapability for JupiterRouter {
    async fn compute_routes(&self, params: &QuoteParams) -> EngineResult<Vec<RouteCandidate>> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}&restrictIntermediateTokens=true",
            self.base_url, params.input_mint, params.output_mint, params.amount, params.slippage_bps
        );
        info!("[router] Jupiter quote {} → {} ({} base units)", params.input_mint, params.output_mint, params.amount);

        let resp = self
            .with_key(self.client.get(&url))
            .send()
            .await
            .map_err(|e| EngineError::Routing(format!("Jupiter quote request failed: {}", e)))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::Routing(format!("Jupiter quote body unreadable: {}", e)))?;

        if !status.is_success() || body.get("error").is_some() {
            let msg = body
                .get("error")
                .and_then(|v| v.as_str())
                .or_else(|| body.get("message").and_then(|v| v.as_str()))
                .unwrap_or("Unknown error");
            return Err(EngineError::Routing(format!("Jupiter quote failed (HTTP {}): {}", status, msg)));
        }

        Ok(candidates_from_quote(body))
    }

    async fn build_transaction(&self, route: &Route, signer_hint: Option<&str>) -> EngineResult<Value> {
        let user = signer_hint
            .ok_or_else(|| EngineError::Routing("Jupiter swap build needs the signer's public key".into()))?;
        let swap_body = json!({
            "quoteResponse": route.payload(),
            "userPublicKey": user,
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
        });

        info!("[router] Requesting swap transaction from Jupiter");
        let resp = self
            .with_key(self.client.post(format!("{}/swap", self.base_url)))
            .json(&swap_body)
            .send()
            .await
            .map_err(|e| EngineError::Routing(format!("Jupiter swap request failed: {}", e)))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::Routing(format!("Jupiter swap body unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(EngineError::Routing(format!("Jupiter swap failed (HTTP {}): {}", status, body)));
        }
        Ok(body)
    }
}

/// A Jupiter `/quote` answer is one best route, or a list of them under
/// `data` on older deployments.
fn candidates_from_quote(body: Value) -> Vec<RouteCandidate> {
    let routes = match body {
        Value::Object(mut map) if map.get("data").map(Value::is_array).unwrap_or(false) => {
            match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        Value::Array(items) => items,
        other => vec![other],
    };
    routes
        .into_iter()
        .map(|payload| RouteCandidate { out_amount: parse_out_amount(&payload), payload })
        .collect()
}

fn parse_out_amount(route: &Value) -> Option<u64> {
    match route.get("outAmount")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Construct the embedded router from configuration. `None` is the
/// "failed to load" state; it is logged and never an error.
pub fn load_embedded_router(config: &SwapConfig) -> Option<Arc<dyn RoutingCapability>> {
    if !config.embedded_router {
        info!("[router] Embedded router disabled; quotes go through the REST path");
        return None;
    }
    match JupiterRouter::new(&config.jupiter_api_url, config.jupiter_api_key.clone(), config.request_timeout()) {
        Ok(router) => {
            info!("[router] Embedded router loaded ({})", config.jupiter_api_url);
            Some(Arc::new(router))
        }
        Err(e) => {
            warn!("[router] Embedded router unavailable: {}", e);
            None
        }
    }
}
