// Sol TWAP Swap: Route Resolver
// Embedded router first, remote quote second. The embedded router being
// absent, failing, or finding nothing only ever triggers the fallback.

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::intent::SwapIntent;
use super::quote::QuoteService;
use super::router::RoutingCapability;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{QuoteParams, Route, RouteCandidate};

pub struct RouteResolver {
    embedded: Option<Arc<dyn RoutingCapability>>,
    quotes: Arc<dyn QuoteService>,
    timeout: Duration,
}

impl RouteResolver {
    pub fn new(
        embedded: Option<Arc<dyn RoutingCapability>>,
        quotes: Arc<dyn QuoteService>,
        timeout: Duration,
    ) -> Self {
        Self { embedded, quotes, timeout }
    }

    pub fn has_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    pub async fn resolve(&self, intent: &SwapIntent) -> EngineResult<Route> {
        let params = intent.quote_params();
        if let Some(route) = self.resolve_embedded(&params).await {
            return Ok(route);
        }
        self.resolve_remote(&params).await
    }

    /// `None` on every embedded-path failure; the reason is logged.
    pub async fn resolve_embedded(&self, params: &QuoteParams) -> Option<Route> {
        let router = self.embedded.as_ref()?;
        let candidates = match tokio::time::timeout(self.timeout, router.compute_routes(params)).await {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => {
                warn!("[resolver] Embedded router failed: {}; falling back to REST quote", e);
                return None;
            }
            Err(_) => {
                warn!("[resolver] Embedded router timed out after {}s; falling back to REST quote", self.timeout.as_secs());
                return None;
            }
        };
        let total = candidates.len();
        match select_candidate(candidates) {
            Some(c) => {
                info!("[resolver] Embedded route selected ({} candidates, out={:?})", total, c.out_amount);
                Some(Route::sdk(c.payload))
            }
            None => {
                warn!("[resolver] Embedded router returned no usable candidates ({} total); falling back to REST quote", total);
                None
            }
        }
    }

    /// Ask the quote service and wrap its payload as a REST route. The
    /// payload's transaction field is checked later by the builder.
    pub async fn resolve_remote(&self, params: &QuoteParams) -> EngineResult<Route> {
        let body = match tokio::time::timeout(self.timeout, self.quotes.fetch_quote(params)).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(EngineError::NoRouteFound(format!("quote service failed: {}", e))),
            Err(_) => {
                return Err(EngineError::NoRouteFound(format!(
                    "quote service timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };
        if !body.is_object() {
            return Err(EngineError::NoRouteFound(format!("quote service returned a non-object payload: {}", body)));
        }
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(EngineError::NoRouteFound(format!("quote service: {}", err)));
        }
        info!("[resolver] REST quote received for {} → {}", params.input_mint, params.output_mint);
        Ok(Route::rest(body))
    }
}

/// First candidate, in the capability's order, that quotes a positive
/// output. Candidates without a quoted amount are trusted as ranked.
pub fn select_candidate(candidates: Vec<RouteCandidate>) -> Option<RouteCandidate> {
    candidates.into_iter().find(|c| c.out_amount != Some(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cand(out: Option<u64>, tag: &str) -> RouteCandidate {
        RouteCandidate { out_amount: out, payload: json!({ "tag": tag }) }
    }

    #[test]
    fn first_positive_candidate_wins() {
        let picked = select_candidate(vec![cand(Some(0), "a"), cand(Some(5), "b"), cand(Some(9), "c")]).unwrap();
        assert_eq!(picked.payload["tag"], "b");
    }

    #[test]
    fn no_reranking_by_amount() {
        let picked = select_candidate(vec![cand(Some(1), "low"), cand(Some(100), "high")]).unwrap();
        assert_eq!(picked.payload["tag"], "low");
    }

    #[test]
    fn unquoted_candidates_are_kept() {
        let picked = select_candidate(vec![cand(None, "x")]).unwrap();
        assert_eq!(picked.payload["tag"], "x");
    }

    #[test]
    fn all_zero_means_none() {
        assert!(select_candidate(vec![cand(Some(0), "a"), cand(Some(0), "b")]).is_none());
        assert!(select_candidate(vec![]).is_none());
    }
}
