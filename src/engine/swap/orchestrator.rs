// Sol TWAP Swap: Orchestrator
//
//   Idle → Resolving → Building → Signing → Submitting → Confirming → Confirmed | Failed
//
// A run is one sequential chain of awaits. The signer is chosen before any
// network call. When the embedded route fails while building or signing, the
// whole run restarts on the REST quote path. Submission and confirmation
// failures are terminal on either path.
//
// Concurrent `execute` calls are not serialized here; the caller must keep at
// most one run in flight.

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::builder::TransactionBuilder;
use super::intent::SwapIntent;
use super::quote::QuoteService;
use super::resolver::RouteResolver;
use super::router::RoutingCapability;
use super::rpc::LedgerNetwork;
use super::signer::{SignerSelector, TransactionSigner};
use super::transaction::SignedTransaction;
use crate::atoms::constants::{DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SIGN_TIMEOUT_SECS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{Commitment, Route, RouteSource, SwapResult, SwapStage};

/// Per-step time budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapTimeouts {
    pub request: Duration,
    pub sign: Duration,
    pub confirm: Duration,
}

impl Default for SwapTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sign: Duration::from_secs(DEFAULT_SIGN_TIMEOUT_SECS),
            confirm: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
        }
    }
}

pub struct SwapOrchestrator {
    resolver: RouteResolver,
    builder: TransactionBuilder,
    signers: SignerSelector,
    network: Arc<dyn LedgerNetwork>,
    commitment: Commitment,
    timeouts: SwapTimeouts,
    stage: watch::Sender<SwapStage>,
}

impl SwapOrchestrator {
    pub fn new(
        embedded: Option<Arc<dyn RoutingCapability>>,
        quotes: Arc<dyn QuoteService>,
        network: Arc<dyn LedgerNetwork>,
        signers: SignerSelector,
    ) -> Self {
        Self::with_options(embedded, quotes, network, signers, Commitment::default(), SwapTimeouts::default())
    }

    pub fn with_options(
        embedded: Option<Arc<dyn RoutingCapability>>,
        quotes: Arc<dyn QuoteService>,
        network: Arc<dyn LedgerNetwork>,
        signers: SignerSelector,
        commitment: Commitment,
        timeouts: SwapTimeouts,
    ) -> Self {
        let (stage, _) = watch::channel(SwapStage::Idle);
        Self {
            resolver: RouteResolver::new(embedded.clone(), quotes, timeouts.request),
            builder: TransactionBuilder::new(embedded, Arc::clone(&network), timeouts.request),
            signers,
            network,
            commitment,
            timeouts,
            stage,
        }
    }

    /// Progress feed for a front end.
    pub fn subscribe(&self) -> watch::Receiver<SwapStage> {
        self.stage.subscribe()
    }

    pub fn stage(&self) -> SwapStage {
        *self.stage.borrow()
    }

    pub async fn execute(&self, intent: &SwapIntent) -> EngineResult<SwapResult> {
        self.advance(SwapStage::Idle);
        info!(
            "[swap] Executing {} {} → {} (slippage {} bps)",
            intent.amount_ui(),
            intent.input_mint(),
            intent.output_mint(),
            intent.slippage_bps()
        );
        match self.run(intent).await {
            Ok(result) => {
                self.advance(SwapStage::Confirmed);
                info!("[swap] Confirmed {} via {} route, {} signer", result.signature, result.route_source, result.signer);
                Ok(result)
            }
            Err(e) => {
                self.advance(SwapStage::Failed);
                error!("[swap] Failed ({:?}): {}", e.kind(), e);
                Err(e)
            }
        }
    }

    async fn run(&self, intent: &SwapIntent) -> EngineResult<SwapResult> {
        let signer = self.signers.select()?;

        self.advance(SwapStage::Resolving);
        let route = self.resolver.resolve(intent).await?;

        let (signed, route_source) = match route.source() {
            RouteSource::Sdk => match self.build_and_sign(&route, signer.as_ref()).await {
                Ok(signed) => (signed, RouteSource::Sdk),
                Err(e) => {
                    warn!("[swap] Embedded route failed before submission: {}; restarting on REST quote path", e);
                    self.advance(SwapStage::Resolving);
                    let route = self.resolver.resolve_remote(&intent.quote_params()).await?;
                    (self.build_and_sign(&route, signer.as_ref()).await?, RouteSource::Rest)
                }
            },
            RouteSource::Rest => (self.build_and_sign(&route, signer.as_ref()).await?, RouteSource::Rest),
        };

        self.advance(SwapStage::Submitting);
        let signature = bounded("sendTransaction", self.timeouts.request, self.network.send_transaction(&signed)).await?;

        self.advance(SwapStage::Confirming);
        bounded(
            "confirmation",
            self.timeouts.confirm,
            self.network.confirm_transaction(&signature, self.commitment),
        )
        .await?;

        Ok(SwapResult { signature, route_source, signer: signer.kind() })
    }

    async fn build_and_sign(&self, route: &Route, signer: &dyn TransactionSigner) -> EngineResult<SignedTransaction> {
        self.advance(SwapStage::Building);
        let unsigned = self.builder.build(route, Some(signer.public_key())).await?;

        self.advance(SwapStage::Signing);
        bounded("signing", self.timeouts.sign, signer.sign(unsigned)).await
    }

    fn advance(&self, stage: SwapStage) {
        self.stage.send_replace(stage);
    }
}

async fn bounded<T>(
    what: &str,
    limit: Duration,
    fut: impl std::future::Future<Output = EngineResult<T>>,
) -> EngineResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| EngineError::TransportTimeout(format!("{} exceeded {:?}", what, limit)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::ErrorKind;

    #[test]
    fn default_timeouts_give_signing_the_longest_budget() {
        let t = SwapTimeouts::default();
        assert!(t.sign > t.confirm);
        assert!(t.confirm > t.request);
    }

    #[tokio::test]
    async fn bounded_maps_elapsed_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, EngineError>(())
        };
        let err = bounded("signing", Duration::from_millis(10), slow).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportTimeout);
        assert!(err.to_string().contains("signing"));
    }

    #[tokio::test]
    async fn bounded_passes_inner_errors_through() {
        let failing = async { Err::<(), _>(EngineError::Transport("rejected".into())) };
        let err = bounded("sendTransaction", Duration::from_secs(1), failing).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
