// End-to-end swap runs against in-process fakes of every external
// collaborator: embedded router, quote service, ledger network and
// external wallet.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sol_twap::atoms::types::QuoteParams;
use sol_twap::engine::swap::transaction::{compile_legacy_transaction, AccountMeta, CompiledInstruction};
use sol_twap::engine::swap::{
    ExternalSignerProvider, LedgerNetwork, QuoteService, RouteResolver, RoutingCapability, SignedTransaction,
    SignerSelector, SwapTimeouts, TransactionBuilder, UnsignedTransaction,
};
use sol_twap::engine::vault::{FileVaultStore, MemoryVaultStore};
use sol_twap::{
    Commitment, EngineError, EngineResult, ErrorKind, KeyVault, Route, RouteCandidate, RouteSource, SignerKind,
    SwapIntent, SwapOrchestrator, SwapStage, UnlockedKey, VaultState,
};

// ── Fixtures ───────────────────────────────────────────────────────────────

const PLACEHOLDER_PAYER: [u8; 32] = [0xAA; 32];
const NETWORK_BLOCKHASH: [u8; 32] = [0x42; 32];

/// Base64 legacy transaction paying from a placeholder account.
fn swap_tx_b64() -> String {
    let bytes = compile_legacy_transaction(
        &[1u8; 32],
        &[
            AccountMeta { pubkey: PLACEHOLDER_PAYER, is_signer: true, is_writable: true },
            AccountMeta { pubkey: [5u8; 32], is_signer: false, is_writable: true },
            AccountMeta { pubkey: [0u8; 32], is_signer: false, is_writable: false },
        ],
        &[CompiledInstruction { program_id_index: 2, accounts: vec![0, 1], data: vec![2, 0, 0, 0, 1] }],
    );
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
}

fn sol_usdc() -> SwapIntent {
    SwapIntent::for_tokens("SOL", "USDC", "1", 0.03, None).unwrap()
}

fn fast_timeouts() -> SwapTimeouts {
    SwapTimeouts {
        request: Duration::from_secs(2),
        sign: Duration::from_secs(2),
        confirm: Duration::from_millis(200),
    }
}

// ── Fakes ──────────────────────────────────────────────────────────────────

enum Routes {
    Fail,
    Candidates(Vec<RouteCandidate>),
}

enum Build {
    Fail,
    Payload(Value),
}

struct FakeRouter {
    routes: Routes,
    build: Build,
    compute_calls: AtomicUsize,
    build_calls: AtomicUsize,
    hints: Mutex<Vec<Option<String>>>,
}

impl FakeRouter {
    fn new(routes: Routes, build: Build) -> Arc<Self> {
        Arc::new(Self {
            routes,
            build,
            compute_calls: AtomicUsize::new(0),
            build_calls: AtomicUsize::new(0),
            hints: Mutex::new(Vec::new()),
        })
    }

    fn working() -> Arc<Self> {
        Self::new(
            Routes::Candidates(vec![RouteCandidate { out_amount: Some(150_000_000), payload: json!({ "id": "best" }) }]),
            Build::Payload(json!({ "swapTransaction": swap_tx_b64() })),
        )
    }

    fn computes(&self) -> usize {
        self.compute_calls.load(Ordering::SeqCst)
    }

    fn builds(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingCapability for FakeRouter {
    async fn compute_routes(&self, _params: &QuoteParams) -> EngineResult<Vec<RouteCandidate>> {
        self.compute_calls.fetch_add(1, Ordering::SeqCst);
        match &self.routes {
            Routes::Fail => Err(EngineError::Routing("router crashed".into())),
            Routes::Candidates(c) => Ok(c.clone()),
        }
    }

    async fn build_transaction(&self, route: &Route, signer_hint: Option<&str>) -> EngineResult<Value> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(route.source(), RouteSource::Sdk);
        self.hints.lock().push(signer_hint.map(str::to_string));
        match &self.build {
            Build::Fail => Err(EngineError::Routing("exchange failed".into())),
            Build::Payload(v) => Ok(v.clone()),
        }
    }
}

struct FakeQuotes {
    reply: Value,
    calls: AtomicUsize,
    seen: Mutex<Vec<QuoteParams>>,
}

impl FakeQuotes {
    fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self { reply, calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) })
    }

    fn with_tx() -> Arc<Self> {
        Self::replying(json!({ "data": [{ "swapTransaction": swap_tx_b64() }] }))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteService for FakeQuotes {
    async fn fetch_quote(&self, params: &QuoteParams) -> EngineResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(params.clone());
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
struct FakeNetwork {
    fail_send: bool,
    never_confirm: bool,
    blockhash_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    sent: Mutex<Vec<SignedTransaction>>,
}

impl FakeNetwork {
    fn total_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst) + self.confirm_calls.load(Ordering::SeqCst) + self.sent.lock().len()
    }
}

#[async_trait]
impl LedgerNetwork for FakeNetwork {
    async fn latest_blockhash(&self) -> EngineResult<[u8; 32]> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(NETWORK_BLOCKHASH)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> EngineResult<String> {
        if self.fail_send {
            return Err(EngineError::Transport("node rejected transaction".into()));
        }
        self.sent.lock().push(tx.clone());
        Ok(tx.signature())
    }

    async fn confirm_transaction(&self, _signature: &str, _commitment: Commitment) -> EngineResult<()> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.never_confirm {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }
}

struct FakeWallet {
    key: UnlockedKey,
    connected: bool,
    refuse_first: bool,
    sign_calls: AtomicUsize,
}

impl FakeWallet {
    fn connected() -> Arc<Self> {
        Arc::new(Self { key: UnlockedKey::generate(), connected: true, refuse_first: false, sign_calls: AtomicUsize::new(0) })
    }

    fn refusing_once() -> Arc<Self> {
        Arc::new(Self { key: UnlockedKey::generate(), connected: true, refuse_first: true, sign_calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl ExternalSignerProvider for FakeWallet {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn public_identity(&self) -> Option<[u8; 32]> {
        Some(self.key.public_key())
    }

    async fn sign_transaction(&self, tx: Vec<u8>) -> EngineResult<Vec<u8>> {
        let call = self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_first && call == 0 {
            return Err(EngineError::Signing("user rejected the request".into()));
        }
        let tx = UnsignedTransaction::from_bytes(tx)?;
        let sig = self.key.sign(tx.message());
        Ok(tx.apply_signature(&self.key.public_key(), sig)?.as_bytes().to_vec())
    }
}

fn unlocked_vault() -> Arc<KeyVault<MemoryVaultStore>> {
    let vault = Arc::new(KeyVault::new(MemoryVaultStore::new()));
    vault.generate("correct horse").unwrap();
    vault
}

fn locked_vault() -> Arc<KeyVault<MemoryVaultStore>> {
    Arc::new(KeyVault::new(MemoryVaultStore::new()))
}

fn orchestrator(
    router: Option<Arc<FakeRouter>>,
    quotes: Arc<FakeQuotes>,
    network: Arc<FakeNetwork>,
    signers: SignerSelector,
) -> SwapOrchestrator {
    SwapOrchestrator::with_options(
        router.map(|r| r as Arc<dyn RoutingCapability>),
        quotes,
        network,
        signers,
        Commitment::Confirmed,
        fast_timeouts(),
    )
}

fn verify(tx: &SignedTransaction, signer: &[u8; 32]) {
    let parsed = UnsignedTransaction::from_bytes(tx.as_bytes().to_vec()).unwrap();
    let sig_bytes: [u8; 64] = tx.as_bytes()[1..65].try_into().unwrap();
    let vk = VerifyingKey::from_bytes(signer).unwrap();
    vk.verify(parsed.message(), &Signature::from_bytes(&sig_bytes)).unwrap();
}

// ── Vault scenarios ────────────────────────────────────────────────────────

#[test]
fn correct_horse_survives_lock_unlock_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.json");

    let vault = KeyVault::new(FileVaultStore::new(&path));
    let address = vault.generate("correct horse").unwrap();
    vault.clear_memory();
    assert_eq!(vault.state().unwrap(), VaultState::Locked);
    assert_eq!(vault.unlock("correct horse").unwrap(), address);
    drop(vault);

    let reopened = KeyVault::new(FileVaultStore::new(&path));
    assert_eq!(reopened.state().unwrap(), VaultState::Locked);
    assert_eq!(reopened.unlock("Correct horse").unwrap_err().kind(), ErrorKind::Integrity);
    assert_eq!(reopened.unlock("correct horse").unwrap(), address);

    let on_disk = std::fs::read_to_string(&path).unwrap();
    let secret = reopened.export_secret("correct horse").unwrap();
    assert!(!on_disk.contains(secret.as_str()));
}

#[test]
fn tampered_vault_file_fails_integrity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.json");
    let vault = KeyVault::new(FileVaultStore::new(&path));
    vault.generate("pw").unwrap();
    vault.clear_memory();

    let mut record: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let ct = record["ciphertext"].as_str().unwrap().to_string();
    let mut bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &ct).unwrap();
    bytes[0] ^= 0x01;
    record["ciphertext"] = json!(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes));
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

    assert_eq!(vault.unlock("pw").unwrap_err().kind(), ErrorKind::Integrity);
    assert!(vault.current_key().is_none());
}

// ── Resolver / builder properties ──────────────────────────────────────────

#[tokio::test]
async fn failed_embedded_router_falls_back_to_remote_exactly_once() {
    let router = FakeRouter::new(Routes::Fail, Build::Fail);
    let quotes = FakeQuotes::with_tx();
    let resolver = RouteResolver::new(Some(router.clone() as Arc<dyn RoutingCapability>), quotes.clone(), Duration::from_secs(2));

    let route = resolver.resolve(&sol_usdc()).await.unwrap();
    assert_eq!(route.source(), RouteSource::Rest);
    assert_eq!(router.computes(), 1);
    assert_eq!(quotes.calls(), 1);

    let sent = quotes.seen.lock();
    assert_eq!(sent[0].amount, 1_000_000_000);
    assert_eq!(sent[0].slippage_bps, 300);
}

#[tokio::test]
async fn remote_error_payload_is_no_route() {
    let quotes = FakeQuotes::replying(json!({ "error": "no liquidity" }));
    let resolver = RouteResolver::new(None, quotes.clone(), Duration::from_secs(2));
    let err = resolver.resolve(&sol_usdc()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoRouteFound);
}

#[tokio::test]
async fn builder_sets_fee_payer_or_fails_before_network() {
    let network = Arc::new(FakeNetwork::default());
    let builder = TransactionBuilder::new(None, network.clone(), Duration::from_secs(2));
    let route = Route::rest(json!({ "swapTransaction": swap_tx_b64() }));

    let err = builder.build(&route, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSignerAvailable);
    assert_eq!(network.total_calls(), 0);

    let payer = UnlockedKey::generate().public_key();
    let tx = builder.build(&route, Some(payer)).await.unwrap();
    assert_eq!(tx.fee_payer(), payer);
    assert_eq!(tx.recent_blockhash(), NETWORK_BLOCKHASH);
    assert_eq!(network.blockhash_calls.load(Ordering::SeqCst), 1);
}

// ── Orchestrator scenarios ─────────────────────────────────────────────────

#[tokio::test]
async fn zero_candidates_then_missing_tx_field_is_malformed() {
    let router = FakeRouter::new(Routes::Candidates(vec![]), Build::Fail);
    let quotes = FakeQuotes::replying(json!({ "routePlan": [] }));
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(unlocked_vault(), None),
    );

    let err = orch.execute(&sol_usdc()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRouteResponse);
    assert_eq!(router.computes(), 1);
    assert_eq!(router.builds(), 0);
    assert_eq!(quotes.calls(), 1);
    assert_eq!(network.total_calls(), 0);
    assert_eq!(orch.stage(), SwapStage::Failed);
}

#[tokio::test]
async fn no_signer_fails_fast_without_network() {
    let router = FakeRouter::working();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(locked_vault(), None),
    );

    let err = orch.execute(&sol_usdc()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSignerAvailable);
    assert_eq!(router.computes(), 0);
    assert_eq!(quotes.calls(), 0);
    assert_eq!(network.total_calls(), 0);
}

#[tokio::test]
async fn embedded_route_and_embedded_signer() {
    let vault = unlocked_vault();
    let key = vault.current_key().unwrap();
    let router = FakeRouter::working();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(vault.clone(), None),
    );
    let mut stages = orch.subscribe();

    let result = orch.execute(&sol_usdc()).await.unwrap();
    assert_eq!(result.route_source, RouteSource::Sdk);
    assert_eq!(result.signer, SignerKind::Embedded);
    assert_eq!(quotes.calls(), 0);
    assert_eq!(router.hints.lock()[0].as_deref(), Some(key.address().as_str()));

    let sent = network.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].signature(), result.signature);
    let parsed = UnsignedTransaction::from_bytes(sent[0].as_bytes().to_vec()).unwrap();
    assert_eq!(parsed.fee_payer(), key.public_key());
    assert_eq!(parsed.recent_blockhash(), NETWORK_BLOCKHASH);
    verify(&sent[0], &key.public_key());

    assert_eq!(network.confirm_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*stages.borrow_and_update(), SwapStage::Confirmed);
}

#[tokio::test]
async fn sdk_build_failure_restarts_on_rest_path() {
    let router = FakeRouter::new(
        Routes::Candidates(vec![RouteCandidate { out_amount: Some(10), payload: json!({}) }]),
        Build::Fail,
    );
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(unlocked_vault(), None),
    );

    let result = orch.execute(&sol_usdc()).await.unwrap();
    assert_eq!(result.route_source, RouteSource::Rest);
    assert_eq!(router.computes(), 1);
    assert_eq!(router.builds(), 1);
    assert_eq!(quotes.calls(), 1);
    assert_eq!(network.sent.lock().len(), 1);
}

#[tokio::test]
async fn sdk_payload_without_transaction_restarts_on_rest_path() {
    let router = FakeRouter::new(
        Routes::Candidates(vec![RouteCandidate { out_amount: Some(10), payload: json!({}) }]),
        Build::Payload(json!({ "unexpected": true })),
    );
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(unlocked_vault(), None),
    );

    let result = orch.execute(&sol_usdc()).await.unwrap();
    assert_eq!(result.route_source, RouteSource::Rest);
    assert_eq!(quotes.calls(), 1);
}

#[tokio::test]
async fn external_signer_used_when_vault_locked() {
    let wallet = FakeWallet::connected();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        None,
        quotes.clone(),
        network.clone(),
        SignerSelector::new(locked_vault(), Some(wallet.clone() as Arc<dyn ExternalSignerProvider>)),
    );

    let result = orch.execute(&sol_usdc()).await.unwrap();
    assert_eq!(result.signer, SignerKind::External);
    assert_eq!(result.route_source, RouteSource::Rest);
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 1);
    verify(&network.sent.lock()[0], &wallet.key.public_key());
}

#[tokio::test]
async fn sdk_signing_failure_restarts_on_rest_path() {
    let wallet = FakeWallet::refusing_once();
    let router = FakeRouter::working();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(locked_vault(), Some(wallet.clone() as Arc<dyn ExternalSignerProvider>)),
    );

    let result = orch.execute(&sol_usdc()).await.unwrap();
    assert_eq!(result.route_source, RouteSource::Rest);
    assert_eq!(result.signer, SignerKind::External);
    assert_eq!(router.computes(), 1);
    assert_eq!(router.builds(), 1);
    assert_eq!(quotes.calls(), 1);
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 2);

    let sent = network.sent.lock();
    assert_eq!(sent.len(), 1);
    verify(&sent[0], &wallet.key.public_key());
}

#[tokio::test]
async fn submission_failure_is_terminal_and_not_retried() {
    let router = FakeRouter::working();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork { fail_send: true, ..FakeNetwork::default() });
    let orch = orchestrator(
        Some(router.clone()),
        quotes.clone(),
        network.clone(),
        SignerSelector::new(unlocked_vault(), None),
    );

    let err = orch.execute(&sol_usdc()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(quotes.calls(), 0);
    assert_eq!(router.builds(), 1);
    assert_eq!(network.confirm_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn confirmation_timeout_is_reported() {
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork { never_confirm: true, ..FakeNetwork::default() });
    let orch = orchestrator(None, quotes, network.clone(), SignerSelector::new(unlocked_vault(), None));

    let err = orch.execute(&sol_usdc()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportTimeout);
    assert_eq!(network.sent.lock().len(), 1);
    assert_eq!(orch.stage(), SwapStage::Failed);
}

#[tokio::test]
async fn locking_between_runs_changes_signer_availability() {
    let vault = unlocked_vault();
    let quotes = FakeQuotes::with_tx();
    let network = Arc::new(FakeNetwork::default());
    let orch = orchestrator(None, quotes, network, SignerSelector::new(vault.clone(), None));

    assert!(orch.execute(&sol_usdc()).await.is_ok());
    vault.clear_memory();
    assert_eq!(orch.execute(&sol_usdc()).await.unwrap_err().kind(), ErrorKind::NoSignerAvailable);
    vault.unlock("correct horse").unwrap();
    assert!(orch.execute(&sol_usdc()).await.is_ok());
}
