// Sol TWAP Swap: Privileged Fetcher
//
// A background task owns outbound HTTP to the quote service and the TWAP
// scheduler. Callers talk to it through a typed request channel with a
// oneshot reply per request. The serving side (`serve`) is a pure function
// from request to response over an injected HTTP backend.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use super::quote::{quote_url, QuoteService};
use super::twap::{register_url, registration_from_reply, validate_job, TwapScheduler};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{QuoteParams, TwapJob, TwapRegistration};

/// Closed set of things the fetcher will do.
#[derive(Debug, Clone)]
pub enum FetchRequest {
    Quote(QuoteParams),
    RegisterTwap(TwapJob),
}

#[derive(Debug, Clone)]
pub enum FetchResponse {
    Quote(Value),
    TwapRegistered(TwapRegistration),
}

/// Status code plus body. Non-JSON bodies arrive as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw HTTP used by `serve`. Errors are transport failures only.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    async fn get_json(&self, url: &Url) -> EngineResult<HttpReply>;
    async fn post_json(&self, url: &Url, body: &Value) -> EngineResult<HttpReply>;
}

pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("HTTP client init failed: {}", e)))?;
        Ok(ReqwestBackend { client })
    }

    async fn read(resp: reqwest::Response) -> EngineResult<HttpReply> {
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl FetchBackend for ReqwestBackend {
    async fn get_json(&self, url: &Url) -> EngineResult<HttpReply> {
        let resp = self.client.get(url.clone()).send().await?;
        Self::read(resp).await
    }

    async fn post_json(&self, url: &Url, body: &Value) -> EngineResult<HttpReply> {
        let resp = self.client.post(url.clone()).json(body).send().await?;
        Self::read(resp).await
    }
}

/// Where the fetcher is allowed to go.
#[derive(Debug, Clone)]
pub struct FetchEndpoints {
    pub quote: Url,
    pub twap_scheduler: Option<Url>,
}

/// Answer one request.
pub async fn serve(backend: &dyn FetchBackend, endpoints: &FetchEndpoints, request: FetchRequest) -> EngineResult<FetchResponse> {
    match request {
        FetchRequest::Quote(params) => {
            let url = quote_url(&endpoints.quote, &params);
            debug!("[fetcher] GET {}", url);
            let reply = backend.get_json(&url).await?;
            if !reply.is_success() {
                return Err(EngineError::Transport(format!(
                    "quote service returned HTTP {}: {}",
                    reply.status, reply.body
                )));
            }
            Ok(FetchResponse::Quote(reply.body))
        }
        FetchRequest::RegisterTwap(job) => {
            validate_job(&job)?;
            let scheduler = endpoints
                .twap_scheduler
                .as_ref()
                .ok_or_else(|| EngineError::Config("no TWAP scheduler URL configured".into()))?;
            let url = register_url(scheduler)?;
            let body = serde_json::to_value(&job)?;
            info!("[fetcher] Registering TWAP job at {}", url);
            let reply = backend.post_json(&url, &body).await?;
            let registration = registration_from_reply(reply.status, reply.body);
            if !registration.accepted {
                warn!("[fetcher] Scheduler rejected TWAP job (HTTP {})", registration.status);
            }
            Ok(FetchResponse::TwapRegistered(registration))
        }
    }
}

struct Envelope {
    request: FetchRequest,
    reply: oneshot::Sender<EngineResult<FetchResponse>>,
}

/// Handle to the fetcher task. Cheap to clone; the task stops when every
/// handle is dropped.
#[derive(Clone)]
pub struct QuoteFetcher {
    tx: mpsc::Sender<Envelope>,
}

impl QuoteFetcher {
    /// Spawn the serving task on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn FetchBackend>, endpoints: FetchEndpoints) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(32);
        let endpoints = Arc::new(endpoints);
        tokio::spawn(async move {
            while let Some(Envelope { request, reply }) = rx.recv().await {
                let backend = Arc::clone(&backend);
                let endpoints = Arc::clone(&endpoints);
                tokio::spawn(async move {
                    let result = serve(backend.as_ref(), &endpoints, request).await;
                    if reply.send(result).is_err() {
                        debug!("[fetcher] Caller went away before the reply");
                    }
                });
            }
            debug!("[fetcher] Request channel closed, task exiting");
        });
        QuoteFetcher { tx }
    }

    pub async fn request(&self, request: FetchRequest) -> EngineResult<FetchResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| EngineError::Transport("fetcher task is not running".into()))?;
        rx.await
            .map_err(|_| EngineError::Transport("fetcher dropped the request".into()))?
    }
}

#[async_trait]
impl QuoteService for QuoteFetcher {
    async fn fetch_quote(&self, params: &QuoteParams) -> EngineResult<Value> {
        match self.request(FetchRequest::Quote(params.clone())).await? {
            FetchResponse::Quote(body) => Ok(body),
            other => Err(EngineError::Transport(format!("unexpected fetcher reply: {:?}", other))),
        }
    }
}

#[async_trait]
impl TwapScheduler for QuoteFetcher {
    async fn register(&self, job: &TwapJob) -> EngineResult<TwapRegistration> {
        match self.request(FetchRequest::RegisterTwap(job.clone())).await? {
            FetchResponse::TwapRegistered(reg) => Ok(reg),
            other => Err(EngineError::Transport(format!("unexpected fetcher reply: {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::ErrorKind;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every URL and answers from a fixed reply.
    struct CannedBackend {
        reply: HttpReply,
        seen: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl CannedBackend {
        fn new(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self { reply: HttpReply { status, body }, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl FetchBackend for CannedBackend {
        async fn get_json(&self, url: &Url) -> EngineResult<HttpReply> {
            self.seen.lock().push((url.to_string(), None));
            Ok(self.reply.clone())
        }

        async fn post_json(&self, url: &Url, body: &Value) -> EngineResult<HttpReply> {
            self.seen.lock().push((url.to_string(), Some(body.clone())));
            Ok(self.reply.clone())
        }
    }

    fn endpoints(scheduler: Option<&str>) -> FetchEndpoints {
        FetchEndpoints {
            quote: Url::parse("https://quote.example/v4/swap").unwrap(),
            twap_scheduler: scheduler.map(|s| Url::parse(s).unwrap()),
        }
    }

    fn params() -> QuoteParams {
        QuoteParams { input_mint: "A".into(), output_mint: "B".into(), amount: 10, slippage_bps: 300 }
    }

    fn job() -> TwapJob {
        TwapJob {
            input_mint: "A".into(),
            output_mint: "B".into(),
            total_amount: 10.0,
            chunk_size: 1.0,
            interval_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn quote_goes_through_channel() {
        let backend = CannedBackend::new(200, json!({ "swapTransaction": "AA==" }));
        let fetcher = QuoteFetcher::spawn(backend.clone(), endpoints(None));
        let body = fetcher.fetch_quote(&params()).await.unwrap();
        assert_eq!(body["swapTransaction"], "AA==");
        let seen = backend.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("slippageBps=300"));
    }

    #[tokio::test]
    async fn quote_http_error_is_transport() {
        let backend = CannedBackend::new(502, json!("bad gateway"));
        let err = serve(backend.as_ref(), &endpoints(None), FetchRequest::Quote(params())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn twap_rejection_is_surfaced_not_raised() {
        let backend = CannedBackend::new(400, json!({ "error": "interval too short" }));
        let fetcher = QuoteFetcher::spawn(backend.clone(), endpoints(Some("https://sched.example")));
        let reg = fetcher.register(&job()).await.unwrap();
        assert!(!reg.accepted);
        assert_eq!(reg.body["error"], "interval too short");

        let seen = backend.seen.lock();
        assert_eq!(seen[0].0, "https://sched.example/register-job");
        let sent = seen[0].1.as_ref().unwrap();
        assert_eq!(sent["chunkSize"], 1.0);
        assert_eq!(sent["intervalMs"], 60_000);
    }

    #[tokio::test]
    async fn twap_without_scheduler_is_config_error() {
        let backend = CannedBackend::new(200, json!({}));
        let err = serve(backend.as_ref(), &endpoints(None), FetchRequest::RegisterTwap(job())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(backend.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn invalid_job_never_leaves_the_process() {
        let backend = CannedBackend::new(200, json!({}));
        let bad = TwapJob { interval_ms: 0, ..job() };
        let err = serve(backend.as_ref(), &endpoints(Some("https://sched.example")), FetchRequest::RegisterTwap(bad))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(backend.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn reqwest_backend_surfaces_connection_failure() {
        let backend = ReqwestBackend::new(Duration::from_secs(2)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/quote").unwrap();
        let err = backend.get_json(&url).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Transport | ErrorKind::TransportTimeout));
    }
}
