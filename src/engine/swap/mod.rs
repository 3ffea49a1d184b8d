// Sol TWAP Engine: Swap Execution
//
// Module layout:
//   helpers        resolve_token, amount scaling, slippage_to_bps, TradingPair
//   intent         SwapIntent
//   transaction    wire-format UnsignedTransaction / SignedTransaction
//   rpc            LedgerNetwork trait + Solana JSON-RPC client
//   router         RoutingCapability trait + Jupiter embedded router
//   quote          QuoteService trait (REST quote path)
//   twap           TwapScheduler trait (remote job registration)
//   fetcher        QuoteFetcher: typed request channel over HTTP
//   resolver       RouteResolver: embedded first, REST second
//   builder        TransactionBuilder: route → unsigned tx
//   signer         embedded / external signers + SignerSelector
//   orchestrator   SwapOrchestrator state machine

pub mod builder;
pub mod fetcher;
pub mod helpers;
pub mod intent;
pub mod orchestrator;
pub mod quote;
pub mod resolver;
pub mod router;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod twap;

pub use builder::TransactionBuilder;
pub use fetcher::{FetchBackend, FetchEndpoints, FetchRequest, FetchResponse, HttpReply, QuoteFetcher, ReqwestBackend};
pub use helpers::{amount_to_base_units, base_units_to_amount, resolve_token, slippage_to_bps, TradeSide, TradingPair};
pub use intent::SwapIntent;
pub use orchestrator::{SwapOrchestrator, SwapTimeouts};
pub use quote::QuoteService;
pub use resolver::RouteResolver;
pub use router::{load_embedded_router, JupiterRouter, RoutingCapability};
pub use rpc::{LedgerNetwork, RpcClient};
pub use signer::{ExternalSignerProvider, KeySource, SignerSelector, TransactionSigner};
pub use transaction::{SignedTransaction, UnsignedTransaction};
pub use twap::TwapScheduler;
