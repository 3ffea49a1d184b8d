// Sol TWAP Swap: Transaction Builder
// Route → UnsignedTransaction with fee payer and a fresh blockhash.
//
// Order matters:
//   1. no fee payer → NoSignerAvailable, before any network call
//   2. extract the serialized transaction (rule depends on the route source)
//   3. assign the fee payer
//   4. fetch the blockhash last, right before signing

use log::info;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::router::RoutingCapability;
use super::rpc::LedgerNetwork;
use super::transaction::UnsignedTransaction;
use crate::atoms::constants::{PUBKEY_LEN, REST_TX_POINTERS, SDK_TX_FIELDS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{Route, RouteSource};

pub struct TransactionBuilder {
    embedded: Option<Arc<dyn RoutingCapability>>,
    network: Arc<dyn LedgerNetwork>,
    timeout: Duration,
}

impl TransactionBuilder {
    pub fn new(
        embedded: Option<Arc<dyn RoutingCapability>>,
        network: Arc<dyn LedgerNetwork>,
        timeout: Duration,
    ) -> Self {
        Self { embedded, network, timeout }
    }

    pub async fn build(&self, route: &Route, fee_payer: Option<[u8; PUBKEY_LEN]>) -> EngineResult<UnsignedTransaction> {
        let fee_payer = fee_payer.ok_or(EngineError::NoSignerAvailable)?;

        let encoded = match route.source() {
            RouteSource::Sdk => {
                let router = self.embedded.as_ref().ok_or_else(|| {
                    EngineError::Routing("SDK route given but no embedded router is loaded".into())
                })?;
                let hint = bs58::encode(fee_payer).into_string();
                let payload = self
                    .bounded("embedded swap build", router.build_transaction(route, Some(&hint)))
                    .await?;
                extract_sdk_transaction(&payload)?
            }
            RouteSource::Rest => extract_rest_transaction(route.payload())?,
        };

        let mut tx = UnsignedTransaction::from_base64(&encoded)?;
        tx.set_fee_payer(&fee_payer)?;

        let blockhash = self.bounded("getLatestBlockhash", self.network.latest_blockhash()).await?;
        tx.set_recent_blockhash(&blockhash);
        info!(
            "[swap] Built {} transaction ({} bytes, versioned={})",
            route.source(),
            tx.as_bytes().len(),
            tx.version().is_some()
        );
        Ok(tx)
    }

    async fn bounded<T>(&self, what: &str, fut: impl std::future::Future<Output = EngineResult<T>>) -> EngineResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| EngineError::TransportTimeout(format!("{} exceeded {}s", what, self.timeout.as_secs())))?
    }
}

/// Base64 transaction from the REST quote payload, trying each known shape.
pub fn extract_rest_transaction(payload: &Value) -> EngineResult<String> {
    REST_TX_POINTERS
        .iter()
        .find_map(|ptr| payload.pointer(ptr).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::MalformedRouteResponse(format!(
                "no serialized transaction at {}",
                REST_TX_POINTERS.join(" or ")
            ))
        })
}

/// Base64 transaction from the embedded router's build payload.
pub fn extract_sdk_transaction(payload: &Value) -> EngineResult<String> {
    SDK_TX_FIELDS
        .iter()
        .find_map(|field| payload.get(field).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::MalformedRouteResponse(format!(
                "embedded router returned no {}",
                SDK_TX_FIELDS.join(" / ")
            ))
        })
}
