use crate::address::normalize_address;
use crate::error::ChainError;
use crate::network::Network;
use crate::rpc::{MAX_PAGES, Page, RpcClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCoin {
    pub coin_type: String,
    pub coin_object_id: String,
    pub version: String,
    pub digest: String,
    pub balance: String,
}

#[derive(Debug, Deserialize)]
struct SystemState {
    epoch: String,
}

#[derive(Debug, Deserialize)]
struct CoinMetadata {
    decimals: u8,
}

/// Outcome of `sui_executeTransactionBlock`.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub digest: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Source of the chain's current epoch.
#[async_trait]
pub trait EpochSource: Send + Sync {
    async fn current_epoch(&self) -> Result<u64, ChainError>;
}

/// Read and submit access to one full node.
#[derive(Debug, Clone)]
pub struct ChainClient {
    rpc: RpcClient,
}

impl ChainClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
        }
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(network.rpc_url())
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn reference_gas_price(&self) -> Result<u64, ChainError> {
        let price: Value = self.rpc.request("suix_getReferenceGasPrice", json!([])).await?;
        let price = parse_u64(&price).ok_or_else(|| ChainError::Decode {
            method: "suix_getReferenceGasPrice".to_string(),
            reason: format!("not an integer: {}", price),
        })?;
        debug!("Using reference gas price: {}", price);
        Ok(price)
    }

    /// Every coin object owned by `owner`, across all pages.
    pub async fn all_coins(&self, owner: &str) -> Result<Vec<RpcCoin>, ChainError> {
        let owner = normalize_address(owner)?;
        self.paginate("suix_getAllCoins", |cursor| json!([owner, cursor, null])).await
    }

    /// Coin objects of one type owned by `owner`.
    pub async fn coins(&self, owner: &str, coin_type: &str) -> Result<Vec<RpcCoin>, ChainError> {
        let owner = normalize_address(owner)?;
        self.paginate("suix_getCoins", |cursor| json!([owner, coin_type, cursor, null])).await
    }

    /// Decimals from on-chain coin metadata, if the type publishes any.
    pub async fn coin_decimals(&self, coin_type: &str) -> Result<Option<u8>, ChainError> {
        let metadata: Option<CoinMetadata> = self.rpc.request("suix_getCoinMetadata", json!([coin_type])).await?;
        Ok(metadata.map(|m| m.decimals))
    }

    pub async fn query_transactions(&self, filter: Value, limit: usize) -> Result<Vec<Value>, ChainError> {
        let query = json!({
            "filter": filter,
            "options": {
                "showInput": true,
                "showEffects": true,
                "showBalanceChanges": true
            }
        });
        let page: Page<Value> = self
            .rpc
            .request("suix_queryTransactionBlocks", json!([query, null, limit, true]))
            .await?;
        Ok(page.data)
    }

    /// Submit signed transaction bytes (both base64).
    pub async fn execute(&self, tx_bytes: &str, signatures: Vec<String>) -> Result<ExecutionResult, ChainError> {
        let method = "sui_executeTransactionBlock";
        let response: Value = self
            .rpc
            .request(
                method,
                json!([tx_bytes, signatures, { "showEffects": true }, "WaitForLocalExecution"]),
            )
            .await?;

        let digest = response["digest"]
            .as_str()
            .ok_or_else(|| ChainError::Decode {
                method: method.to_string(),
                reason: "missing digest".to_string(),
            })?
            .to_string();
        let status = &response["effects"]["status"];
        let success = status["status"].as_str().map(|s| s == "success").unwrap_or(true);
        let error = status["error"].as_str().map(str::to_string);

        info!("Transaction {} executed (success: {})", digest, success);
        Ok(ExecutionResult { digest, success, error })
    }

    async fn paginate<F>(&self, method: &str, params: F) -> Result<Vec<RpcCoin>, ChainError>
    where
        F: Fn(Value) -> Value,
    {
        let mut coins = Vec::new();
        let mut cursor = Value::Null;
        for _ in 0..MAX_PAGES {
            let page: Page<RpcCoin> = self.rpc.request(method, params(cursor.clone())).await?;
            coins.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page && !next.is_null() => cursor = next,
                _ => return Ok(coins),
            }
        }
        debug!("{} stopped after {} pages", method, MAX_PAGES);
        Ok(coins)
    }
}

#[async_trait]
impl EpochSource for ChainClient {
    async fn current_epoch(&self) -> Result<u64, ChainError> {
        let method = "suix_getLatestSuiSystemState";
        let state: SystemState = self.rpc.request(method, json!([])).await?;
        state.epoch.parse().map_err(|_| ChainError::Decode {
            method: method.to_string(),
            reason: format!("epoch is not an integer: {}", state.epoch),
        })
    }
}

/// JSON-RPC encodes big integers as strings; accept both forms.
pub(crate) fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub(crate) fn parse_i128(value: &Value) -> Option<i128> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64().map(i128::from),
        _ => None,
    }
}
