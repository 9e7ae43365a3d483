use crate::error::ChainError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Upper bound on pages followed by paginated queries
pub const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// One page of a cursor-paginated JSON-RPC result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<Value>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Minimal Sui full-node JSON-RPC client.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        debug!("rpc {}", method);
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChainError::Status(response.status().as_u16()));
        }

        let mut data: Value = response.json().await?;

        if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
            let error: RpcErrorObject = serde_json::from_value(error.clone()).map_err(|e| ChainError::Decode {
                method: method.to_string(),
                reason: e.to_string(),
            })?;
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        let result = data
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| ChainError::Decode {
                method: method.to_string(),
                reason: "missing result".to_string(),
            })?;

        serde_json::from_value(result).map_err(|e| ChainError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}
