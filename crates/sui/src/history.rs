use crate::address::normalize_address;
use crate::chain::{ChainClient, parse_i128, parse_u64};
use crate::error::ChainError;
use crate::tokens::{SUI_COIN_TYPE, format_amount, info_for};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::error;

/// Most recent transactions returned by a history fetch
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub direction: Direction,
    pub amount: String,
    pub symbol: String,
    pub from: String,
    pub to: String,
    pub status: TxStatus,
    pub timestamp_ms: u64,
    pub digest: String,
    /// Gas paid, in SUI
    pub fee: String,
}

impl TransactionRecord {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

struct BalanceChange {
    owner: Option<String>,
    coin_type: String,
    amount: i128,
}

fn balance_changes(block: &Value) -> Vec<BalanceChange> {
    block["balanceChanges"]
        .as_array()
        .map(|changes| {
            changes
                .iter()
                .filter_map(|change| {
                    Some(BalanceChange {
                        owner: change["owner"]["AddressOwner"]
                            .as_str()
                            .and_then(|o| normalize_address(o).ok()),
                        coin_type: change["coinType"].as_str()?.to_string(),
                        amount: parse_i128(&change["amount"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn gas_fee(effects: &Value) -> u128 {
    let gas = &effects["gasUsed"];
    let cost = |key: &str| parse_u64(&gas[key]).unwrap_or(0) as i128;
    let total = cost("computationCost") + cost("storageCost") - cost("storageRebate");
    total.max(0) as u128
}

/// Interpret one `suix_queryTransactionBlocks` entry from the viewpoint of `owner`.
pub fn parse_transaction(block: &Value, owner: &str) -> Option<TransactionRecord> {
    let digest = block["digest"].as_str()?.to_string();
    let timestamp_ms = parse_u64(&block["timestampMs"]).unwrap_or(0);
    let sender = block["transaction"]["data"]["sender"]
        .as_str()
        .and_then(|s| normalize_address(s).ok())
        .unwrap_or_default();

    let effects = &block["effects"];
    let status = match effects["status"]["status"].as_str() {
        Some("success") => TxStatus::Completed,
        Some(_) => TxStatus::Failed,
        None => TxStatus::Pending,
    };

    let direction = if sender == owner { Direction::Sent } else { Direction::Received };
    let changes = balance_changes(block);

    // Prefer the counterparty's credit when sending and our own credit when receiving
    let credit = changes.iter().find(|c| {
        c.amount > 0
            && match direction {
                Direction::Sent => c.owner.as_deref() != Some(owner),
                Direction::Received => c.owner.as_deref() == Some(owner),
            }
    });

    let (amount, coin_type, to) = match credit {
        Some(change) => (
            change.amount as u128,
            change.coin_type.clone(),
            change.owner.clone().unwrap_or_default(),
        ),
        None => (0, SUI_COIN_TYPE.to_string(), owner.to_string()),
    };
    let info = info_for(&coin_type);

    Some(TransactionRecord {
        direction,
        amount: format_amount(amount, info.decimals),
        symbol: info.symbol,
        from: sender,
        to,
        status,
        timestamp_ms,
        digest,
        fee: format_amount(gas_fee(effects), 9),
    })
}

/// Union of sent and received lists, newest first, without duplicate digests.
pub fn merge_history(sent: Vec<TransactionRecord>, received: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<TransactionRecord> = sent
        .into_iter()
        .chain(received)
        .filter(|tx| seen.insert(tx.digest.clone()))
        .collect();
    merged.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    merged.truncate(HISTORY_LIMIT);
    merged
}

impl ChainClient {
    /// Recent transactions sent from or received at `address`.
    pub async fn fetch_transactions(&self, address: &str) -> Result<Vec<TransactionRecord>, ChainError> {
        let owner = normalize_address(address)?;

        let (sent, received) = tokio::try_join!(
            self.query_transactions(json!({ "FromAddress": owner }), HISTORY_LIMIT),
            self.query_transactions(json!({ "ToAddress": owner }), HISTORY_LIMIT),
        )
        .inspect_err(|e| error!("Failed to fetch transactions: {}", e))?;

        let parse = |blocks: Vec<Value>| -> Vec<TransactionRecord> {
            blocks.iter().filter_map(|b| parse_transaction(b, &owner)).collect()
        };
        Ok(merge_history(parse(sent), parse(received)))
    }
}
