use crate::address::normalize_coin_type;
use crate::chain::{ChainClient, RpcCoin};
use crate::error::ChainError;
use crate::tokens::{format_cents, format_units, info_for, usd_cents};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Decimal places shown for balances
const BALANCE_DP: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub name: String,
    pub balance: String,
    pub usd_value: String,
    pub price: String,
    pub coin_type: String,
    #[serde(skip)]
    pub raw_balance: u128,
    #[serde(skip)]
    usd_cents: u128,
}

/// Sum coin objects per type and price them, most valuable first.
pub fn aggregate_balances(coins: &[RpcCoin]) -> Vec<TokenBalance> {
    let mut totals: BTreeMap<String, (String, u128)> = BTreeMap::new();
    for coin in coins {
        let amount: u128 = match coin.balance.parse() {
            Ok(amount) => amount,
            Err(_) => {
                debug!("Skipping coin {} with balance {}", coin.coin_object_id, coin.balance);
                continue;
            }
        };
        let entry = totals
            .entry(normalize_coin_type(&coin.coin_type))
            .or_insert_with(|| (coin.coin_type.clone(), 0));
        entry.1 = entry.1.saturating_add(amount);
    }

    let mut balances: Vec<TokenBalance> = totals
        .into_values()
        .map(|(coin_type, raw)| {
            let info = info_for(&coin_type);
            let cents = usd_cents(raw, info.decimals, info.price_cents);
            TokenBalance {
                symbol: info.symbol,
                name: info.name,
                balance: format_units(raw, info.decimals, BALANCE_DP),
                usd_value: format_cents(cents),
                price: format_cents(info.price_cents as u128),
                coin_type,
                raw_balance: raw,
                usd_cents: cents,
            }
        })
        .collect();

    balances.sort_by(|a, b| b.usd_cents.cmp(&a.usd_cents));
    balances
}

impl ChainClient {
    /// Token balances held at `address`. An empty list means no holdings.
    pub async fn fetch_balances(&self, address: &str) -> Result<Vec<TokenBalance>, ChainError> {
        let coins = self.all_coins(address).await.inspect_err(|e| {
            error!("Failed to fetch balances: {}", e);
        })?;
        Ok(aggregate_balances(&coins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(coin_type: &str, balance: &str) -> RpcCoin {
        RpcCoin {
            coin_type: coin_type.to_string(),
            coin_object_id: "0x1".to_string(),
            version: "1".to_string(),
            digest: "11111111111111111111111111111111".to_string(),
            balance: balance.to_string(),
        }
    }

    #[test]
    fn test_one_sui() {
        let balances = aggregate_balances(&[coin("0x2::sui::SUI", "1000000000")]);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].symbol, "SUI");
        assert_eq!(balances[0].balance, "1.000000");
        assert_eq!(balances[0].usd_value, "2.45");
        assert_eq!(balances[0].price, "2.45");
    }

    #[test]
    fn test_aggregates_and_sorts() {
        let usdc = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
        let balances = aggregate_balances(&[
            coin("0x2::sui::SUI", "500000000"),
            coin("0xabc::meme::MEME", "999999999999"),
            coin(usdc, "10000000"),
            coin("0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI", "500000000"),
        ]);

        let symbols: Vec<&str> = balances.iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "SUI", "MEME"]);
        assert_eq!(balances[0].usd_value, "10.00");
        assert_eq!(balances[1].balance, "1.000000");
        assert_eq!(balances[2].usd_value, "0.00");
        assert_eq!(balances[2].name, "MEME");
    }

    #[test]
    fn test_empty() {
        assert!(aggregate_balances(&[]).is_empty());
    }
}
