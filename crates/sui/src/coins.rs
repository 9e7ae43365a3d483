use crate::chain::{ChainClient, RpcCoin};
use crate::error::{ChainError, TransferError};
use std::str::FromStr;
use sui_sdk_types as sui;
use sui_transaction_builder::unresolved;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CoinInfo {
    pub object_ref: sui::ObjectReference,
    pub balance: u64,
}

impl CoinInfo {
    pub fn object_id(&self) -> sui::Address {
        *self.object_ref.object_id()
    }

    pub fn as_input(&self) -> unresolved::Input {
        unresolved::Input::owned(
            *self.object_ref.object_id(),
            self.object_ref.version(),
            *self.object_ref.digest(),
        )
    }
}

impl TryFrom<&RpcCoin> for CoinInfo {
    type Error = ChainError;

    fn try_from(coin: &RpcCoin) -> Result<Self, Self::Error> {
        let decode = |reason: String| ChainError::Decode {
            method: "suix_getCoins".to_string(),
            reason,
        };
        let id = sui::Address::from_str(&coin.coin_object_id)
            .map_err(|e| decode(format!("bad object id {}: {}", coin.coin_object_id, e)))?;
        let version: u64 = coin
            .version
            .parse()
            .map_err(|_| decode(format!("bad version {}", coin.version)))?;
        let digest = sui::Digest::from_str(&coin.digest)
            .map_err(|e| decode(format!("bad digest {}: {}", coin.digest, e)))?;
        let balance: u64 = coin
            .balance
            .parse()
            .map_err(|_| decode(format!("bad balance {}", coin.balance)))?;

        Ok(Self {
            object_ref: sui::ObjectReference::new(id, version, digest),
            balance,
        })
    }
}

/// Largest-first selection of coins whose total covers `target`.
pub fn select_coins(coins: &[CoinInfo], target: u128, coin_type: &str) -> Result<Vec<CoinInfo>, TransferError> {
    let mut sorted = coins.to_vec();
    sorted.sort_by(|a, b| b.balance.cmp(&a.balance));

    let mut selected = Vec::new();
    let mut total: u128 = 0;
    for coin in sorted {
        if total >= target {
            break;
        }
        total += coin.balance as u128;
        selected.push(coin);
    }

    if total < target {
        return Err(TransferError::InsufficientBalance {
            coin_type: coin_type.to_string(),
            required: target,
            available: total,
        });
    }
    debug!("Selected {} {} coin(s) covering {}", selected.len(), coin_type, target);
    Ok(selected)
}

impl ChainClient {
    pub async fn owned_coins(&self, owner: &str, coin_type: &str) -> Result<Vec<CoinInfo>, ChainError> {
        self.coins(owner, coin_type)
            .await?
            .iter()
            .map(CoinInfo::try_from)
            .collect()
    }
}
