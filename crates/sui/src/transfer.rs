use crate::address::{normalize_coin_type, parse_address};
use crate::chain::{ChainClient, EpochSource};
use crate::coins::select_coins;
use crate::error::TransferError;
use crate::tokens::{SUI_COIN_TYPE, format_amount, format_cents, lookup, lookup_symbol, parse_units, pow10, usd_cents};
use base64::{Engine as _, engine::general_purpose};
use session::Session;
use sui_sdk_types as sui;
use sui_transaction_builder::{Serialized, TransactionBuilder};
use tracing::{debug, info, warn};
use zklogin::{EphemeralKeyPair, zklogin_signature_base64};

pub const GAS_BUDGET: u64 = 10_000_000;

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub recipient: String,
    /// Human amount, e.g. "1.5"
    pub amount: String,
    /// Defaults to SUI
    pub coin_type: Option<String>,
}

impl TransferRequest {
    pub fn coin_type(&self) -> &str {
        self.coin_type.as_deref().unwrap_or(SUI_COIN_TYPE)
    }
}

/// Refuse to sign once the proof's epoch bound has passed.
pub async fn ensure_session_active(epochs: &dyn EpochSource, session: &Session) -> Result<u64, TransferError> {
    let current_epoch = epochs.current_epoch().await?;
    if current_epoch > session.max_epoch {
        warn!(
            "Session expired: current epoch {} > max epoch {}",
            current_epoch, session.max_epoch
        );
        return Err(TransferError::SessionExpired {
            max_epoch: session.max_epoch,
            current_epoch,
        });
    }
    Ok(current_epoch)
}

async fn decimals_for(client: &ChainClient, coin_type: &str) -> Result<u8, TransferError> {
    if let Some(info) = lookup(coin_type) {
        return Ok(info.decimals);
    }
    client
        .coin_decimals(coin_type)
        .await?
        .ok_or_else(|| TransferError::UnknownToken(coin_type.to_string()))
}

/// Programmable transaction moving `request.amount` of the coin type to the recipient.
pub async fn build_transfer(
    client: &ChainClient,
    sender: &str,
    request: &TransferRequest,
) -> Result<sui::Transaction, TransferError> {
    let recipient =
        parse_address(&request.recipient).map_err(|_| TransferError::InvalidRecipient(request.recipient.clone()))?;
    let sender_address = parse_address(sender)?;
    let coin_type = request.coin_type();
    let is_sui = normalize_coin_type(coin_type) == normalize_coin_type(SUI_COIN_TYPE);

    let decimals = decimals_for(client, coin_type).await?;
    let amount = parse_units(&request.amount, decimals).map_err(TransferError::InvalidAmount)?;
    let amount_u64 =
        u64::try_from(amount).map_err(|_| TransferError::InvalidAmount(format!("{} is too large", request.amount)))?;

    let mut tb = TransactionBuilder::new();
    tb.set_sender(sender_address);
    tb.set_gas_budget(GAS_BUDGET);
    tb.set_gas_price(client.reference_gas_price().await?);

    let sui_coins = client.owned_coins(sender, SUI_COIN_TYPE).await?;
    let gas_target = if is_sui {
        amount + GAS_BUDGET as u128
    } else {
        GAS_BUDGET as u128
    };
    let gas_coins = select_coins(&sui_coins, gas_target, SUI_COIN_TYPE)?;
    tb.add_gas_objects(gas_coins.iter().map(|c| c.as_input()).collect::<Vec<_>>());
    debug!("Gas objects added: {}", gas_coins.len());

    let source = if is_sui {
        tb.gas()
    } else {
        let asset_coins = client.owned_coins(sender, coin_type).await?;
        let selected = select_coins(&asset_coins, amount, coin_type)?;
        let mut inputs = selected.iter().map(|c| tb.input(c.as_input())).collect::<Vec<_>>();
        if inputs.is_empty() {
            return Err(TransferError::Build("no coins selected".to_string()));
        }
        let primary = inputs.remove(0);
        if !inputs.is_empty() {
            tb.merge_coins(primary, inputs);
        }
        primary
    };

    let amount_arg = tb.input(Serialized(&amount_u64));
    let split = tb.split_coins(source, vec![amount_arg]);
    let coin = split
        .nested(0)
        .ok_or_else(|| TransferError::Build("split produced no coin".to_string()))?;
    let recipient_arg = tb.input(Serialized(&recipient));
    tb.transfer_objects(vec![coin], recipient_arg);

    tb.finish().map_err(|e| TransferError::Build(e.to_string()))
}

/// Build, sign with the session's ephemeral key and proof, and submit.
/// Returns the transaction digest.
pub async fn sign_and_submit(
    client: &ChainClient,
    session: &Session,
    sender: &str,
    request: &TransferRequest,
) -> Result<String, TransferError> {
    ensure_session_active(client, session).await?;

    let tx = build_transfer(client, sender, request).await?;
    let tx_bcs = bcs::to_bytes(&tx).map_err(|e| TransferError::Build(e.to_string()))?;

    let keypair = EphemeralKeyPair::from_sui_private_key(&session.ephemeral_key)?;
    let user_signature = keypair.sign_transaction(&tx_bcs);
    let signature = zklogin_signature_base64(&session.proof, session.max_epoch, &user_signature)?;

    let result = client
        .execute(&general_purpose::STANDARD.encode(&tx_bcs), vec![signature])
        .await?;
    if !result.success {
        return Err(TransferError::Rejected {
            digest: result.digest,
            reason: result.error.unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    info!("Sent {} {} to {}: {}", request.amount, request.coin_type(), request.recipient, result.digest);
    Ok(result.digest)
}

/// Indicative swap price from the local price table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub from_symbol: String,
    pub to_symbol: String,
    pub amount_in: String,
    pub amount_out: String,
    pub usd_value: String,
}

pub fn quote_swap(from_symbol: &str, to_symbol: &str, amount: &str) -> Result<SwapQuote, TransferError> {
    let from = lookup_symbol(from_symbol).ok_or_else(|| TransferError::UnknownToken(from_symbol.to_string()))?;
    let to = lookup_symbol(to_symbol).ok_or_else(|| TransferError::UnknownToken(to_symbol.to_string()))?;
    if to.price_cents == 0 {
        return Err(TransferError::UnknownToken(to_symbol.to_string()));
    }

    let raw_in = parse_units(amount, from.decimals).map_err(TransferError::InvalidAmount)?;
    let cents = usd_cents(raw_in, from.decimals, from.price_cents);
    let scale_in = pow10(from.decimals as u32);
    let scale_out = pow10(to.decimals as u32);
    let raw_out = raw_in
        .checked_mul(from.price_cents as u128)
        .and_then(|v| v.checked_mul(scale_out))
        .map(|v| v / (to.price_cents as u128 * scale_in))
        .ok_or_else(|| TransferError::InvalidAmount(format!("{} is too large", amount)))?;

    Ok(SwapQuote {
        from_symbol: from.symbol,
        to_symbol: to.symbol,
        amount_in: format_amount(raw_in, from.decimals),
        amount_out: format_amount(raw_out, to.decimals),
        usd_value: format_cents(cents),
    })
}

/// Swaps have no on-chain route yet.
pub async fn execute_swap(_client: &ChainClient, _session: &Session, quote: &SwapQuote) -> Result<String, TransferError> {
    warn!("Swap {} -> {} requested but not available", quote.from_symbol, quote.to_symbol);
    Err(TransferError::SwapUnavailable)
}
