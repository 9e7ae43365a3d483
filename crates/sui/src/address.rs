use crate::error::ChainError;
use std::str::FromStr;
use sui_sdk_types as sui;

/// Lowercase, 0x-prefixed, zero-padded to 64 hex digits.
pub fn normalize_address(address: &str) -> Result<String, ChainError> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.is_empty() || hex_part.len() > 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }
    Ok(format!("0x{:0>64}", hex_part.to_lowercase()))
}

pub fn parse_address(address: &str) -> Result<sui::Address, ChainError> {
    let normalized = normalize_address(address)?;
    sui::Address::from_str(&normalized).map_err(|_| ChainError::InvalidAddress(address.to_string()))
}

/// Normalize the package address of a `0x..::module::Name` coin type.
pub fn normalize_coin_type(coin_type: &str) -> String {
    match coin_type.split_once("::") {
        Some((package, rest)) => match normalize_address(package) {
            Ok(package) => format!("{}::{}", package, rest),
            Err(_) => coin_type.to_string(),
        },
        None => coin_type.to_string(),
    }
}
