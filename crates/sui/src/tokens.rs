use crate::address::normalize_coin_type;

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Decimals assumed for coin types missing from the registry
pub const DEFAULT_DECIMALS: u8 = 9;

/// Display metadata and USD price for a coin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub coin_type: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Unit price in US cents
    pub price_cents: u64,
}

struct KnownToken {
    coin_type: &'static str,
    symbol: &'static str,
    name: &'static str,
    decimals: u8,
    price_cents: u64,
}

const KNOWN_TOKENS: &[KnownToken] = &[
    KnownToken {
        coin_type: SUI_COIN_TYPE,
        symbol: "SUI",
        name: "Sui",
        decimals: 9,
        price_cents: 245,
    },
    KnownToken {
        coin_type: "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC",
        symbol: "USDC",
        name: "USD Coin",
        decimals: 6,
        price_cents: 100,
    },
    KnownToken {
        coin_type: "0xc060006111016b8a020ad5b33834984a437aaa7d3c74c18e09a95d48aceab08c::coin::COIN",
        symbol: "USDT",
        name: "Tether USD",
        decimals: 6,
        price_cents: 100,
    },
    KnownToken {
        coin_type: "0xaf8cd5edc19c4512f4259f0bee101a40d41ebed738ade5874359610ef8eeced5::coin::COIN",
        symbol: "WETH",
        name: "Wrapped Ether",
        decimals: 8,
        price_cents: 350_000,
    },
];

impl From<&KnownToken> for TokenInfo {
    fn from(token: &KnownToken) -> Self {
        Self {
            coin_type: token.coin_type.to_string(),
            symbol: token.symbol.to_string(),
            name: token.name.to_string(),
            decimals: token.decimals,
            price_cents: token.price_cents,
        }
    }
}

pub fn lookup(coin_type: &str) -> Option<TokenInfo> {
    let normalized = normalize_coin_type(coin_type);
    KNOWN_TOKENS
        .iter()
        .find(|t| normalize_coin_type(t.coin_type) == normalized)
        .map(TokenInfo::from)
}

pub fn lookup_symbol(symbol: &str) -> Option<TokenInfo> {
    KNOWN_TOKENS
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
        .map(TokenInfo::from)
}

/// Registry entry, or a placeholder named after the last type segment with no price.
pub fn info_for(coin_type: &str) -> TokenInfo {
    lookup(coin_type).unwrap_or_else(|| {
        let symbol = coin_type.rsplit("::").next().unwrap_or(coin_type).to_string();
        TokenInfo {
            coin_type: coin_type.to_string(),
            name: symbol.clone(),
            symbol,
            decimals: DEFAULT_DECIMALS,
            price_cents: 0,
        }
    })
}

/// Largest decimals for which one whole unit fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// Saturates past [`MAX_DECIMALS`].
pub(crate) fn pow10(exp: u32) -> u128 {
    10u128.checked_pow(exp).unwrap_or(u128::MAX)
}

/// Human value of `raw` base units with exactly `dp` decimals, truncated.
pub fn format_units(raw: u128, decimals: u8, dp: u32) -> String {
    let scale = pow10(decimals as u32);
    let whole = raw / scale;
    let frac = raw % scale;
    if dp == 0 {
        return whole.to_string();
    }
    let frac = if dp >= decimals as u32 {
        frac.saturating_mul(pow10(dp - decimals as u32))
    } else {
        frac / pow10(decimals as u32 - dp)
    };
    format!("{}.{:0width$}", whole, frac, width = dp as usize)
}

/// Human value of `raw` without trailing zeros.
pub fn format_amount(raw: u128, decimals: u8) -> String {
    let full = format_units(raw, decimals, decimals as u32);
    if full.contains('.') {
        full.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        full
    }
}

/// USD value of `raw` base units in cents, rounded half up.
pub fn usd_cents(raw: u128, decimals: u8, price_cents: u64) -> u128 {
    let scale = pow10(decimals as u32);
    raw.saturating_mul(price_cents as u128).saturating_add(scale / 2) / scale
}

pub fn format_cents(cents: u128) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Parse a human amount like "1.25" into base units.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u128, String> {
    if decimals > MAX_DECIMALS {
        return Err(format!("coins with {} decimals are not supported", decimals));
    }
    let amount = amount.trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err("amount is empty".to_string());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("'{}' is not a number", amount));
    }
    if frac.len() > decimals as usize {
        return Err(format!("at most {} decimal places are supported", decimals));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("'{}' is too large", amount))?
    };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>()
            .ok()
            .and_then(|f| f.checked_mul(pow10(decimals as u32 - frac.len() as u32)))
            .ok_or_else(|| format!("'{}' is too large", amount))?
    };

    let raw = whole
        .checked_mul(pow10(decimals as u32))
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(|| format!("'{}' is too large", amount))?;
    if raw == 0 {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_accepts_long_and_short_forms() {
        assert_eq!(lookup("0x2::sui::SUI").unwrap().symbol, "SUI");
        assert_eq!(
            lookup("0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI")
                .unwrap()
                .decimals,
            9
        );
        assert_eq!(lookup_symbol("usdc").unwrap().decimals, 6);
    }

    #[test]
    fn test_unknown_placeholder() {
        let info = info_for("0xabc::meme::MEME");
        assert_eq!(info.symbol, "MEME");
        assert_eq!(info.name, "MEME");
        assert_eq!(info.decimals, DEFAULT_DECIMALS);
        assert_eq!(info.price_cents, 0);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_000_000_000, 9, 6), "1.000000");
        assert_eq!(format_units(1_234_567_891, 9, 6), "1.234567");
        assert_eq!(format_units(5, 0, 6), "5.000000");
        assert_eq!(format_units(1_500_000, 6, 2), "1.50");
        assert_eq!(format_amount(1_500_000_000, 9), "1.5");
        assert_eq!(format_amount(2_000_000_000, 9), "2");
    }

    #[test]
    fn test_usd_value() {
        assert_eq!(usd_cents(1_000_000_000, 9, 245), 245);
        assert_eq!(format_cents(usd_cents(1_000_000_000, 9, 245)), "2.45");
        assert_eq!(format_cents(usd_cents(500_000, 6, 100)), "0.50");
        assert_eq!(format_cents(usd_cents(1, 9, 245)), "0.00");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1", 9).unwrap(), 1_000_000_000);
        assert_eq!(parse_units("0.5", 9).unwrap(), 500_000_000);
        assert_eq!(parse_units(".25", 6).unwrap(), 250_000);
        assert!(parse_units("0", 9).is_err());
        assert!(parse_units("1.0000001", 6).is_err());
        assert!(parse_units("-1", 9).is_err());
        assert!(parse_units("abc", 9).is_err());
        assert!(parse_units("", 9).is_err());
    }

    #[test]
    fn test_oversized_decimals_are_rejected_not_overflowed() {
        assert_eq!(parse_units("1", MAX_DECIMALS).unwrap(), 10u128.pow(38));
        let err = parse_units("1", 39).unwrap_err();
        assert!(err.contains("39 decimals"));
        assert!(parse_units("0.5", 255).is_err());
        assert!(parse_units("4", MAX_DECIMALS).is_err());

        assert_eq!(format_units(5, 200, 6), "0.000000");
        assert_eq!(usd_cents(1, 200, 245), 0);
    }
}
