// Sol TWAP Swap: Helpers
// resolve_token, amount_to_base_units, base_units_to_amount, slippage_to_bps,
// TradingPair / TradeSide

use crate::atoms::constants::{BPS_PER_UNIT, KNOWN_TOKENS, PUBKEY_LEN};
use crate::atoms::error::{EngineError, EngineResult};

// ── Tokens ────────────────────────────────────────────────────────────

/// Resolve a token symbol or mint address to (mint_address, decimals).
/// Raw mint addresses resolve with `None` decimals; the caller must declare them.
pub fn resolve_token(sym_or_addr: &str) -> EngineResult<(String, Option<u8>)> {
    let trimmed = sym_or_addr.trim();
    let upper = trimmed.to_uppercase();

    for (sym, addr, dec) in KNOWN_TOKENS {
        if upper == *sym || trimmed == *addr {
            return Ok((addr.to_string(), Some(*dec)));
        }
    }

    if is_mint_address(trimmed) {
        return Ok((trimmed.to_string(), None));
    }

    Err(EngineError::InvalidInput(format!(
        "Unknown Solana token: '{}'. Use a mint address or known symbol: {}",
        sym_or_addr,
        KNOWN_TOKENS.iter().map(|(s, _, _)| *s).collect::<Vec<_>>().join(", ")
    )))
}

/// Base58 string that decodes to a 32-byte public key.
pub fn is_mint_address(s: &str) -> bool {
    (32..=44).contains(&s.len())
        && bs58::decode(s).into_vec().map(|b| b.len() == PUBKEY_LEN).unwrap_or(false)
}

// ── Amounts ───────────────────────────────────────────────────────────

/// Parse a UI amount ("1.5") into integer base units with exact decimal
/// scaling. Rejects signs, exponents, excess precision and overflow.
pub fn amount_to_base_units(amount_ui: &str, decimals: u8) -> EngineResult<u64> {
    let s = amount_ui.trim();
    let (whole_str, frac_str) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(EngineError::InvalidInput(format!("Invalid amount: '{}'", amount_ui)));
    }
    if !whole_str.bytes().all(|b| b.is_ascii_digit()) || !frac_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::InvalidInput(format!("Invalid amount: '{}'", amount_ui)));
    }
    if frac_str.len() > decimals as usize {
        return Err(EngineError::InvalidInput(format!(
            "Too many decimal places in '{}' (max {})",
            amount_ui, decimals
        )));
    }

    let overflow = || EngineError::InvalidInput(format!("Amount '{}' is too large", amount_ui));
    let scale = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let whole: u64 = if whole_str.is_empty() { 0 } else { whole_str.parse().map_err(|_| overflow())? };
    let frac: u64 = if frac_str.is_empty() { 0 } else { frac_str.parse().map_err(|_| overflow())? };
    let frac_scale = 10u64.pow(decimals as u32 - frac_str.len() as u32);

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac * frac_scale))
        .ok_or_else(overflow)
}

/// Format base units back to a UI amount, trimming trailing zeros.
pub fn base_units_to_amount(units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return units.to_string();
    }
    let divisor = 10u128.pow(decimals as u32);
    let whole = units as u128 / divisor;
    let frac = units as u128 % divisor;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

// ── Slippage ──────────────────────────────────────────────────────────

/// `floor(slippage * 10000)`. Callers validate the [0, 1) range first.
pub fn slippage_to_bps(slippage: f64) -> u16 {
    (slippage * BPS_PER_UNIT).floor().clamp(0.0, u16::MAX as f64) as u16
}

// ── Trading pair ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::str::FromStr for TradeSide {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(EngineError::InvalidInput(format!("Unknown trade side: '{}'", other))),
        }
    }
}

/// Market pair. Buying spends `quote` to get `base`; selling does the reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self { base: base.into(), quote: quote.into() }
    }

    /// (input, output) for the given side.
    pub fn legs(&self, side: TradeSide) -> (&str, &str) {
        match side {
            TradeSide::Buy => (&self.quote, &self.base),
            TradeSide::Sell => (&self.base, &self.quote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_resolve_case_insensitively() {
        let (mint, dec) = resolve_token("usdc").unwrap();
        assert_eq!(mint, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert_eq!(dec, Some(6));
        assert_eq!(resolve_token(" SOL ").unwrap().1, Some(9));
    }

    #[test]
    fn known_mint_address_keeps_decimals() {
        let (_, dec) = resolve_token("So11111111111111111111111111111111111111112").unwrap();
        assert_eq!(dec, Some(9));
    }

    #[test]
    fn unknown_mint_has_no_decimals() {
        let (mint, dec) = resolve_token("11111111111111111111111111111111").unwrap();
        assert_eq!(mint, "11111111111111111111111111111111");
        assert_eq!(dec, None);
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let err = resolve_token("NOTATOKEN").unwrap_err();
        assert!(err.to_string().contains("USDC"));
    }

    #[test]
    fn amounts_scale_exactly() {
        assert_eq!(amount_to_base_units("1", 9).unwrap(), 1_000_000_000);
        assert_eq!(amount_to_base_units("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(amount_to_base_units("0.000001", 6).unwrap(), 1);
        assert_eq!(amount_to_base_units(".25", 2).unwrap(), 25);
        assert_eq!(amount_to_base_units("3.", 2).unwrap(), 300);
        assert_eq!(amount_to_base_units("0.1", 9).unwrap(), 100_000_000);
    }

    #[test]
    fn bad_amounts_are_rejected() {
        for bad in ["", ".", "-1", "+1", "1e9", "abc", "1.2.3", "1,5"] {
            assert!(amount_to_base_units(bad, 9).is_err(), "accepted {:?}", bad);
        }
        assert!(amount_to_base_units("1.1234567", 6).is_err());
        assert!(amount_to_base_units("18446744073709551616", 0).is_err());
        assert!(amount_to_base_units("20000000000", 9).is_err());
    }

    #[test]
    fn base_units_format_back() {
        assert_eq!(base_units_to_amount(1_500_000, 6), "1.5");
        assert_eq!(base_units_to_amount(1_000_000_000, 9), "1");
        assert_eq!(base_units_to_amount(1, 6), "0.000001");
        assert_eq!(base_units_to_amount(42, 0), "42");
    }

    #[test]
    fn slippage_floors_to_bps() {
        assert_eq!(slippage_to_bps(0.03), 300);
        assert_eq!(slippage_to_bps(0.005), 50);
        assert_eq!(slippage_to_bps(0.00015), 1);
        assert_eq!(slippage_to_bps(0.0), 0);
    }

    #[test]
    fn pair_legs_follow_side() {
        let pair = TradingPair::new("SOL", "USDC");
        assert_eq!(pair.legs(TradeSide::Buy), ("USDC", "SOL"));
        assert_eq!(pair.legs(TradeSide::Sell), ("SOL", "USDC"));
        assert_eq!("Sell".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert!("hold".parse::<TradeSide>().is_err());
    }
}
