// Sol TWAP Swap: Swap Intent
// One user request: input mint, output mint, UI amount, slippage tolerance.
// Validated once at construction; immutable afterwards.

use super::helpers::{amount_to_base_units, resolve_token, slippage_to_bps};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::QuoteParams;

#[derive(Debug, Clone, PartialEq)]
pub struct SwapIntent {
    input_mint: String,
    output_mint: String,
    amount_ui: String,
    decimals: u8,
    amount_base_units: u64,
    slippage: f64,
}

impl SwapIntent {
    /// `decimals` is the declared exponent used to scale `amount_ui` to base units.
    pub fn new(
        input_mint: impl Into<String>,
        output_mint: impl Into<String>,
        amount_ui: &str,
        decimals: u8,
        slippage: f64,
    ) -> EngineResult<Self> {
        let input_mint = input_mint.into().trim().to_string();
        let output_mint = output_mint.into().trim().to_string();
        if input_mint.is_empty() || output_mint.is_empty() {
            return Err(EngineError::InvalidInput("input and output mints are required".into()));
        }
        if input_mint == output_mint {
            return Err(EngineError::InvalidInput("input and output mints must differ".into()));
        }
        if !(slippage.is_finite() && (0.0..1.0).contains(&slippage)) {
            return Err(EngineError::InvalidInput(format!(
                "slippage must be a fraction in [0, 1), got {}",
                slippage
            )));
        }
        let amount_base_units = amount_to_base_units(amount_ui, decimals)?;
        if amount_base_units == 0 {
            return Err(EngineError::InvalidInput("amount must be greater than zero".into()));
        }
        Ok(Self {
            input_mint,
            output_mint,
            amount_ui: amount_ui.trim().to_string(),
            decimals,
            amount_base_units,
            slippage,
        })
    }

    /// Build from symbols or mints. Decimals come from the known-token table
    /// for the input side unless `decimals` overrides them.
    pub fn for_tokens(
        input: &str,
        output: &str,
        amount_ui: &str,
        slippage: f64,
        decimals: Option<u8>,
    ) -> EngineResult<Self> {
        let (input_mint, known_decimals) = resolve_token(input)?;
        let (output_mint, _) = resolve_token(output)?;
        let decimals = decimals.or(known_decimals).ok_or_else(|| {
            EngineError::InvalidInput(format!("decimals for '{}' are unknown; declare them explicitly", input))
        })?;
        Self::new(input_mint, output_mint, amount_ui, decimals, slippage)
    }

    pub fn input_mint(&self) -> &str {
        &self.input_mint
    }

    pub fn output_mint(&self) -> &str {
        &self.output_mint
    }

    pub fn amount_ui(&self) -> &str {
        &self.amount_ui
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn amount_base_units(&self) -> u64 {
        self.amount_base_units
    }

    pub fn slippage(&self) -> f64 {
        self.slippage
    }

    pub fn slippage_bps(&self) -> u16 {
        slippage_to_bps(self.slippage)
    }

    /// Wire parameters shared by both resolver paths.
    pub fn quote_params(&self) -> QuoteParams {
        QuoteParams {
            input_mint: self.input_mint.clone(),
            output_mint: self.output_mint.clone(),
            amount: self.amount_base_units,
            slippage_bps: self.slippage_bps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::ErrorKind;

    #[test]
    fn sol_to_usdc_intent() {
        let intent = SwapIntent::for_tokens("SOL", "USDC", "1", 0.03, None).unwrap();
        let params = intent.quote_params();
        assert_eq!(params.input_mint, "So11111111111111111111111111111111111111112");
        assert_eq!(params.amount, 1_000_000_000);
        assert_eq!(params.slippage_bps, 300);
    }

    #[test]
    fn declared_decimals_override_table() {
        let intent = SwapIntent::for_tokens("SOL", "USDC", "1", 0.01, Some(6)).unwrap();
        assert_eq!(intent.amount_base_units(), 1_000_000);
    }

    #[test]
    fn unknown_mint_requires_decimals() {
        let mint = "11111111111111111111111111111111";
        let err = SwapIntent::for_tokens(mint, "USDC", "1", 0.01, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(SwapIntent::for_tokens(mint, "USDC", "1", 0.01, Some(0)).is_ok());
    }

    #[test]
    fn invalid_intents_are_rejected() {
        let sol = "So11111111111111111111111111111111111111112";
        let usdc = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
        assert!(SwapIntent::new(sol, sol, "1", 9, 0.01).is_err());
        assert!(SwapIntent::new("", usdc, "1", 9, 0.01).is_err());
        assert!(SwapIntent::new(sol, usdc, "0", 9, 0.01).is_err());
        assert!(SwapIntent::new(sol, usdc, "1", 9, 1.0).is_err());
        assert!(SwapIntent::new(sol, usdc, "1", 9, -0.1).is_err());
        assert!(SwapIntent::new(sol, usdc, "1", 9, f64::NAN).is_err());
        assert!(SwapIntent::new(sol, usdc, "1", 9, 0.0).is_ok());
    }

    #[test]
    fn quote_params_serialize_camel_case() {
        let intent = SwapIntent::for_tokens("SOL", "USDC", "0.5", 0.005, None).unwrap();
        let json = serde_json::to_value(intent.quote_params()).unwrap();
        assert_eq!(json["slippageBps"], 50);
        assert_eq!(json["inputMint"], "So11111111111111111111111111111111111111112");
    }
}
