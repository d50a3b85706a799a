//! Conversion between human amounts and token base units.

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::U256;
use anyhow::{anyhow, Result};

/// Converts a human amount such as `"1000"` or `"0.000001"` to base units.
/// Negative amounts are rejected.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(anyhow!("Empty amount"));
    }
    let parsed = parse_units(amount, decimals)
        .map_err(|e| anyhow!("Invalid amount {:?} for {} decimals: {}", amount, decimals, e))?;
    match parsed {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(value) if value.is_negative() => {
            Err(anyhow!("Negative amount {:?}", amount))
        }
        ParseUnits::I256(value) => Ok(value.into_raw()),
    }
}

/// Converts base units back to a human amount string.
pub fn format_amount(value: U256, decimals: u8) -> Result<String> {
    format_units(value, decimals)
        .map_err(|e| anyhow!("Cannot format {} with {} decimals: {}", value, decimals, e))
}

/// Formats base units with six fractional digits, the precision used in step messages.
pub fn format_amount_short(value: U256, decimals: u8) -> Option<String> {
    let formatted = format_amount(value, decimals).ok()?;
    let as_float: f64 = formatted.parse().ok()?;
    Some(format!("{:.6}", as_float))
}

/// Parses a base-unit decimal string as returned by routing APIs.
pub fn parse_base_units(value: &str) -> Option<U256> {
    value.trim().parse::<U256>().ok()
}
