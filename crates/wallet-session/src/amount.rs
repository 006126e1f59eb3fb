//! Token amount parsing
//!
//! Amounts arrive from the display layer as free-form strings. They are
//! parsed into [`Decimal`] before any provider is involved.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Result, SessionError};

/// Fractional digits supported by the token
pub const TOKEN_PRECISION: u32 = 12;

/// Ticker shown next to amounts
pub const TOKEN_SYMBOL: &str = "KDA";

/// Parse a user-supplied transfer amount.
///
/// Accepts plain decimal notation with surrounding whitespace. The value must
/// be strictly positive and carry at most [`TOKEN_PRECISION`] fractional digits.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SessionError::validation("amount is required"));
    }

    let amount = Decimal::from_str(trimmed)
        .map_err(|_| SessionError::validation(format!("'{}' is not a valid amount", trimmed)))?;

    if amount <= Decimal::ZERO {
        return Err(SessionError::validation("amount must be greater than zero"));
    }

    if amount.normalize().scale() > TOKEN_PRECISION {
        return Err(SessionError::validation(format!(
            "amount supports at most {} decimal places",
            TOKEN_PRECISION
        )));
    }

    Ok(amount)
}

/// Render an amount for display (two decimal places, like the balance card)
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
