//! Unit price representation using decimal arithmetic.
//!
//! Prices are whole-currency amounts (the store sells in dinar), bounded to
//! the range the intake form accepts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::ValidationError;

/// Largest unit price accepted at intake.
pub const MAX_PRICE: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);

/// Largest quantity accepted at intake.
pub const MAX_QUANTITY: u32 = 100;

/// A validated, non-negative unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Validate and wrap an amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::PriceOutOfRange` if the amount is negative
    /// or above [`MAX_PRICE`].
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount < Decimal::ZERO || amount > MAX_PRICE {
            return Err(ValidationError::PriceOutOfRange(amount));
        }
        Ok(Self(amount))
    }

    /// Wrap an amount read back from the record store.
    ///
    /// Only the sign is checked: rows already in the table are kept even
    /// when they exceed what intake accepts today.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::PriceOutOfRange` if the amount is negative.
    pub fn stored(amount: Decimal) -> Result<Self, ValidationError> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::PriceOutOfRange(amount));
        }
        Ok(Self(amount))
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display with `.` thousands separators (e.g. `25.000`).
    #[must_use]
    pub fn display(&self) -> String {
        format_thousands(self.0)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Round to a whole number and group digits in threes with `.`.
///
/// Rounding is half-to-even.
#[must_use]
pub fn format_thousands(amount: Decimal) -> String {
    let rounded = amount.round();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
