//! # Monetary Validation Helpers
//!
//! All prices, quantities, rates, and tax amounts in the core are
//! `rust_decimal::Decimal`. These helpers centralize the positivity
//! checks applied to offer and trade figures, so every call site
//! produces the same error shape.

use rust_decimal::Decimal;

use crate::error::MandiError;

/// Require a strictly positive value (`> 0`).
///
/// Offer price and quantity, and the derived trade total, must all be
/// strictly positive.
///
/// # Errors
///
/// Returns [`MandiError::Validation`] naming `field` when the value is
/// zero or negative.
pub fn ensure_positive(value: Decimal, field: &str) -> Result<(), MandiError> {
    if value <= Decimal::ZERO {
        return Err(MandiError::Validation(format!(
            "{field} must be positive, got {value}"
        )));
    }
    Ok(())
}

/// Require a non-negative value (`>= 0`).
///
/// Tax rates may legitimately be zero (exempt categories); negative
/// rates are always configuration mistakes.
///
/// # Errors
///
/// Returns [`MandiError::Validation`] naming `field` when the value is
/// negative.
pub fn ensure_non_negative(value: Decimal, field: &str) -> Result<(), MandiError> {
    if value < Decimal::ZERO {
        return Err(MandiError::Validation(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}
