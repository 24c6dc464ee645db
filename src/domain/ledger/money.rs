//! Conversion between gateway minor units and ledger decimal amounts.
//!
//! The gateway reports amounts as integers in the currency's smallest unit.
//! Ledger entries store amounts in the major unit as fixed-point decimals.

use rust_decimal::Decimal;

use crate::domain::foundation::ValidationError;

/// Currencies without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Currencies with a thousandth minor unit.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["bhd", "jod", "kwd", "omr", "tnd"];

/// Returns the number of decimal places the currency's minor unit represents.
pub fn currency_exponent(currency: &str) -> u32 {
    let code = currency.to_ascii_lowercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        0
    } else if THREE_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        3
    } else {
        2
    }
}

/// Converts a minor-unit amount into the ledger's decimal unit.
///
/// # Errors
///
/// Returns `ValidationError::Negative` for negative amounts and
/// `ValidationError::EmptyField` for a blank currency code.
pub fn from_minor_units(amount: i64, currency: &str) -> Result<Decimal, ValidationError> {
    if currency.trim().is_empty() {
        return Err(ValidationError::empty_field("currency"));
    }
    if amount < 0 {
        return Err(ValidationError::negative("amount_total"));
    }
    Ok(Decimal::new(amount, currency_exponent(currency)))
}
