//! Input validation errors.

use thiserror::Error;

/// Malformed or missing input at the create or payment-update boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Field {field} is not a valid ISO 8601 date: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Field {field} has an invalid value: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Unknown gender: {0:?}")]
    InvalidGender(String),

    #[error("Field {field} must not be negative: {amount}")]
    NegativeAmount { field: &'static str, amount: f64 },

    #[error("Field {field} exceeds the maximum of {max}: {amount}")]
    AmountTooLarge {
        field: &'static str,
        amount: f64,
        max: f64,
    },

    #[error("Paid amount {paid} exceeds total amount {total}")]
    Overpayment { paid: f64, total: f64 },

    #[error("Payment amount must be greater than zero: {0}")]
    NonPositivePayment(f64),
}
