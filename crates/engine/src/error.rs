//! Errors the engine can return.
//!
//! Every user-facing failure is detected before any mutation, so a returned
//! error implies no balance or ledger change happened.

use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

use crate::Currency;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found")]
    KeyNotFound(String),
    #[error("\"{0}\" already exists")]
    ExistingKey(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
    /// Settlement precondition failure. Carries the computed total the
    /// sender could cover (direct crypto plus convertible fiat).
    #[error("insufficient balance, available: {available} {currency}")]
    InsufficientBalance {
        available: Decimal,
        currency: Currency,
    },
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::UnknownCurrency(a), Self::UnknownCurrency(b)) => a == b,
            (
                Self::InsufficientBalance {
                    available: a,
                    currency: ca,
                },
                Self::InsufficientBalance {
                    available: b,
                    currency: cb,
                },
            ) => a == b && ca == cb,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
