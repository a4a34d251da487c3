use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyId(pub i64);

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A commodity the book denominates transactions in, keyed by its ISO 4217
/// mnemonic ("GBP", "EUR").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    pub id: Option<CurrencyId>,
    pub mnemonic: String,
}

impl Currency {
    pub fn new(mnemonic: &str) -> Self {
        Currency {
            id: None,
            mnemonic: mnemonic.to_string(),
        }
    }
}

/// An account addressed by its full colon-separated path, e.g.
/// "Expenses:Groceries". The currency is the mnemonic of the commodity the
/// account is kept in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub path: String,
    pub currency: String,
}

impl Account {
    pub fn new(path: &str, currency: &str) -> Self {
        Account {
            id: None,
            path: path.to_string(),
            currency: currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),
    #[error("Unbalanced transaction: {0} + {1} != 0")]
    Unbalanced(Decimal, Decimal),
    #[error("Storage error: {0}")]
    Storage(String),
}
