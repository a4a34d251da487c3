use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{AccountId, LedgerError};

/// One leg of a double-entry transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub account_id: AccountId,
    pub value: Decimal,
    pub memo: Option<String>,
}

/// A split already posted to the book, as seen by duplicate detection.
/// `date` is the posting date of the owning transaction, time-of-day
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedSplit {
    pub description: String,
    pub date: NaiveDate,
    pub value: Decimal,
}

/// A transaction with exactly two splits whose values sum to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub currency: String,
    pub splits: [Split; 2],
}

impl BalancedTransaction {
    /// Builds both legs from a single value: the counter account receives the
    /// negated amount, so the pair balances by construction.
    pub fn new(
        date: NaiveDate,
        description: &str,
        currency: &str,
        account: AccountId,
        counter_account: AccountId,
        value: Decimal,
    ) -> Self {
        BalancedTransaction {
            date,
            description: description.to_string(),
            currency: currency.to_string(),
            splits: [
                Split {
                    account_id: account,
                    value,
                    memo: None,
                },
                Split {
                    account_id: counter_account,
                    value: -value,
                    memo: None,
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        let sum = self.splits[0].value + self.splits[1].value;
        if !sum.is_zero() {
            return Err(LedgerError::Unbalanced(
                self.splits[0].value,
                self.splits[1].value,
            ));
        }
        Ok(())
    }
}
