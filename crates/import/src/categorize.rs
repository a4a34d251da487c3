use florin_core::{Book, LedgerError};
use thiserror::Error;

use crate::record::ImportRecord;
use crate::rules::RuleSet;

/// Reserved destination meaning "drop this record instead of posting it".
pub const IGNORE_ACCOUNT: &str = "IGNORE";

/// Prefix of the synthesized fallback account, completed with the currency
/// code of the record's source account.
const IMBALANCE_PREFIX: &str = "Imbalance-";

#[derive(Error, Debug)]
pub enum CategorizeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Resolves the destination account for a record.
pub struct Categorizer<'a> {
    rules: &'a RuleSet,
}

impl<'a> Categorizer<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Destination account path for `record`.
    ///
    /// An explicit `split_category` on the record always wins. Otherwise the
    /// payee runs through the rules, and with a book at hand an unmatched
    /// record falls back to the imbalance account of its source account's
    /// currency, so it still ends up with a destination. `Ok(None)` means no
    /// rule matched and no fallback was possible; the returned path may be
    /// the [`IGNORE_ACCOUNT`] sentinel, which callers must treat as a drop
    /// signal rather than an account.
    pub fn destination(
        &self,
        record: &ImportRecord,
        book: Option<&dyn Book>,
    ) -> Result<Option<String>, CategorizeError> {
        if let Some(explicit) = &record.split_category {
            return Ok(Some(explicit.clone()));
        }

        let payee = record.payee.as_deref().unwrap_or_default();
        if let Some(account) = self.rules.first_match(payee) {
            return Ok(Some(account.to_string()));
        }

        let (Some(book), Some(source)) = (book, record.account.as_deref()) else {
            return Ok(None);
        };
        let source = book.find_account(source)?;
        Ok(Some(format!("{IMBALANCE_PREFIX}{}", source.currency)))
    }
}
