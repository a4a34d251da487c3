use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One normalized transaction from an export file.
///
/// The parsers create a record empty and fill fields as source lines or
/// columns are read; a field the file never mentions stays `None`. Amounts
/// are exact decimals throughout — financial totals must not pick up binary
/// floating-point drift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Posting date, no time component.
    pub date: Option<NaiveDate>,
    /// Full path of the source account the record belongs to.
    pub account: Option<String>,
    /// Signed transaction amount.
    pub amount: Option<Decimal>,
    /// Cleared/reconciled flag as written in the file.
    pub cleared: Option<String>,
    /// Reference (check) number.
    pub num: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub address: Option<String>,
    /// Category hint supplied by the source file.
    pub category: Option<String>,
    /// Destination account path, either from the file or resolved later.
    pub split_category: Option<String>,
    pub split_memo: Option<String>,
    /// Amount of the destination leg; defaults to `amount`.
    pub split_amount: Option<Decimal>,
}

impl ImportRecord {
    /// Fill the fields the file itself could not know: the source account
    /// (when the file carried none) and the split amount (mirrors `amount`
    /// unless the file gave an explicit one).
    pub fn apply_defaults(&mut self, default_account: Option<&str>) {
        if self.account.is_none() {
            self.account = default_account.map(str::to_string);
        }
        if self.split_amount.is_none() {
            self.split_amount = self.amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn defaults_fill_account_and_split_amount() {
        let mut record = ImportRecord {
            amount: Some(Decimal::from_str("-3.50").unwrap()),
            ..ImportRecord::default()
        };
        record.apply_defaults(Some("Assets:Checking"));
        assert_eq!(record.account.as_deref(), Some("Assets:Checking"));
        assert_eq!(record.split_amount, record.amount);
    }

    #[test]
    fn defaults_never_clobber_parsed_values() {
        let mut record = ImportRecord {
            account: Some("Assets:Savings".to_string()),
            amount: Some(Decimal::from_str("10.00").unwrap()),
            split_amount: Some(Decimal::from_str("4.00").unwrap()),
            ..ImportRecord::default()
        };
        record.apply_defaults(Some("Assets:Checking"));
        assert_eq!(record.account.as_deref(), Some("Assets:Savings"));
        assert_eq!(
            record.split_amount,
            Some(Decimal::from_str("4.00").unwrap())
        );
    }
}
