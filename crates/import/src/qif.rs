use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;
use thiserror::Error;

use crate::record::ImportRecord;

/// Kind announced by a `!` header line. Only `Account` matters: an account
/// definition block updates the carried account name and is never emitted as
/// a transaction.
const ACCOUNT_KIND: &str = "Account";

#[derive(Error, Debug)]
pub enum QifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Parser state threaded through the line loop: the record under
/// construction, the kind of the current block, and the account name that
/// outlives record boundaries.
#[derive(Debug, Default)]
pub struct QifState {
    account: Option<String>,
    kind: Option<String>,
    current: ImportRecord,
}

impl QifState {
    /// Advance the state machine by one line, appending to `out` when the
    /// line terminates an item. One-character field tag first, content after.
    pub fn step(&mut self, line: &str, out: &mut Vec<ImportRecord>) -> Result<(), QifError> {
        let Some(tag) = line.chars().next() else {
            // blank line
            return Ok(());
        };
        let data = line[tag.len_utf8()..].trim();

        match tag {
            '^' => {
                // End of item. Account definition pseudo-records are
                // swallowed; everything else is emitted as parsed.
                if self.kind.as_deref() == Some(ACCOUNT_KIND) {
                    self.current = ImportRecord::default();
                } else {
                    out.push(std::mem::take(&mut self.current));
                }
                self.kind = None;
                self.current.account = self.account.clone();
            }
            'D' => self.current.date = Some(parse_qif_date(data)?),
            'T' => self.current.amount = Some(parse_qif_amount(data)?),
            'C' => self.current.cleared = Some(data.to_string()),
            'P' => self.current.payee = Some(data.to_string()),
            'M' => self.current.memo = Some(data.to_string()),
            'A' => self.current.address = Some(data.to_string()),
            'L' => self.current.category = Some(data.to_string()),
            'S' => self.current.split_category = Some(data.to_string()),
            'E' => self.current.split_memo = Some(data.to_string()),
            '$' => self.current.split_amount = Some(parse_qif_amount(data)?),
            'N' => {
                // Inside an account definition block this names the account
                // all following records belong to.
                if self.kind.as_deref() == Some(ACCOUNT_KIND) {
                    self.account = Some(data.to_string());
                }
            }
            '!' => self.kind = Some(data.to_string()),
            _ => tracing::warn!("skipping unknown QIF line: {line:?}"),
        }

        Ok(())
    }
}

/// Parse a QIF document into its records, in file order.
///
/// Items end with a `^` line; a trailing record the file never terminated is
/// dropped. Malformed dates and amounts abort the parse.
pub fn parse<R: Read>(input: R) -> Result<Vec<ImportRecord>, QifError> {
    let reader = BufReader::new(input);
    let mut out = Vec::new();
    let mut state = QifState::default();

    for line in reader.lines() {
        let line = line?;
        state.step(&line, &mut out)?;
    }

    Ok(out)
}

/// QIF dates are `day/month/year` with numeric components.
fn parse_qif_date(s: &str) -> Result<NaiveDate, QifError> {
    let parts: Vec<&str> = s.split('/').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(QifError::InvalidDate(s.to_string()));
    };
    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| QifError::InvalidDate(s.to_string()))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| QifError::InvalidDate(s.to_string()))?;
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| QifError::InvalidDate(s.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| QifError::InvalidDate(s.to_string()))
}

fn parse_qif_amount(s: &str) -> Result<Decimal, QifError> {
    let cleaned = s.replace(',', "");
    Decimal::from_str(&cleaned).map_err(|_| QifError::InvalidAmount(s.to_string()))
}
