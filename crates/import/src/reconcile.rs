use std::fs::File;
use std::path::Path;

use florin_core::{BalancedTransaction, Book, Currency, LedgerError};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::ImportedFiles;
use crate::categorize::{CategorizeError, Categorizer, IGNORE_ACCOUNT};
use crate::csv::{self, CsvError};
use crate::qif::{self, QifError};
use crate::record::ImportRecord;
use crate::rules::RuleSet;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Qif(#[from] QifError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Categorize(#[from] CategorizeError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Unsupported file extension: {0:?}")]
    UnsupportedFormat(String),
    #[error("Record has no date: {0}")]
    MissingDate(String),
    #[error("Record has no amount: {0}")]
    MissingAmount(String),
    #[error("Record has no source account: {0}")]
    MissingAccount(String),
    #[error("No destination account resolved: {0}")]
    UnresolvedDestination(String),
}

/// Input formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Qif,
    Csv,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("qif") => Ok(Format::Qif),
            Some("csv") => Ok(Format::Csv),
            other => Err(ImportError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Terminal state of one record run through the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Posted,
    SkippedDuplicate,
    SkippedIgnored,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub posted: usize,
    pub duplicates: usize,
    pub ignored: usize,
}

/// Drives one import run: whole-file replay skipping against the processed
/// cache, per-record duplicate detection against the book, and posting of
/// the survivors. Strictly sequential — a record posted earlier in the run
/// is visible to the duplicate check of every later one.
pub struct Reconciler<'a> {
    rules: &'a RuleSet,
    imported: &'a mut ImportedFiles,
    currency: String,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        rules: &'a RuleSet,
        imported: &'a mut ImportedFiles,
        currency: &str,
        dry_run: bool,
    ) -> Self {
        Self {
            rules,
            imported,
            currency: currency.to_string(),
            dry_run,
        }
    }

    /// Parse one input file into records, or nothing at all when its base
    /// name is already in the processed set.
    pub fn read_entries(
        &mut self,
        path: &Path,
        default_account: Option<&str>,
    ) -> Result<Vec<ImportRecord>, ImportError> {
        let base = base_name(path);
        if self.imported.contains(&base) {
            info!("skipping {base} (already imported)");
            return Ok(Vec::new());
        }

        debug!("reading {}", path.display());
        let format = Format::from_path(path)?;
        let file = File::open(path)?;
        let mut records = match format {
            Format::Qif => qif::parse(file)?,
            Format::Csv => csv::parse(file)?,
        };
        for record in &mut records {
            record.apply_defaults(default_account);
        }

        self.imported.insert(&base);
        debug!("read {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Read one file and post every surviving record, committing the book at
    /// the end unless this is a dry run.
    pub fn import_file(
        &mut self,
        book: &mut dyn Book,
        path: &Path,
        default_account: Option<&str>,
    ) -> Result<ImportStats, ImportError> {
        let records = self.read_entries(path, default_account)?;
        let mut stats = ImportStats::default();
        if records.is_empty() {
            return Ok(stats);
        }

        let currency = book.find_currency(&self.currency)?;
        for record in &records {
            match self.post(book, &currency, record)? {
                RecordOutcome::Posted => stats.posted += 1,
                RecordOutcome::SkippedDuplicate => stats.duplicates += 1,
                RecordOutcome::SkippedIgnored => stats.ignored += 1,
            }
        }

        if self.dry_run {
            debug!("** DRY-RUN ** leaving the book untouched");
        } else {
            book.commit()?;
        }
        Ok(stats)
    }

    /// Run a single record to its terminal state: posted, or skipped because
    /// its category says ignore, or skipped as a duplicate of an existing
    /// split.
    pub fn post(
        &self,
        book: &mut dyn Book,
        currency: &Currency,
        record: &ImportRecord,
    ) -> Result<RecordOutcome, ImportError> {
        let categorizer = Categorizer::new(self.rules);
        let destination = categorizer
            .destination(record, Some(&*book))?
            .ok_or_else(|| ImportError::UnresolvedDestination(label(record)))?;

        if destination == IGNORE_ACCOUNT {
            debug!(
                "skipping entry {} ({})",
                record.date.map(|d| d.to_string()).unwrap_or_default(),
                record
                    .split_amount
                    .or(record.amount)
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
            );
            return Ok(RecordOutcome::SkippedIgnored);
        }

        let source_path = record
            .account
            .as_deref()
            .ok_or_else(|| ImportError::MissingAccount(label(record)))?;
        let date = record
            .date
            .ok_or_else(|| ImportError::MissingDate(label(record)))?;
        let amount = record
            .split_amount
            .or(record.amount)
            .ok_or_else(|| ImportError::MissingAmount(label(record)))?;
        let payee = record.payee.as_deref().unwrap_or_default();

        let source = book.find_account(source_path)?;
        let source_id = source
            .id
            .ok_or_else(|| LedgerError::AccountNotFound(source.path.clone()))?;
        let counter = book.find_account(&destination)?;
        let counter_id = counter
            .id
            .ok_or_else(|| LedgerError::AccountNotFound(counter.path.clone()))?;

        // Description + date + value triple against what the book already
        // holds. A heuristic, not an identifier; it is what makes re-running
        // an import a no-op when the file cache was cleared.
        for split in book.account_splits(source_id)? {
            if split.description == payee && split.date == date && split.value == amount {
                info!("skipping {date} {payee} ({amount}): already in the book");
                return Ok(RecordOutcome::SkippedDuplicate);
            }
        }

        info!(
            "adding transaction for account {source_path} ({date} {payee} {amount} {})",
            currency.mnemonic
        );

        if !self.dry_run {
            let tx = BalancedTransaction::new(
                date,
                payee,
                &currency.mnemonic,
                source_id,
                counter_id,
                amount,
            );
            book.append_transaction(&tx)?;
        }

        Ok(RecordOutcome::Posted)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn label(record: &ImportRecord) -> String {
    format!(
        "{} {}",
        record
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string()),
        record.payee.as_deref().unwrap_or("?"),
    )
}
