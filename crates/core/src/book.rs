use crate::account::{Account, AccountId, Currency, CurrencyId, LedgerError};
use crate::transaction::{BalancedTransaction, PostedSplit};

/// Abstraction over the ledger backend the importer posts into.
///
/// Accounts are addressed by full path, currencies by mnemonic. The importer
/// never does balance arithmetic through this trait beyond handing over an
/// already-balanced two-split transaction.
pub trait Book {
    fn find_account(&self, path: &str) -> Result<Account, LedgerError>;
    fn find_currency(&self, mnemonic: &str) -> Result<Currency, LedgerError>;
    /// Read-only snapshot of the splits currently posted to an account.
    fn account_splits(&self, account: AccountId) -> Result<Vec<PostedSplit>, LedgerError>;
    fn append_transaction(&mut self, tx: &BalancedTransaction) -> Result<(), LedgerError>;
    /// Flush everything appended so far to durable storage.
    fn commit(&mut self) -> Result<(), LedgerError>;
}

// ── In-memory book (used for tests) ───────────────────────────────────────────

/// Book backed by plain vectors — useful for unit testing the import pipeline
/// without opening a SQLite file.
#[derive(Debug, Default)]
pub struct MemoryBook {
    accounts: Vec<Account>,
    currencies: Vec<Currency>,
    transactions: Vec<BalancedTransaction>,
    commits: usize,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_currency(&mut self, mnemonic: &str) -> CurrencyId {
        let id = CurrencyId(self.currencies.len() as i64 + 1);
        self.currencies.push(Currency {
            id: Some(id),
            mnemonic: mnemonic.to_string(),
        });
        id
    }

    pub fn add_account(&mut self, path: &str, currency: &str) -> AccountId {
        let id = AccountId(self.accounts.len() as i64 + 1);
        self.accounts.push(Account {
            id: Some(id),
            path: path.to_string(),
            currency: currency.to_string(),
        });
        id
    }

    pub fn transactions(&self) -> &[BalancedTransaction] {
        &self.transactions
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Book for MemoryBook {
    fn find_account(&self, path: &str) -> Result<Account, LedgerError> {
        self.accounts
            .iter()
            .find(|a| a.path == path)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(path.to_string()))
    }

    fn find_currency(&self, mnemonic: &str) -> Result<Currency, LedgerError> {
        self.currencies
            .iter()
            .find(|c| c.mnemonic == mnemonic)
            .cloned()
            .ok_or_else(|| LedgerError::CurrencyNotFound(mnemonic.to_string()))
    }

    fn account_splits(&self, account: AccountId) -> Result<Vec<PostedSplit>, LedgerError> {
        Ok(self
            .transactions
            .iter()
            .flat_map(|tx| {
                tx.splits.iter().filter_map(move |s| {
                    (s.account_id == account).then(|| PostedSplit {
                        description: tx.description.clone(),
                        date: tx.date,
                        value: s.value,
                    })
                })
            })
            .collect())
    }

    fn append_transaction(&mut self, tx: &BalancedTransaction) -> Result<(), LedgerError> {
        tx.validate()?;
        self.transactions.push(tx.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), LedgerError> {
        self.commits += 1;
        Ok(())
    }
}
