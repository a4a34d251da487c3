use chrono::NaiveDate;
use florin_core::{
    Account, AccountId, BalancedTransaction, Book, Currency, CurrencyId, LedgerError, PostedSplit,
};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed double-entry book.
///
/// Split values are stored as canonical decimal strings, not cents or
/// floats, so the exact amounts the parsers produced come back out of
/// duplicate-detection queries unchanged.
///
/// Appends accumulate in one open database transaction that [`Book::commit`]
/// finalizes; dropping the book without committing rolls them back, so an
/// aborted run leaves no partial file behind. Reads on this connection still
/// see the uncommitted appends.
pub struct SqliteBook {
    conn: Connection,
    in_tx: bool,
}

impl SqliteBook {
    /// Open (or create) a book file and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        tracing::debug!("opening book {}", path.display());
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::prepare(conn)
    }

    /// Purely in-memory book for tests and experiments.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, LedgerError> {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .map_err(storage_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(storage_err)?;
        run_migrations(&conn)?;
        Ok(Self { conn, in_tx: false })
    }

    /// Ensure a commodity row exists and return its id.
    pub fn create_currency(&self, mnemonic: &str) -> Result<CurrencyId, LedgerError> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO commodities (mnemonic) VALUES (?1)",
                params![mnemonic],
            )
            .map_err(storage_err)?;
        let id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM commodities WHERE mnemonic = ?1",
                params![mnemonic],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        Ok(CurrencyId(id))
    }

    /// Ensure an account row exists (creating its commodity as needed) and
    /// return its id.
    pub fn create_account(&self, path: &str, currency: &str) -> Result<AccountId, LedgerError> {
        let commodity = self.create_currency(currency)?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO accounts (path, commodity_id) VALUES (?1, ?2)",
                params![path, commodity.0],
            )
            .map_err(storage_err)?;
        let id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM accounts WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        Ok(AccountId(id))
    }
}

fn storage_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn run_migrations(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS commodities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mnemonic TEXT NOT NULL UNIQUE
        )
        "#,
        [],
    )
    .map_err(storage_err)?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            commodity_id INTEGER NOT NULL,
            FOREIGN KEY (commodity_id) REFERENCES commodities(id)
        )
        "#,
        [],
    )
    .map_err(storage_err)?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_date TEXT NOT NULL,
            enter_date TEXT NOT NULL DEFAULT (datetime('now')),
            description TEXT NOT NULL,
            currency_id INTEGER NOT NULL,
            FOREIGN KEY (currency_id) REFERENCES commodities(id)
        )
        "#,
        [],
    )
    .map_err(storage_err)?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS splits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            value TEXT NOT NULL,
            memo TEXT,
            FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
        [],
    )
    .map_err(storage_err)?;

    Ok(())
}

impl Book for SqliteBook {
    fn find_account(&self, path: &str) -> Result<Account, LedgerError> {
        self.conn
            .query_row(
                "SELECT a.id, a.path, c.mnemonic FROM accounts a \
                 JOIN commodities c ON c.id = a.commodity_id WHERE a.path = ?1",
                params![path],
                |row| {
                    Ok(Account {
                        id: Some(AccountId(row.get(0)?)),
                        path: row.get(1)?,
                        currency: row.get(2)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    LedgerError::AccountNotFound(path.to_string())
                }
                other => storage_err(other),
            })
    }

    fn find_currency(&self, mnemonic: &str) -> Result<Currency, LedgerError> {
        self.conn
            .query_row(
                "SELECT id, mnemonic FROM commodities WHERE mnemonic = ?1",
                params![mnemonic],
                |row| {
                    Ok(Currency {
                        id: Some(CurrencyId(row.get(0)?)),
                        mnemonic: row.get(1)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    LedgerError::CurrencyNotFound(mnemonic.to_string())
                }
                other => storage_err(other),
            })
    }

    fn account_splits(&self, account: AccountId) -> Result<Vec<PostedSplit>, LedgerError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT t.description, t.post_date, s.value FROM splits s \
                 JOIN transactions t ON t.id = s.transaction_id WHERE s.account_id = ?1",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![account.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(storage_err)?;

        let mut splits = Vec::new();
        for row in rows {
            let (description, date, value) = row.map_err(storage_err)?;
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            let value =
                Decimal::from_str(&value).map_err(|e| LedgerError::Storage(e.to_string()))?;
            splits.push(PostedSplit {
                description,
                date,
                value,
            });
        }
        Ok(splits)
    }

    fn append_transaction(&mut self, tx: &BalancedTransaction) -> Result<(), LedgerError> {
        tx.validate()?;
        let currency_id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM commodities WHERE mnemonic = ?1",
                params![tx.currency],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    LedgerError::CurrencyNotFound(tx.currency.clone())
                }
                other => storage_err(other),
            })?;

        if !self.in_tx {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(storage_err)?;
            self.in_tx = true;
        }
        self.conn
            .execute(
                "INSERT INTO transactions (post_date, description, currency_id) VALUES (?1, ?2, ?3)",
                params![tx.date.to_string(), tx.description, currency_id],
            )
            .map_err(storage_err)?;
        let tx_id = self.conn.last_insert_rowid();
        for split in &tx.splits {
            self.conn
                .execute(
                    "INSERT INTO splits (transaction_id, account_id, value, memo) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![tx_id, split.account_id.0, split.value.to_string(), split.memo],
                )
                .map_err(storage_err)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), LedgerError> {
        if self.in_tx {
            self.conn.execute_batch("COMMIT").map_err(storage_err)?;
            self.in_tx = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded() -> (SqliteBook, AccountId, AccountId) {
        let book = SqliteBook::open_in_memory().unwrap();
        book.create_currency("GBP").unwrap();
        let checking = book.create_account("Assets:Checking", "GBP").unwrap();
        let groceries = book.create_account("Expenses:Groceries", "GBP").unwrap();
        (book, checking, groceries)
    }

    #[test]
    fn find_account_returns_path_and_currency() {
        let (book, checking, _) = seeded();
        let account = book.find_account("Assets:Checking").unwrap();
        assert_eq!(account.id, Some(checking));
        assert_eq!(account.currency, "GBP");
    }

    #[test]
    fn find_account_unknown_path_errors() {
        let (book, _, _) = seeded();
        assert!(matches!(
            book.find_account("Assets:Nowhere"),
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn find_currency_unknown_mnemonic_errors() {
        let (book, _, _) = seeded();
        assert!(matches!(
            book.find_currency("XXX"),
            Err(LedgerError::CurrencyNotFound(_))
        ));
    }

    #[test]
    fn create_account_is_idempotent() {
        let (book, checking, _) = seeded();
        let again = book.create_account("Assets:Checking", "GBP").unwrap();
        assert_eq!(again, checking);
    }

    #[test]
    fn append_and_read_back_splits_exactly() {
        let (mut book, checking, groceries) = seeded();
        let value = Decimal::from_str("-1234.56").unwrap();
        let tx = BalancedTransaction::new(
            date(2026, 2, 1),
            "TESCO STORES",
            "GBP",
            checking,
            groceries,
            value,
        );
        book.append_transaction(&tx).unwrap();

        let splits = book.account_splits(checking).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].description, "TESCO STORES");
        assert_eq!(splits[0].date, date(2026, 2, 1));
        // Exact decimal round-trip through TEXT storage.
        assert_eq!(splits[0].value, value);

        let counter = book.account_splits(groceries).unwrap();
        assert_eq!(counter[0].value, -value);
    }

    #[test]
    fn append_with_unknown_currency_errors() {
        let (mut book, checking, groceries) = seeded();
        let tx = BalancedTransaction::new(
            date(2026, 2, 1),
            "TESCO",
            "JPY",
            checking,
            groceries,
            Decimal::ONE,
        );
        assert!(matches!(
            book.append_transaction(&tx),
            Err(LedgerError::CurrencyNotFound(_))
        ));
    }

    #[test]
    fn uncommitted_appends_roll_back_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let mut book = SqliteBook::open(&path).unwrap();
            book.create_currency("GBP").unwrap();
            let a = book.create_account("Assets:Checking", "GBP").unwrap();
            let b = book.create_account("Expenses:Misc", "GBP").unwrap();
            let tx = BalancedTransaction::new(
                date(2026, 2, 1),
                "SHOP",
                "GBP",
                a,
                b,
                Decimal::from_str("-9.99").unwrap(),
            );
            book.append_transaction(&tx).unwrap();
            // No commit: the run aborted here.
        }

        let book = SqliteBook::open(&path).unwrap();
        let account = book.find_account("Assets:Checking").unwrap();
        assert!(book.account_splits(account.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn book_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let mut book = SqliteBook::open(&path).unwrap();
            book.create_currency("GBP").unwrap();
            let a = book.create_account("Assets:Checking", "GBP").unwrap();
            let b = book.create_account("Expenses:Misc", "GBP").unwrap();
            let tx = BalancedTransaction::new(
                date(2026, 2, 1),
                "SHOP",
                "GBP",
                a,
                b,
                Decimal::from_str("-9.99").unwrap(),
            );
            book.append_transaction(&tx).unwrap();
            book.commit().unwrap();
        }

        let book = SqliteBook::open(&path).unwrap();
        let account = book.find_account("Assets:Checking").unwrap();
        let splits = book.account_splits(account.id.unwrap()).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].value, Decimal::from_str("-9.99").unwrap());
    }
}
