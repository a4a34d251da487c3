pub mod account;
pub mod book;
pub mod transaction;

pub use account::{Account, AccountId, Currency, CurrencyId, LedgerError};
pub use book::{Book, MemoryBook};
pub use transaction::{BalancedTransaction, PostedSplit, Split};
