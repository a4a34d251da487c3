pub mod cache;
pub mod categorize;
pub mod csv;
pub mod qif;
pub mod record;
pub mod reconcile;
pub mod rules;

pub use cache::ImportedFiles;
pub use categorize::{CategorizeError, Categorizer, IGNORE_ACCOUNT};
pub use record::ImportRecord;
pub use reconcile::{Format, ImportError, ImportStats, RecordOutcome, Reconciler};
pub use rules::{Rule, RuleSet, RulesError};
