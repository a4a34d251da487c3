use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use florin_import::{ImportedFiles, Reconciler, RuleSet};
use florin_storage::SqliteBook;
use tracing::{debug, info};

/// Import QIF/CSV bank exports into a double-entry SQLite book.
#[derive(Parser, Debug)]
#[command(name = "florin", version, about)]
struct Cli {
    /// Verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Silent mode, only log warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Do every lookup and duplicate check, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Currency ISO code
    #[arg(short, long, value_name = "ISOCODE", default_value = "GBP")]
    currency: String,

    /// Default source account for records that carry none (derived from the
    /// rules and the file name when omitted)
    #[arg(short = 'a', long, value_name = "PATH")]
    default_account: Option<String>,

    /// Book file
    #[arg(short = 'f', long, value_name = "FILE")]
    book: PathBuf,

    /// Rules file, one `account;pattern` per line
    #[arg(short, long, value_name = "FILE", default_value = "rules.txt")]
    rules: PathBuf,

    /// Cache of already-imported file names
    #[arg(long, value_name = "FILE")]
    cache: Option<PathBuf>,

    /// Input QIF/CSV file(s)
    #[arg(required = true, value_name = "INPUT")]
    file: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    run(cli)
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<()> {
    let cache_path = match &cli.cache {
        Some(path) => path.clone(),
        None => ImportedFiles::default_path()
            .context("could not determine a location for the import cache")?,
    };
    let mut imported = ImportedFiles::load(&cache_path)
        .with_context(|| format!("reading import cache {}", cache_path.display()))?;

    let rules = load_rules(&cli.rules)?;

    let mut book = SqliteBook::open(&cli.book)
        .with_context(|| format!("opening book {}", cli.book.display()))?;

    let mut reconciler = Reconciler::new(&rules, &mut imported, &cli.currency, cli.dry_run);

    for path in &cli.file {
        info!("processing file: {}", path.display());
        let default_account = match &cli.default_account {
            Some(account) => Some(account.clone()),
            None => default_account_for(&rules, path),
        };

        let stats = reconciler
            .import_file(&mut book, path, default_account.as_deref())
            .with_context(|| format!("importing {}", path.display()))?;
        info!(
            "{}: {} posted, {} duplicates, {} ignored",
            path.display(),
            stats.posted,
            stats.duplicates,
            stats.ignored
        );
    }

    if cli.dry_run {
        debug!("** DRY-RUN ** leaving the import cache untouched");
    } else {
        imported
            .save(&cache_path)
            .with_context(|| format!("writing import cache {}", cache_path.display()))?;
    }

    Ok(())
}

fn load_rules(path: &Path) -> Result<RuleSet> {
    if !path.exists() {
        debug!("no rules file at {}", path.display());
        return Ok(RuleSet::default());
    }
    let file = File::open(path).with_context(|| format!("opening rules {}", path.display()))?;
    let rules =
        RuleSet::load(file).with_context(|| format!("loading rules {}", path.display()))?;
    debug!("loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// With no explicit override the source account is derived by running the
/// file name itself through the rules, the same first-match lookup used for
/// payees. Records must then carry their own account if nothing matches.
fn default_account_for(rules: &RuleSet, path: &Path) -> Option<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match rules.first_match(name) {
        Some(account) => {
            info!("setting default import account to {account}");
            Some(account.to_string())
        }
        None => {
            debug!("no rule matches file name {name:?}; records must name their own account");
            None
        }
    }
}
