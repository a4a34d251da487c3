use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;

/// One categorization rule: a compiled pattern and the account it routes to.
#[derive(Debug)]
pub struct Rule {
    pub account: String,
    pub pattern: Regex,
}

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Ordered rule list. Order is exactly the declaration order of the source
/// file; lookups take the first match, top to bottom.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Load `account;pattern` lines.
    ///
    /// Blank lines and `#` comments are skipped. A line without the
    /// two-field shape is logged and ignored; a pattern that fails to
    /// compile aborts the load.
    pub fn load<R: Read>(input: R) -> Result<Self, RulesError> {
        let reader = BufReader::new(input);
        let mut rules = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match split_rule_line(line) {
                Some((account, pattern)) => {
                    let compiled =
                        Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
                            pattern: pattern.to_string(),
                            source,
                        })?;
                    rules.push(Rule {
                        account: account.to_string(),
                        pattern: compiled,
                    });
                }
                None => tracing::warn!("ignoring rule line (incorrect format): {line:?}"),
            }
        }

        Ok(Self { rules })
    }

    /// Account of the first declared rule whose pattern matches anywhere in
    /// `text` (search, not full-text equality).
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.account.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The pattern is everything after the last `;`, so account paths may
/// themselves contain the separator.
fn split_rule_line(line: &str) -> Option<(&str, &str)> {
    let (account, pattern) = line.rsplit_once(';')?;
    if account.is_empty() || pattern.is_empty() {
        return None;
    }
    Some((account, pattern))
}
