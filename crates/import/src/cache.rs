use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed cache file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Base names of files a previous run fully imported.
///
/// Loaded once at startup, extended in memory as files are read, and written
/// back only at the end of a successful non-dry run — a file that failed to
/// parse is never marked processed.
#[derive(Debug, Default)]
pub struct ImportedFiles {
    names: HashSet<String>,
}

impl ImportedFiles {
    /// Default user-scoped location of the cache file.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "anomalyco", "Florin")
            .map(|dirs| dirs.data_dir().join("imported-files.json"))
    }

    /// Load the set; a missing file is an empty set, a malformed one is an
    /// error.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let names: HashSet<String> = serde_json::from_str(&data)?;
        Ok(Self { names })
    }

    pub fn contains(&self, base_name: &str) -> bool {
        self.names.contains(base_name)
    }

    pub fn insert(&mut self, base_name: &str) {
        self.names.insert(base_name.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Persist as a JSON array of names, creating parent directories as
    /// needed. Sorted for a stable file; the set itself has no order.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut names: Vec<&String> = self.names.iter().collect();
        names.sort();
        fs::write(path, serde_json::to_string(&names)?)?;
        Ok(())
    }
}
