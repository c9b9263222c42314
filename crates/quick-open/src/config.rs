//! Session configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuickOpenError, Result};
use crate::ignore::IgnoreRules;

pub const DEFAULT_MAX_RESULTS: usize = 500;
pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 500;
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Tunables and ignore patterns for a quick-open session.
///
/// Every field has a default, so a config file only needs to name the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuickOpenConfig {
    /// Raw ignore patterns; `*/` prefixed patterns prune whole directories.
    pub ignore_patterns: Vec<String>,
    /// Cap on the published ranked list.
    pub max_results: usize,
    /// Candidates scored per worker task.
    pub chunk_size: usize,
    /// Files the scanner accumulates before appending to the candidate set.
    pub scan_batch_size: usize,
    /// Quiet window applied to query changes.
    pub debounce_ms: u64,
    /// Scoring pool size; 0 lets rayon pick.
    pub worker_threads: usize,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
}

impl Default for QuickOpenConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            max_results: DEFAULT_MAX_RESULTS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            worker_threads: 0,
            follow_symlinks: false,
            include_hidden: true,
        }
    }
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "*/.git",
        "*/.hg",
        "*/.svn",
        "*/node_modules",
        "*/target",
        ".DS_Store",
        "*.o",
        "*.pyc",
        "*.class",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

impl QuickOpenConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(QuickOpenError::InvalidConfig(
                "maxResults must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(QuickOpenError::InvalidConfig(
                "chunkSize must be greater than zero".to_string(),
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(QuickOpenError::InvalidConfig(
                "scanBatchSize must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Compiles the configured patterns into rules.
    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::from_patterns(self.ignore_patterns.iter().map(String::as_str))
    }
}
