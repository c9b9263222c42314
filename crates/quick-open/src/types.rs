//! Value types shared between the scanner, the filter engine and sessions.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::score::Score;

/// One file discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub absolute_path: PathBuf,
}

impl FileEntry {
    pub fn new(absolute_path: impl Into<PathBuf>) -> Self {
        Self {
            absolute_path: absolute_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.absolute_path
    }

    /// Final path component, lossily converted.
    pub fn file_name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A candidate scored against one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredEntry {
    pub score: Score,
    pub path: PathBuf,
    /// Position in discovery order; breaks score ties.
    pub index: usize,
}

/// Lifecycle of the most recent filter pass.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum PassState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl PassState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Ranked output of one completed filter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedResults {
    /// Version of the pass that produced these results; 0 before any pass.
    pub version: u64,
    pub query: String,
    pub entries: Vec<ScoredEntry>,
    /// Candidate count the pass scored.
    pub scanned: usize,
}

/// Counters reported when a scan finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files: usize,
    pub dirs: usize,
    pub ignored: usize,
    pub errors: usize,
    /// True when the scan was stopped before walking the whole tree.
    pub stopped: bool,
}
