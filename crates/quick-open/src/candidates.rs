//! Append-only candidate list shared by the scanner and the filter engine.

use parking_lot::{RwLock, RwLockReadGuard};

use crate::types::FileEntry;

/// Ordered list of discovered files.
///
/// Entries are only ever appended, so an index observed once keeps naming the
/// same entry for the rest of the session. The scanner appends through
/// [`ScanGate::append_when_open`](crate::scan::ScanGate::append_when_open);
/// filter passes read while holding the gate paused, so the lock below is
/// never contended on the hot path.
#[derive(Debug, Default)]
pub struct CandidateSet {
    entries: RwLock<Vec<FileEntry>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access for the duration of a pass.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<FileEntry>> {
        self.entries.read()
    }

    pub(crate) fn append(&self, batch: Vec<FileEntry>) -> usize {
        let mut entries = self.entries.write();
        entries.extend(batch);
        entries.len()
    }

    /// Copies the current contents; intended for tests and diagnostics.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.entries.read().clone()
    }
}
