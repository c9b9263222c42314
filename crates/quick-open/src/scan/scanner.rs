//! Directory walking that yields discovered files in batches.
//!
//! The walk is depth-first and visits directory children in name order, so a
//! given tree always produces the same discovery order. Ignore rules are
//! applied to every entry before it is looked at further: a matching
//! directory is never opened.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::QuickOpenConfig;
use crate::error::canonicalize_existing_path;
use crate::ignore::IgnoreRules;
use crate::types::{FileEntry, ScanStats};

/// Walk settings for one scan.
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    rules: IgnoreRules,
    batch_size: usize,
    follow_symlinks: bool,
    include_hidden: bool,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>, config: &QuickOpenConfig) -> Self {
        Self {
            root: root.into(),
            rules: config.ignore_rules(),
            batch_size: config.scan_batch_size.max(1),
            follow_symlinks: config.follow_symlinks,
            include_hidden: config.include_hidden,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a lazy walk. Nothing touches the filesystem until the first
    /// call to `next()`.
    pub fn batches(&self) -> ScanBatches<'_> {
        ScanBatches {
            scanner: self,
            stop: None,
            pending_dirs: vec![self.root.clone()],
            buffer: Vec::new(),
            visited: HashSet::new(),
            stats: ScanStats::default(),
        }
    }

    /// Like [`batches`](Self::batches), but the walk ends as soon as `stop`
    /// is set. Files buffered at that point are discarded.
    pub fn batches_until<'a>(&'a self, stop: &'a AtomicBool) -> ScanBatches<'a> {
        ScanBatches {
            stop: Some(stop),
            ..self.batches()
        }
    }
}

/// Iterator over batches of discovered files.
#[derive(Debug)]
pub struct ScanBatches<'a> {
    scanner: &'a FileScanner,
    stop: Option<&'a AtomicBool>,
    /// Directories still to open; the last one is opened next.
    pending_dirs: Vec<PathBuf>,
    buffer: Vec<FileEntry>,
    /// Canonical directories already opened, tracked only when following symlinks.
    visited: HashSet<PathBuf>,
    stats: ScanStats,
}

impl ScanBatches<'_> {
    /// Counters so far; final once the iterator returned `None`.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn is_stopped(&self) -> bool {
        self.stop
            .map(|stop| stop.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn take_batch(&mut self) -> Vec<FileEntry> {
        let batch_size = self.scanner.batch_size;
        if self.buffer.len() <= batch_size {
            return std::mem::take(&mut self.buffer);
        }
        let rest = self.buffer.split_off(batch_size);
        std::mem::replace(&mut self.buffer, rest)
    }

    fn read_directory(&mut self, dir: &Path) {
        if self.scanner.follow_symlinks {
            let canonical = canonicalize_existing_path(dir.to_path_buf());
            if !self.visited.insert(canonical) {
                log::debug!("skipping already visited directory {}", dir.display());
                return;
            }
        }

        let read_dir = match fs::read_dir(dir) {
            Ok(iter) => iter,
            Err(error) => {
                self.stats.errors += 1;
                log::debug!("cannot read directory {}: {error}", dir.display());
                return;
            }
        };
        self.stats.dirs += 1;

        let mut entries = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    self.stats.errors += 1;
                    log::debug!("cannot read entry in {}: {error}", dir.display());
                }
            }
        }
        entries.sort_unstable_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();

            if !self.scanner.include_hidden && entry.file_name().to_string_lossy().starts_with('.')
            {
                self.stats.ignored += 1;
                continue;
            }
            if self.scanner.rules.matches(&path) {
                self.stats.ignored += 1;
                continue;
            }

            // Get file type without following symlinks
            let Ok(file_type) = entry.file_type() else {
                self.stats.errors += 1;
                continue;
            };

            let is_dir = if file_type.is_dir() {
                true
            } else if file_type.is_symlink() && self.scanner.follow_symlinks {
                fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false)
            } else {
                false
            };

            if is_dir {
                subdirs.push(path);
            } else {
                self.stats.files += 1;
                self.buffer.push(FileEntry::new(path));
            }
        }

        // Reverse so the first subdirectory in name order is opened next.
        self.pending_dirs.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for ScanBatches<'_> {
    type Item = Vec<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_stopped() {
                self.stats.stopped = true;
                self.pending_dirs.clear();
                self.buffer.clear();
                return None;
            }

            if self.buffer.len() >= self.scanner.batch_size {
                return Some(self.take_batch());
            }

            match self.pending_dirs.pop() {
                Some(dir) => self.read_directory(&dir),
                None if self.buffer.is_empty() => return None,
                None => return Some(self.take_batch()),
            }
        }
    }
}
