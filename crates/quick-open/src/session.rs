//! Quick-open sessions: one directory scan, one query stream, one ranked list.

mod actor;
mod debounce;
mod manager;

// Re-export main types
pub use debounce::Debouncer;
pub use manager::{QuickOpenManager, SessionHandle};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use self::actor::SessionActor;
use crate::candidates::CandidateSet;
use crate::config::QuickOpenConfig;
use crate::error::{canonicalize_existing_path, QuickOpenError, Result};
use crate::filter::FilterEngine;
use crate::scan::{FileScanner, ScanGate};
use crate::types::{ScanStats, ScoredEntry};

/// Observable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub generation: u64,
    /// Query of the most recent pass (after debouncing).
    pub query: String,
    pub working_directory: PathBuf,
    pub ranked_results: Vec<ScoredEntry>,
    pub discovered_count: usize,
    pub scan_in_progress: bool,
    pub filter_in_progress: bool,
    /// Final scan counters; `None` until the scan ends.
    pub scan_stats: Option<ScanStats>,
}

/// Messages consumed by the session actor.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// Raw query text, before debouncing.
    QueryChanged(String),
    /// A scanner batch landed; `discovered` is the new candidate count.
    BatchAppended { generation: u64, discovered: usize },
    ScanFinished { generation: u64, stats: ScanStats },
    End,
}

/// A running quick-open session over one working directory.
///
/// Session state lives in a tokio task; this value only sends it events and
/// reads its published [`SessionSnapshot`]s. Dropping the session ends it
/// without waiting.
#[derive(Debug)]
pub struct QuickOpenSession {
    generation: u64,
    working_directory: PathBuf,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    stop_scan: Arc<AtomicBool>,
    actor: Option<JoinHandle<()>>,
}

impl QuickOpenSession {
    /// Starts scanning `working_directory` on the current tokio runtime.
    pub fn start(working_directory: impl AsRef<Path>, config: &QuickOpenConfig) -> Result<Self> {
        Self::start_with_generation(working_directory.as_ref(), config, 1)
    }

    pub(crate) fn start_with_generation(
        working_directory: &Path,
        config: &QuickOpenConfig,
        generation: u64,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| QuickOpenError::NoRuntime)?;
        let working_directory = resolve_working_directory(working_directory)?;

        let candidates = Arc::new(CandidateSet::new());
        let gate = Arc::new(ScanGate::new());
        let engine = FilterEngine::new(
            working_directory.clone(),
            candidates.clone(),
            gate.clone(),
            config,
        );
        let stop_scan = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let initial = SessionSnapshot {
            generation,
            working_directory: working_directory.clone(),
            scan_in_progress: true,
            ..SessionSnapshot::default()
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());

        let scanner = FileScanner::new(working_directory.clone(), config);
        spawn_scan_thread(
            scanner,
            generation,
            candidates,
            gate,
            stop_scan.clone(),
            events_tx.clone(),
        )?;

        let actor = SessionActor::new(
            generation,
            engine,
            stop_scan.clone(),
            config.debounce(),
            initial,
            snapshot_tx,
        );
        let actor = runtime.spawn(actor.run(events_rx));

        log::info!(
            "quick-open session start generation={} dir={} ignore_patterns={}",
            generation,
            working_directory.display(),
            config.ignore_patterns.len()
        );

        Ok(Self {
            generation,
            working_directory,
            events: events_tx,
            snapshot: snapshot_rx,
            stop_scan,
            actor: Some(actor),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Canonical working directory.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Feeds one keystroke's worth of query text. Passes start only after
    /// the debounce window.
    pub fn update_query(&self, text: impl Into<String>) {
        if self
            .events
            .send(SessionEvent::QueryChanged(text.into()))
            .is_err()
        {
            log::debug!("query update for ended session {}", self.generation);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Ends the session and waits until its state has been cleared.
    pub async fn end(mut self) {
        self.close();
        if let Some(actor) = self.actor.take() {
            if let Err(error) = actor.await {
                log::warn!("session {} actor failed: {error}", self.generation);
            }
        }
    }

    /// Signals the end without waiting. Idempotent.
    fn close(&self) {
        self.stop_scan.store(true, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::End);
    }
}

impl Drop for QuickOpenSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve_working_directory(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(QuickOpenError::InvalidInput(
            "working directory is empty".to_string(),
        ));
    }
    let resolved = canonicalize_existing_path(path.to_path_buf());
    if !resolved.is_dir() {
        return Err(QuickOpenError::DirectoryNotFound(resolved));
    }
    Ok(resolved)
}

/// Runs the scan on its own thread, appending through the gate and
/// reporting each batch to the actor.
fn spawn_scan_thread(
    scanner: FileScanner,
    generation: u64,
    candidates: Arc<CandidateSet>,
    gate: Arc<ScanGate>,
    stop: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<()> {
    thread::Builder::new()
        .name("quick-open-scan".to_string())
        .spawn(move || {
            let started = Instant::now();
            let mut batches = scanner.batches_until(&stop);
            for batch in batches.by_ref() {
                let discovered = gate.append_when_open(&candidates, batch);
                let event = SessionEvent::BatchAppended {
                    generation,
                    discovered,
                };
                if events.send(event).is_err() {
                    stop.store(true, Ordering::SeqCst);
                }
            }

            let stats = batches.stats();
            log::info!(
                "quick-open scan done generation={} root={} files={} dirs={} ignored={} errors={} stopped={} elapsed_ms={}",
                generation,
                scanner.root().display(),
                stats.files,
                stats.dirs,
                stats.ignored,
                stats.errors,
                stats.stopped,
                started.elapsed().as_millis()
            );
            let _ = events.send(SessionEvent::ScanFinished { generation, stats });
        })?;
    Ok(())
}
