//! FilterEngine - cancels, serializes and publishes filter passes.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use rayon::ThreadPool;
use tokio::sync::watch;

use super::pass::{rank_candidates_with, PassRequest};
use crate::cancel::{CancellationToken, PassVersionTracker};
use crate::candidates::CandidateSet;
use crate::config::QuickOpenConfig;
use crate::scan::ScanGate;
use crate::score::{self, Score};
use crate::types::{PassState, RankedResults, ScoredEntry};

type Scorer = dyn Fn(&str, &str) -> Score + Send + Sync;
type PassJob = Box<dyn FnOnce() -> PassOutcome + Send + 'static>;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Results were published; carries the published entry count.
    Completed { published: usize },
    /// Superseded or cancelled; nothing was published.
    Cancelled,
}

/// Handle to one triggered pass.
#[derive(Debug)]
pub struct PassHandle {
    version: u64,
    join_handle: Option<JoinHandle<PassOutcome>>,
    /// Set when the pass already ran on the triggering thread.
    outcome: Option<PassOutcome>,
}

impl PassHandle {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Blocks until the pass has fully ended.
    pub fn join(self) -> PassOutcome {
        match self.join_handle {
            Some(handle) => handle.join().unwrap_or(PassOutcome::Cancelled),
            None => self.outcome.unwrap_or(PassOutcome::Cancelled),
        }
    }
}

struct EngineShared {
    working_directory: PathBuf,
    candidates: Arc<CandidateSet>,
    gate: Arc<ScanGate>,
    max_results: usize,
    chunk_size: usize,
    pool: Option<ThreadPool>,
    scorer: Arc<Scorer>,
    versions: PassVersionTracker,
    /// Serializes passes: only the lane holder scores.
    pass_lane: Mutex<()>,
    /// Orders version bumps against publication.
    publish_lock: Mutex<()>,
    state: AtomicU8,
    active_passes: AtomicUsize,
    results: watch::Sender<RankedResults>,
}

/// Owns the filter pass lifecycle for one candidate set.
///
/// Every [`trigger`](Self::trigger) allocates a new pass version, which
/// cancels whatever pass is in flight, and starts the new pass on its own
/// thread. Passes queue on a single lane so at most one scores at a time; a
/// pass that is superseded before reaching the lane exits without work.
/// Results are published only by a pass whose version is still current, so
/// an older pass can never overwrite a newer one.
#[derive(Clone)]
pub struct FilterEngine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("working_directory", &self.shared.working_directory)
            .field("state", &self.state().as_str())
            .field("version", &self.shared.versions.current_version())
            .finish()
    }
}

impl FilterEngine {
    pub fn new(
        working_directory: PathBuf,
        candidates: Arc<CandidateSet>,
        gate: Arc<ScanGate>,
        config: &QuickOpenConfig,
    ) -> Self {
        Self::with_scorer(working_directory, candidates, gate, config, Arc::new(score::score))
    }

    /// Builds an engine around a custom scoring function.
    pub fn with_scorer(
        working_directory: PathBuf,
        candidates: Arc<CandidateSet>,
        gate: Arc<ScanGate>,
        config: &QuickOpenConfig,
        scorer: Arc<Scorer>,
    ) -> Self {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("quick-open-score-{index}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(error) => {
                log::warn!("scoring pool unavailable, using the global pool: {error}");
                None
            }
        };
        let (results, _) = watch::channel(RankedResults::default());

        Self {
            shared: Arc::new(EngineShared {
                working_directory,
                candidates,
                gate,
                max_results: config.max_results,
                chunk_size: config.chunk_size,
                pool,
                scorer,
                versions: PassVersionTracker::new(),
                pass_lane: Mutex::new(()),
                publish_lock: Mutex::new(()),
                state: AtomicU8::new(PassState::Idle as u8),
                active_passes: AtomicUsize::new(0),
                results,
            }),
        }
    }

    /// Receiver for published ranked lists.
    pub fn subscribe(&self) -> watch::Receiver<RankedResults> {
        self.shared.results.subscribe()
    }

    /// The most recently published results.
    pub fn latest(&self) -> RankedResults {
        self.shared.results.borrow().clone()
    }

    pub fn state(&self) -> PassState {
        PassState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    /// True while any pass thread, including a cancelled one still
    /// draining, has not finished.
    pub fn is_busy(&self) -> bool {
        self.shared.active_passes.load(Ordering::SeqCst) > 0
    }

    /// Cancels the in-flight pass and starts a new one for `query`.
    ///
    /// Never blocks the caller, unless no pass thread can be started; the
    /// pass then runs on the caller's thread so its version still publishes.
    pub fn trigger(&self, query: &str) -> PassHandle {
        self.trigger_with(query, |job| {
            thread::Builder::new()
                .name("quick-open-filter".to_string())
                .spawn(job)
        })
    }

    fn trigger_with<S>(&self, query: &str, spawn: S) -> PassHandle
    where
        S: FnOnce(PassJob) -> io::Result<JoinHandle<PassOutcome>>,
    {
        let version = {
            let _publish = self.shared.publish_lock.lock();
            let version = self.shared.versions.next_version();
            self.shared
                .state
                .store(PassState::Running as u8, Ordering::SeqCst);
            version
        };
        let token = self.shared.versions.token_for_version(version);

        self.shared.active_passes.fetch_add(1, Ordering::SeqCst);
        let job: PassJob = {
            let shared = self.shared.clone();
            let query = query.to_string();
            let token = token.clone();
            Box::new(move || shared.run_tracked(&query, &token))
        };

        match spawn(job) {
            Ok(join_handle) => PassHandle {
                version,
                join_handle: Some(join_handle),
                outcome: None,
            },
            Err(error) => {
                log::warn!("failed to start filter pass {version}, running inline: {error}");
                let outcome = self.shared.run_tracked(query, &token);
                PassHandle {
                    version,
                    join_handle: None,
                    outcome: Some(outcome),
                }
            }
        }
    }

    /// Cancels the in-flight pass without starting another.
    pub fn cancel(&self) {
        let _publish = self.shared.publish_lock.lock();
        self.shared.versions.cancel_all();
        self.shared
            .state
            .store(PassState::Cancelled as u8, Ordering::SeqCst);
    }
}

impl EngineShared {
    fn run_tracked(&self, query: &str, token: &CancellationToken) -> PassOutcome {
        let outcome = self.run_pass(query, token);
        self.active_passes.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn run_pass(&self, query: &str, token: &CancellationToken) -> PassOutcome {
        let _lane = self.pass_lane.lock();
        if !token.is_active() {
            return PassOutcome::Cancelled;
        }

        let started = Instant::now();
        let _pause = self.gate.pause();
        let candidates = self.candidates.read();
        let scanned = candidates.len();

        let request = PassRequest {
            query,
            working_directory: &self.working_directory,
            max_results: self.max_results,
            chunk_size: self.chunk_size,
        };
        let ranked = rank_candidates_with(
            &candidates,
            &request,
            self.pool.as_ref(),
            token,
            self.scorer.as_ref(),
        );
        drop(candidates);

        let Some(entries) = ranked else {
            log::debug!(
                "filter pass {} cancelled after {}ms",
                token.version(),
                started.elapsed().as_millis()
            );
            return PassOutcome::Cancelled;
        };

        let published = entries.len();
        if !self.publish(token, query, entries, scanned) {
            return PassOutcome::Cancelled;
        }

        log::debug!(
            "filter pass {} query={:?} scanned={} published={} elapsed_ms={}",
            token.version(),
            query,
            scanned,
            published,
            started.elapsed().as_millis()
        );
        PassOutcome::Completed { published }
    }

    /// Publishes only if `token` is still the newest version.
    fn publish(
        &self,
        token: &CancellationToken,
        query: &str,
        entries: Vec<ScoredEntry>,
        scanned: usize,
    ) -> bool {
        let _publish = self.publish_lock.lock();
        if !token.is_active() || token.version() <= self.results.borrow().version {
            return false;
        }
        self.results.send_replace(RankedResults {
            version: token.version(),
            query: query.to_string(),
            entries,
            scanned,
        });
        self.state
            .store(PassState::Completed as u8, Ordering::SeqCst);
        true
    }
}
