use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

use super::debounce::Debouncer;
use super::{SessionEvent, SessionSnapshot};
use crate::filter::FilterEngine;
use crate::types::RankedResults;

/// Owns all mutable session state. Runs as a single tokio task.
pub(super) struct SessionActor {
    generation: u64,
    engine: FilterEngine,
    stop_scan: Arc<AtomicBool>,
    debouncer: Debouncer,
    /// Version of the most recently triggered pass.
    last_pass_version: u64,
    state: SessionSnapshot,
    published: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    pub(super) fn new(
        generation: u64,
        engine: FilterEngine,
        stop_scan: Arc<AtomicBool>,
        debounce: Duration,
        state: SessionSnapshot,
        published: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            generation,
            engine,
            stop_scan,
            debouncer: Debouncer::new(debounce),
            last_pass_version: 0,
            state,
            published,
        }
    }

    pub(super) async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        let mut results = self.engine.subscribe();
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(SessionEvent::End) | None => break,
                        Some(event) => self.handle(event),
                    }
                }
                changed = results.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let ranked = results.borrow_and_update().clone();
                    self.apply_results(ranked);
                }
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(query) = self.debouncer.take_ready(Instant::now()) {
                        self.state.query = query;
                        self.trigger_pass();
                    }
                }
            }
        }
        self.shutdown();
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::QueryChanged(text) => self.debouncer.push(text, Instant::now()),
            SessionEvent::BatchAppended {
                generation,
                discovered,
            } => {
                if !self.is_current(generation) {
                    return;
                }
                self.state.discovered_count = discovered;
                self.trigger_pass();
            }
            SessionEvent::ScanFinished { generation, stats } => {
                if !self.is_current(generation) {
                    return;
                }
                self.state.scan_in_progress = false;
                self.state.scan_stats = Some(stats);
                self.publish();
            }
            SessionEvent::End => {}
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation == self.generation {
            return true;
        }
        log::debug!(
            "dropping event from session {generation}; live session is {}",
            self.generation
        );
        false
    }

    fn trigger_pass(&mut self) {
        let pass = self.engine.trigger(&self.state.query);
        self.last_pass_version = pass.version();
        self.state.filter_in_progress = true;
        self.publish();
    }

    fn apply_results(&mut self, ranked: RankedResults) {
        if ranked.version == 0 {
            return;
        }
        self.state.ranked_results = ranked.entries;
        self.state.filter_in_progress = ranked.version < self.last_pass_version;
        self.publish();
    }

    fn publish(&self) {
        self.published.send_replace(self.state.clone());
    }

    fn shutdown(&mut self) {
        self.engine.cancel();
        self.stop_scan.store(true, Ordering::SeqCst);
        self.state = SessionSnapshot {
            generation: self.generation,
            ..SessionSnapshot::default()
        };
        self.publish();
        log::info!("quick-open session end generation={}", self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CandidateSet;
    use crate::config::QuickOpenConfig;
    use crate::scan::ScanGate;
    use crate::types::{FileEntry, ScanStats};
    use std::path::PathBuf;
    use tokio::time::timeout;

    fn actor_for(generation: u64) -> (SessionActor, watch::Receiver<SessionSnapshot>, Arc<CandidateSet>) {
        let candidates = Arc::new(CandidateSet::new());
        let engine = FilterEngine::new(
            PathBuf::from("/r"),
            candidates.clone(),
            Arc::new(ScanGate::new()),
            &QuickOpenConfig::default(),
        );
        let initial = SessionSnapshot {
            generation,
            working_directory: PathBuf::from("/r"),
            scan_in_progress: true,
            ..SessionSnapshot::default()
        };
        let (tx, rx) = watch::channel(initial.clone());
        let actor = SessionActor::new(
            generation,
            engine,
            Arc::new(AtomicBool::new(false)),
            Duration::from_millis(5),
            initial,
            tx,
        );
        (actor, rx, candidates)
    }

    #[tokio::test]
    async fn events_from_other_generations_are_dropped() {
        let (actor, mut snapshots, candidates) = actor_for(2);
        candidates.append(vec![FileEntry::new("/r/late.rs")]);
        let (events, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(actor.run(receiver));

        events
            .send(SessionEvent::BatchAppended {
                generation: 1,
                discovered: 1,
            })
            .unwrap();
        events
            .send(SessionEvent::ScanFinished {
                generation: 1,
                stats: ScanStats::default(),
            })
            .unwrap();
        events
            .send(SessionEvent::ScanFinished {
                generation: 2,
                stats: ScanStats::default(),
            })
            .unwrap();

        let snapshot = timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|s| !s.scan_in_progress),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(snapshot.discovered_count, 0);
        assert!(snapshot.ranked_results.is_empty());
        assert!(!snapshot.filter_in_progress);

        events.send(SessionEvent::End).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn debounced_query_publishes_latest_text() {
        let (actor, mut snapshots, candidates) = actor_for(1);
        candidates.append(vec![
            FileEntry::new("/r/alpha.rs"),
            FileEntry::new("/r/beta.rs"),
        ]);
        let (events, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(actor.run(receiver));

        for text in ["b", "be", "bet"] {
            events.send(SessionEvent::QueryChanged(text.to_string())).unwrap();
        }

        let snapshot = timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|s| s.query == "bet" && !s.filter_in_progress),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(snapshot.ranked_results.len(), 1);
        assert_eq!(snapshot.ranked_results[0].path, PathBuf::from("/r/beta.rs"));

        drop(events);
        task.await.unwrap();
        assert_eq!(snapshots.borrow().query, "");
    }
}
