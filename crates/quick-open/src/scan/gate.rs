//! Pause/resume gate between the scanner and filter passes.

use parking_lot::{Condvar, Mutex};

use crate::candidates::CandidateSet;
use crate::types::FileEntry;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GateState {
    Open,
    Paused,
}

/// Coordinates the scanner (producer) with filter passes (consumer).
///
/// A pass pauses the gate for its whole duration through a [`GatePause`]
/// guard. The scanner appends only through [`append_when_open`], which waits
/// until no pause is held and performs the append under the gate lock, so a
/// pass can never observe the candidate list mid-append.
///
/// Pauses are counted: a cancelled pass still draining and its replacement
/// may briefly overlap, and the gate reopens only when both are done.
///
/// [`append_when_open`]: ScanGate::append_when_open
#[derive(Debug, Default)]
pub struct ScanGate {
    pauses: Mutex<usize>,
    resumed: Condvar,
}

impl ScanGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        if *self.pauses.lock() > 0 {
            GateState::Paused
        } else {
            GateState::Open
        }
    }

    /// Pauses the scanner until the returned guard is dropped.
    ///
    /// Blocks only while a scanner append is in progress.
    pub fn pause(&self) -> GatePause<'_> {
        *self.pauses.lock() += 1;
        GatePause { gate: self }
    }

    /// Blocks while the gate is paused, then appends `batch`.
    ///
    /// Returns the candidate count after the append.
    pub fn append_when_open(&self, candidates: &CandidateSet, batch: Vec<FileEntry>) -> usize {
        let mut pauses = self.pauses.lock();
        while *pauses > 0 {
            self.resumed.wait(&mut pauses);
        }
        candidates.append(batch)
    }

    fn release(&self) {
        let mut pauses = self.pauses.lock();
        *pauses = pauses.saturating_sub(1);
        if *pauses == 0 {
            self.resumed.notify_all();
        }
    }
}

/// Scoped pause; reopens the gate on drop, including during unwinding.
#[derive(Debug)]
pub struct GatePause<'a> {
    gate: &'a ScanGate,
}

impl Drop for GatePause<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
