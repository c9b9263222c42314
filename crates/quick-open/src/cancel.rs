//! Cancellation tokens for filter passes.
//!
//! Every trigger of the filter engine allocates a new pass version. A token
//! remembers the version it was created for and reports itself cancelled as
//! soon as the tracker has moved on, so starting a newer pass implicitly
//! cancels every older one without touching them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of pass versions. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct PassVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl PassVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next version; tokens for earlier versions go stale.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Cancels whatever is in flight without starting anything new.
    pub fn cancel_all(&self) {
        self.next_version();
    }

    /// Token that stays live while `version` is the tracker's newest.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: Some(self.active_version.clone()),
            version,
        }
    }
}

/// Checked by pass workers between items.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    /// `None` for a token nothing can cancel.
    active_version: Option<Arc<AtomicU64>>,
    version: u64,
}

impl CancellationToken {
    /// A token that never reports cancellation.
    #[inline]
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// `None` once a newer version exists, so workers can bail out with `?`.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        match &self.active_version {
            Some(active) if active.load(Ordering::Relaxed) != self.version => None,
            _ => Some(()),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_cancelled().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_tokens_stay_active() {
        assert!(CancellationToken::noop().is_active());
        assert!(CancellationToken::default().is_cancelled().is_some());
    }

    #[test]
    fn newer_version_cancels_older_tokens() {
        let tracker = PassVersionTracker::new();
        let first = tracker.token_for_version(tracker.next_version());
        assert!(first.is_active());

        let second = tracker.token_for_version(tracker.next_version());
        assert!(first.is_cancelled().is_none());
        assert!(second.is_active());
        assert_eq!(second.version(), 2);
    }

    #[test]
    fn cancel_all_cancels_current_token() {
        let tracker = PassVersionTracker::new();
        let token = tracker.token_for_version(tracker.next_version());
        tracker.cancel_all();
        assert!(!token.is_active());
        assert_eq!(tracker.current_version(), 2);
    }

    #[test]
    fn clones_share_one_counter() {
        let tracker = PassVersionTracker::new();
        let token = tracker.token_for_version(tracker.next_version());
        tracker.clone().next_version();
        assert!(!token.is_active());
    }
}
