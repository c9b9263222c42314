//! Fuzzy quick-open over a working directory.
//!
//! This crate provides:
//! - Ignore-pattern filtering and batched directory scanning
//! - Fuzzy scoring and chunked parallel ranking of discovered files
//! - A filter engine that cancels stale passes and publishes only fresh ones
//! - Debounced, observable sessions and a manager keyed by session handle

pub mod cancel;
pub mod candidates;
pub mod config;
pub mod error;
pub mod filter;
pub mod ignore;
pub mod scan;
pub mod score;
pub mod session;
pub mod types;

// Re-export main types
pub use cancel::{CancellationToken, PassVersionTracker};
pub use candidates::CandidateSet;
pub use config::QuickOpenConfig;
pub use error::{QuickOpenError, Result};
pub use filter::{FilterEngine, PassHandle, PassOutcome};
pub use ignore::{IgnoreRule, IgnoreRules};
pub use scan::{FileScanner, GateState, ScanGate};
pub use score::{score, Score};
pub use session::{QuickOpenManager, QuickOpenSession, SessionHandle, SessionSnapshot};
pub use types::{FileEntry, PassState, RankedResults, ScanStats, ScoredEntry};
