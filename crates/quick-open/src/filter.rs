//! Ranking of candidates against the current query.
//!
//! This module provides:
//! - The chunked, parallel scoring pass
//! - The engine that cancels, serializes and publishes passes

mod engine;
mod pass;

// Re-export main types
pub use engine::{FilterEngine, PassHandle, PassOutcome};
pub use pass::{rank_candidates, rank_candidates_with, PassRequest};
