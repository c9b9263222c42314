//! File discovery for a session.
//!
//! This module provides:
//! - The batch-producing directory scanner
//! - The gate that pauses the scanner while a filter pass reads candidates

mod gate;
mod scanner;

// Re-export main types
pub use gate::{GatePause, GateState, ScanGate};
pub use scanner::{FileScanner, ScanBatches};
