use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum QuickOpenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Working directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No tokio runtime available to drive the session")]
    NoRuntime,

    #[error("Session not found: {0}")]
    SessionNotFound(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, QuickOpenError>;

/// Resolves `path` on disk, falling back to it unchanged when that fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}
