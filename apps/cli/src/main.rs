//! # quick-open
//!
//! Scans a directory and prints the files that best match each query.
//!
//! ## Usage
//!
//! - `quick-open ~/src/project` - list the first discovered files
//! - `quick-open ~/src/project main` - rank files for `main`
//! - `quick-open ~/src/project m ma main` - feed queries in turn, print the last

use std::path::{Path, PathBuf};

use clap::Parser;
use quick_open::{QuickOpenConfig, QuickOpenError, QuickOpenSession, Result, SessionSnapshot};
use tokio::sync::watch;

/// quick-open - fuzzy file finder for a working directory
#[derive(Parser)]
#[command(name = "quick-open")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fuzzy-find files under a directory")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of results to print
    #[arg(long)]
    max_results: Option<usize>,

    /// Directory to scan
    dir: PathBuf,

    /// Queries fed to the session in order; results are printed for the last
    queries: Vec<String>,
}

fn load_config(cli: &Cli) -> Result<QuickOpenConfig> {
    let mut config = match &cli.config {
        Some(path) => QuickOpenConfig::load(path)?,
        None => QuickOpenConfig::default(),
    };
    if let Some(max_results) = cli.max_results {
        config.max_results = max_results;
    }
    config.validate()?;
    Ok(config)
}

/// Waits until `query` has been ranked over the complete scan.
async fn settle(
    receiver: &mut watch::Receiver<SessionSnapshot>,
    query: &str,
) -> Result<SessionSnapshot> {
    let snapshot = receiver
        .wait_for(|s| s.query == query && !s.scan_in_progress && !s.filter_in_progress)
        .await
        .map_err(|_| QuickOpenError::Internal("session ended unexpectedly".to_string()))?;
    Ok(snapshot.clone())
}

fn print_results(snapshot: &SessionSnapshot, root: &Path) {
    for entry in &snapshot.ranked_results {
        let relative = entry.path.strip_prefix(root).unwrap_or(entry.path.as_path());
        println!("{}\t{}", entry.score, relative.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let session = QuickOpenSession::start(&cli.dir, &config)?;
    let mut receiver = session.subscribe();

    let mut snapshot = settle(&mut receiver, "").await?;
    for query in &cli.queries {
        session.update_query(query.as_str());
        snapshot = settle(&mut receiver, query).await?;
    }

    print_results(&snapshot, session.working_directory());
    log::info!(
        "quick-open query={:?} discovered={} shown={}",
        snapshot.query,
        snapshot.discovered_count,
        snapshot.ranked_results.len()
    );

    session.end().await;
    Ok(())
}
