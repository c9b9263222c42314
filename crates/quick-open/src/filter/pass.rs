//! One filter pass: chunked parallel scoring followed by ranking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::cancel::CancellationToken;
use crate::score::{self, Score, NO_MATCH};
use crate::types::{FileEntry, ScoredEntry};

/// Inputs of one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassRequest<'a> {
    pub query: &'a str,
    pub working_directory: &'a Path,
    pub max_results: usize,
    pub chunk_size: usize,
}

/// What a pass scores each candidate against.
enum MatchTarget {
    /// Final path component against the raw query.
    FileName { query: String },
    /// Working-directory-relative path with separators removed, against the
    /// query with separators removed.
    RelativePath { prefix: String, query: String },
}

impl MatchTarget {
    fn for_query(query: &str, working_directory: &Path) -> Self {
        if !query.contains('/') {
            return Self::FileName {
                query: query.to_string(),
            };
        }
        let mut prefix = working_directory.to_string_lossy().into_owned();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self::RelativePath {
            prefix,
            query: query.replace('/', ""),
        }
    }

    fn query(&self) -> &str {
        match self {
            Self::FileName { query } | Self::RelativePath { query, .. } => query,
        }
    }

    fn score<F>(&self, entry: &FileEntry, scorer: &F) -> Score
    where
        F: Fn(&str, &str) -> Score + ?Sized,
    {
        match self {
            Self::FileName { query } => scorer(&entry.file_name(), query),
            Self::RelativePath { prefix, query } => {
                let path = entry.path().to_string_lossy();
                let relative = path.strip_prefix(prefix.as_str()).unwrap_or(&*path);
                scorer(&relative.replace('/', ""), query)
            }
        }
    }
}

/// Ranks `candidates` for `request.query` with the default scorer.
///
/// Returns `None` if the token was cancelled at any point; partial results
/// are never returned.
pub fn rank_candidates(
    candidates: &[FileEntry],
    request: &PassRequest<'_>,
    pool: Option<&ThreadPool>,
    cancel_token: &CancellationToken,
) -> Option<Vec<ScoredEntry>> {
    rank_candidates_with(candidates, request, pool, cancel_token, &score::score)
}

/// [`rank_candidates`] with a caller-supplied scoring function.
pub fn rank_candidates_with<F>(
    candidates: &[FileEntry],
    request: &PassRequest<'_>,
    pool: Option<&ThreadPool>,
    cancel_token: &CancellationToken,
    scorer: &F,
) -> Option<Vec<ScoredEntry>>
where
    F: Fn(&str, &str) -> Score + Sync + ?Sized,
{
    cancel_token.is_cancelled()?;

    let target = MatchTarget::for_query(request.query, request.working_directory);
    if target.query().is_empty() {
        return Some(first_candidates(candidates, request.max_results));
    }

    let chunk_size = request.chunk_size.max(1);
    let merged: Mutex<Vec<ScoredEntry>> = Mutex::new(Vec::new());

    let score_all = || {
        candidates
            .par_chunks(chunk_size)
            .enumerate()
            .for_each(|(chunk_index, chunk)| {
                if !cancel_token.is_active() {
                    return;
                }
                let offset = chunk_index * chunk_size;
                let scored = catch_unwind(AssertUnwindSafe(|| {
                    score_chunk(chunk, offset, &target, scorer, cancel_token)
                }));
                match scored {
                    Ok(scored) if !scored.is_empty() => merged.lock().extend(scored),
                    Ok(_) => {}
                    Err(_) => log::warn!(
                        "scoring chunk at offset {offset} panicked; dropping {} candidates",
                        chunk.len()
                    ),
                }
            });
    };
    match pool {
        Some(pool) => pool.install(score_all),
        None => score_all(),
    }

    cancel_token.is_cancelled()?;

    let mut results = merged.into_inner();
    results.sort_unstable_by(|a, b| b.score.cmp(&a.score).then_with(|| a.index.cmp(&b.index)));
    results.truncate(request.max_results);
    Some(results)
}

/// Empty-query fast path: discovery order, score 0.
fn first_candidates(candidates: &[FileEntry], max_results: usize) -> Vec<ScoredEntry> {
    candidates
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(index, entry)| ScoredEntry {
            score: NO_MATCH,
            path: entry.absolute_path.clone(),
            index,
        })
        .collect()
}

fn score_chunk<F>(
    chunk: &[FileEntry],
    offset: usize,
    target: &MatchTarget,
    scorer: &F,
    cancel_token: &CancellationToken,
) -> Vec<ScoredEntry>
where
    F: Fn(&str, &str) -> Score + ?Sized,
{
    let mut scored = Vec::new();
    for (i, entry) in chunk.iter().enumerate() {
        if !cancel_token.is_active() {
            return Vec::new();
        }
        let score = target.score(entry, scorer);
        if score > NO_MATCH {
            scored.push(ScoredEntry {
                score,
                path: entry.absolute_path.clone(),
                index: offset + i,
            });
        }
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::PassVersionTracker;
    use std::path::PathBuf;

    fn entries(paths: &[&str]) -> Vec<FileEntry> {
        paths.iter().map(|p| FileEntry::new(*p)).collect()
    }

    fn request<'a>(query: &'a str, root: &'a Path, max_results: usize) -> PassRequest<'a> {
        PassRequest {
            query,
            working_directory: root,
            max_results,
            chunk_size: 2,
        }
    }

    fn names(results: &[ScoredEntry]) -> Vec<String> {
        results
            .iter()
            .map(|r| r.path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn empty_query_returns_discovery_prefix() {
        let root = PathBuf::from("/r");
        let candidates = entries(&["/r/c", "/r/a", "/r/b"]);
        let token = CancellationToken::noop();

        let results = rank_candidates(&candidates, &request("", &root, 2), None, &token).unwrap();
        assert_eq!(names(&results), vec!["/r/c", "/r/a"]);
        assert!(results.iter().all(|r| r.score == 0));

        let all = rank_candidates(&candidates, &request("", &root, 10), None, &token).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn ranks_by_score_and_drops_non_matches() {
        let root = PathBuf::from("/r");
        let candidates = entries(&["/r/README.md", "/r/src/app/mainx.go", "/r/src/app/main.go"]);
        let token = CancellationToken::noop();

        let results = rank_candidates(&candidates, &request("main", &root, 10), None, &token).unwrap();
        assert_eq!(names(&results), vec!["/r/src/app/main.go", "/r/src/app/mainx.go"]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn equal_scores_keep_discovery_order() {
        let root = PathBuf::from("/r");
        let candidates = entries(&["/r/z/lib.rs", "/r/a/lib.rs", "/r/m/lib.rs", "/r/b/lib.rs", "/r/q/lib.rs"]);
        let token = CancellationToken::noop();

        let results = rank_candidates(&candidates, &request("lib", &root, 10), None, &token).unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn slash_in_query_matches_across_directories() {
        let root = PathBuf::from("/repo");
        let candidates = entries(&["/repo/src/app/main.go", "/repo/docs/main.go"]);
        let token = CancellationToken::noop();

        let results = rank_candidates(&candidates, &request("app/main", &root, 10), None, &token).unwrap();
        assert_eq!(names(&results)[0], "/repo/src/app/main.go");

        // Without the separator only the file name is considered.
        let by_name = rank_candidates(&candidates, &request("appmain", &root, 10), None, &token).unwrap();
        assert!(by_name.is_empty());
    }

    #[test]
    fn results_are_capped_and_sorted() {
        let root = PathBuf::from("/r");
        let candidates: Vec<FileEntry> = (0..10_000)
            .map(|i| FileEntry::new(format!("/r/dir{}/file{i}.txt", i % 37)))
            .collect();
        let token = CancellationToken::noop();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();

        let req = PassRequest {
            query: "file1",
            working_directory: &root,
            max_results: 500,
            chunk_size: 100,
        };
        let results = rank_candidates(&candidates, &req, Some(&pool), &token).unwrap();

        let matching = candidates
            .iter()
            .filter(|c| score::score(&c.file_name(), "file1") > NO_MATCH)
            .count();
        assert_eq!(results.len(), matching.min(500));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn repeated_pass_is_identical() {
        let root = PathBuf::from("/r");
        let candidates: Vec<FileEntry> = (0..1_000)
            .map(|i| FileEntry::new(format!("/r/m{}/mod{i}.rs", i % 13)))
            .collect();
        let token = CancellationToken::noop();

        let first = rank_candidates(&candidates, &request("mod", &root, 50), None, &token);
        let second = rank_candidates(&candidates, &request("mod", &root, 50), None, &token);
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_token_returns_none() {
        let root = PathBuf::from("/r");
        let candidates = entries(&["/r/a.rs"]);
        let tracker = PassVersionTracker::new();
        let token = tracker.token_for_version(tracker.next_version());
        tracker.cancel_all();

        assert!(rank_candidates(&candidates, &request("a", &root, 10), None, &token).is_none());
        assert!(rank_candidates(&candidates, &request("", &root, 10), None, &token).is_none());
    }

    #[test]
    fn cancellation_mid_pass_discards_results() {
        let root = PathBuf::from("/r");
        let candidates: Vec<FileEntry> = (0..200).map(|i| FileEntry::new(format!("/r/f{i}"))).collect();
        let tracker = PassVersionTracker::new();
        let token = tracker.token_for_version(tracker.next_version());

        let scorer = |candidate: &str, query: &str| {
            if candidate == "f50" {
                tracker.cancel_all();
            }
            score::score(candidate, query)
        };
        let result = rank_candidates_with(&candidates, &request("f", &root, 10), None, &token, &scorer);
        assert!(result.is_none());
    }

    #[test]
    fn panicking_chunk_contributes_nothing() {
        let root = PathBuf::from("/r");
        let candidates = entries(&["/r/a1", "/r/boom", "/r/a2", "/r/a3"]);
        let token = CancellationToken::noop();

        let scorer = |candidate: &str, query: &str| {
            if candidate == "boom" {
                panic!("scorer failure");
            }
            score::score(candidate, query)
        };
        // chunk_size 2: ["a1", "boom"] is lost, ["a2", "a3"] survives.
        let results = rank_candidates_with(&candidates, &request("a", &root, 10), None, &token, &scorer).unwrap();
        assert_eq!(names(&results), vec!["/r/a2", "/r/a3"]);
    }
}
