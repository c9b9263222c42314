use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use quick_open::{QuickOpenConfig, QuickOpenManager, SessionHandle, SessionSnapshot};
use tempfile::TempDir;
use tokio::time::timeout;

fn build_tree(root: &Path) {
    for module in 0..12 {
        let dir = root.join(format!("src/module{module}"));
        fs::create_dir_all(&dir).unwrap();
        for file in 0..100 {
            File::create(dir.join(format!("item{file}.rs"))).unwrap();
        }
    }
    fs::create_dir_all(root.join(".git/objects")).unwrap();
    File::create(root.join(".git/objects/item1.rs")).unwrap();
    fs::create_dir_all(root.join("target/debug")).unwrap();
    File::create(root.join("target/debug/item1.rs")).unwrap();
    File::create(root.join("src/module3/item7.o")).unwrap();
}

async fn settled(manager: &QuickOpenManager, handle: SessionHandle, query: &str) -> SessionSnapshot {
    let mut receiver = manager.subscribe(handle).unwrap();
    let snapshot = timeout(
        Duration::from_secs(10),
        receiver.wait_for(|s| s.query == query && !s.scan_in_progress && !s.filter_in_progress),
    )
    .await
    .expect("session did not settle")
    .expect("session ended")
    .clone();
    snapshot
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_session_lifecycle() {
    let temp = TempDir::new().unwrap();
    build_tree(temp.path());

    let manager = QuickOpenManager::new(QuickOpenConfig {
        max_results: 50,
        scan_batch_size: 100,
        chunk_size: 64,
        debounce_ms: 20,
        worker_threads: 3,
        ..QuickOpenConfig::default()
    });
    let handle = manager.start_session(temp.path()).unwrap();

    // Empty query: the first discovered files, unscored.
    let initial = settled(&manager, handle, "").await;
    assert_eq!(initial.discovered_count, 1_200);
    assert_eq!(initial.ranked_results.len(), 50);
    assert!(initial.ranked_results.iter().all(|entry| entry.score == 0));
    let indices: Vec<usize> = initial.ranked_results.iter().map(|e| e.index).collect();
    assert_eq!(indices, (0..50).collect::<Vec<_>>());

    let stats = initial.scan_stats.unwrap();
    assert_eq!(stats.files, 1_200);
    assert_eq!(stats.ignored, 3);
    assert!(!stats.stopped);

    // Rapid typing settles on the last query.
    for text in ["i", "it", "ite", "item1"] {
        manager.update_query(handle, text).unwrap();
    }
    let ranked = settled(&manager, handle, "item1").await;
    assert_eq!(ranked.ranked_results.len(), 50);
    assert!(ranked
        .ranked_results
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
    assert!(ranked
        .ranked_results
        .iter()
        .all(|entry| !entry.path.starts_with(temp.path().join("target"))));

    // A separator switches matching to the relative path.
    manager.update_query(handle, "module3/item7").unwrap();
    let by_path = settled(&manager, handle, "module3/item7").await;
    let best = by_path.ranked_results[0]
        .path
        .strip_prefix(&by_path.working_directory)
        .unwrap()
        .to_path_buf();
    assert_eq!(best, Path::new("src/module3/item7.rs"));

    // Same query over unchanged candidates: same ranking.
    manager.update_query(handle, "item1").unwrap();
    let again = settled(&manager, handle, "item1").await;
    assert_eq!(again.ranked_results, ranked.ranked_results);

    let mut receiver = manager.subscribe(handle).unwrap();
    manager.end_session(handle).await.unwrap();
    let cleared = receiver.borrow_and_update().clone();
    assert!(cleared.ranked_results.is_empty());
    assert_eq!(cleared.discovered_count, 0);
    assert!(manager.update_query(handle, "item").is_err());
}
