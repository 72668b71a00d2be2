//! End-to-end runs over temporary directories.

use credsink::engine::db_ops::{BatchSink, CountingSink, FailFast};
use credsink::engine::{count_rows, load_rows, open_db};
use credsink::pipeline::run_pipeline;
use credsink::{Category, Credential, ImportError, ImportOpts, import_dir};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn opts(batch_size: usize, num_workers: usize) -> ImportOpts {
    ImportOpts {
        batch_size,
        num_workers,
        ..Default::default()
    }
}

#[test]
fn test_two_files_batch_size_one() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "a.txt", "alice;5f4dcc3b5aa765d61d8327deb882cf99\n");
    write(input.path(), "b.txt", "bob:hunter2\n");
    let out = tempfile::tempdir().unwrap();
    let db_path = out.path().join("out.db");

    let summary = import_dir(input.path(), &db_path, &opts(1, 2)).unwrap();
    assert_eq!(summary.files_discovered, 2);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.rows(Category::Md5), 1);
    assert_eq!(summary.rows(Category::Clear), 1);
    assert_eq!(summary.rows(Category::Sha1), 0);
    assert_eq!(summary.total_flushes(), 2);
    assert!(!summary.cancelled);

    let conn = open_db(&db_path, None).unwrap();
    assert_eq!(
        load_rows(&conn, Category::Md5).unwrap(),
        vec![(
            "alice".to_string(),
            "5f4dcc3b5aa765d61d8327deb882cf99".to_string()
        )]
    );
    assert_eq!(
        load_rows(&conn, Category::Clear).unwrap(),
        vec![("bob".to_string(), "hunter2".to_string())]
    );
    assert!(load_rows(&conn, Category::Sha1).unwrap().is_empty());
}

#[test]
fn test_malformed_line_is_dropped() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "dump.txt", "justonefield\ncarol|pw\n\n");
    let (summary, sink) = run_pipeline(
        input.path(),
        &opts(10, 1),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(summary.lines_skipped, 1);
    assert_eq!(summary.records_enqueued, 1);
    assert_eq!(summary.total_rows(), 1);
    assert_eq!(sink.row_count(Category::Clear), 1);
}

#[test]
fn test_totals_independent_of_concurrency() {
    let input = tempfile::tempdir().unwrap();
    for f in 0..12 {
        let mut content = String::new();
        for i in 0..50 {
            match i % 3 {
                0 => content.push_str(&format!("user{f}_{i}:plain{i}\n")),
                1 => content.push_str(&format!("user{f}_{i};5f4dcc3b5aa765d61d8327deb882cf99\n")),
                _ => content.push_str(&format!(
                    "user{f}_{i}|da39a3ee5e6b4b0d3255bfef95601890afd80709\n"
                )),
            }
        }
        write(input.path(), &format!("part{f}.txt"), &content);
    }

    let mut totals = Vec::new();
    for workers in [1, 8] {
        let (summary, sink) = run_pipeline(
            input.path(),
            &opts(7, workers),
            CountingSink::new(),
            Box::new(FailFast),
        )
        .unwrap();
        let per_category: Vec<usize> = Category::ALL
            .iter()
            .map(|c| sink.row_count(*c))
            .collect();
        totals.push((summary.total_rows(), per_category));
    }
    assert_eq!(totals[0], totals[1]);
    assert_eq!(totals[0].0, 600);
    assert_eq!(totals[0].1, vec![200, 200, 200]);
}

#[test]
fn test_flush_count_per_category() {
    let input = tempfile::tempdir().unwrap();
    let content: String = (0..25).map(|i| format!("u{i}:p{i}xyz\n")).collect();
    write(input.path(), "clear.txt", &content);
    let (summary, sink) = run_pipeline(
        input.path(),
        &opts(10, 3),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(sink.flush_count(Category::Clear), 3);
    assert_eq!(sink.flush_count(Category::Md5), 0);
    assert_eq!(sink.flushes.last(), Some(&(Category::Clear, 5)));
    assert_eq!(summary.tally(Category::Clear).flushes, 3);
}

#[test]
fn test_nested_dirs_and_suffix_filter() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "top.txt", "a:1\n");
    write(input.path(), "x/y/z/deep.txt", "b:2\n");
    write(input.path(), "x/notes.md", "c:3\n");
    write(input.path(), "x/y/archive.txt.bak", "d:4\n");

    let (summary, sink) = run_pipeline(
        input.path(),
        &opts(100, 4),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(summary.files_discovered, 2);
    assert_eq!(sink.row_count(Category::Clear), 2);

    let markdown = ImportOpts {
        suffix: ".md".to_string(),
        ..opts(100, 4)
    };
    let (summary, _) = run_pipeline(
        input.path(),
        &markdown,
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(summary.files_discovered, 1);
    assert_eq!(summary.total_rows(), 1);
}

#[test]
fn test_parallel_walk_finds_the_same_files() {
    let input = tempfile::tempdir().unwrap();
    for d in 0..5 {
        write(input.path(), &format!("d{d}/f.txt"), "a:1\nb:2\n");
    }
    let parallel = ImportOpts {
        parallel_walk: true,
        ..opts(100, 2)
    };
    let (summary, _) = run_pipeline(
        input.path(),
        &parallel,
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(summary.files_discovered, 5);
    assert_eq!(summary.total_rows(), 10);
}

#[test]
fn test_empty_dir_commits_nothing() {
    let input = tempfile::tempdir().unwrap();
    let (summary, sink) = run_pipeline(
        input.path(),
        &opts(10, 2),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert_eq!(summary.files_discovered, 0);
    assert_eq!(summary.total_rows(), 0);
    assert!(sink.flushes.is_empty());
}

#[test]
fn test_missing_root_is_a_walk_error() {
    let input = tempfile::tempdir().unwrap();
    let missing = input.path().join("does-not-exist");
    let err = run_pipeline(
        &missing,
        &opts(10, 2),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ImportError>(),
        Some(ImportError::Walk { .. })
    ));
}

#[test]
fn test_invalid_opts_fail_before_start() {
    let input = tempfile::tempdir().unwrap();
    let err = run_pipeline(
        input.path(),
        &opts(0, 2),
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ImportError>(),
        Some(ImportError::Config(_))
    ));
}

#[test]
fn test_pre_raised_cancel_stops_early() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "a.txt", "a:1\n");
    let cancelled = ImportOpts {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..opts(10, 2)
    };
    let (summary, _) = run_pipeline(
        input.path(),
        &cancelled,
        CountingSink::new(),
        Box::new(FailFast),
    )
    .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.files_processed, 0);
}

/// Rejects every batch.
struct RejectingSink;

impl BatchSink for RejectingSink {
    fn flush(&mut self, _: Category, _: &[Credential]) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

#[test]
fn test_failed_flush_shuts_down_with_tiny_queues() {
    let input = tempfile::tempdir().unwrap();
    for f in 0..40 {
        let content: String = (0..500).map(|i| format!("u{f}_{i}:pw{i}\n")).collect();
        write(input.path(), &format!("part{f}.txt"), &content);
    }
    let tight = ImportOpts {
        record_queue_cap: 1,
        path_queue_cap: Some(1),
        ..opts(3, 4)
    };

    let root = input.path().to_path_buf();
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let result = run_pipeline(&root, &tight, RejectingSink, Box::new(FailFast));
        let _ = done_tx.send(result.map(|(summary, _)| summary));
    });
    let err = done_rx
        .recv_timeout(Duration::from_secs(60))
        .expect("pipeline did not shut down after a failed flush")
        .unwrap_err();
    match err.downcast_ref::<ImportError>() {
        Some(ImportError::Flush {
            category, attempts, ..
        }) => {
            assert_eq!(*category, Category::Clear);
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// A good file plus a broken symlink: the walk fails and nothing reaches the database.
#[cfg(unix)]
#[test]
fn test_walk_error_commits_nothing() {
    for _ in 0..5 {
        let input = tempfile::tempdir().unwrap();
        let content: String = (0..50).map(|i| format!("user{i}:pw{i}\n")).collect();
        write(input.path(), "a_good.txt", &content);
        std::os::unix::fs::symlink(
            input.path().join("nowhere"),
            input.path().join("z_dangling.txt"),
        )
        .unwrap();
        let out = tempfile::tempdir().unwrap();
        let db_path = out.path().join("out.db");
        let following = ImportOpts {
            follow_links: true,
            ..opts(1000, 2)
        };

        let err = import_dir(input.path(), &db_path, &following).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::Walk { .. })
        ));
        let conn = open_db(&db_path, None).unwrap();
        for category in Category::ALL {
            assert_eq!(count_rows(&conn, category).unwrap(), 0);
        }
    }
}

/// `/proc/self/mem` opens fine but every read at offset 0 fails with EIO.
#[cfg(target_os = "linux")]
#[test]
fn test_unreadable_file_commits_nothing() {
    for _ in 0..10 {
        let input = tempfile::tempdir().unwrap();
        let content: String = (0..50).map(|i| format!("user{i}:pw{i}\n")).collect();
        write(input.path(), "a_good.txt", &content);
        std::os::unix::fs::symlink("/proc/self/mem", input.path().join("z_mem.txt")).unwrap();
        let out = tempfile::tempdir().unwrap();
        let db_path = out.path().join("out.db");
        let following = ImportOpts {
            follow_links: true,
            ..opts(1000, 2)
        };

        let err = import_dir(input.path(), &db_path, &following).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::ReadFile { .. })
        ));
        let conn = open_db(&db_path, None).unwrap();
        for category in Category::ALL {
            assert_eq!(count_rows(&conn, category).unwrap(), 0);
        }
    }
}
