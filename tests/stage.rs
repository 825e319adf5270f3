use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use banalytiq_merge::stage::{stage_file, stage_file_at, StageError, StagedAs};
use banalytiq_merge::{AnalyticsStore, BatchOrchestrator, MergeConfig, Record};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("bqtest-stage-{prefix}-{pid}-{t}-{id}"))
}

fn make_store(path: &Path, records: &[Record]) -> Result<()> {
    let mut s = AnalyticsStore::create(path)?;
    s.insert_many(records)?;
    Ok(())
}

/// download -> stage -> merge: первый файл становится базой, второй — снапшотом.
#[test]
fn first_download_becomes_base_then_snapshots() -> Result<()> {
    let root = unique_root("flow");
    let inbox = unique_root("inbox");
    fs::create_dir_all(&root)?;
    fs::create_dir_all(&inbox)?;
    let cfg = MergeConfig::default();

    let dl1 = inbox.join("download-1.db");
    make_store(&dl1, &[Record::new("4.4.4.4", 1, "/", 200)])?;
    let s1 = stage_file(&root, &dl1, &cfg)?;
    assert_eq!(s1.role, StagedAs::Base);
    assert_eq!(s1.path, cfg.base_path(&root));

    let dl2 = inbox.join("download-2.db");
    make_store(
        &dl2,
        &[
            Record::new("4.4.4.4", 1, "/", 200),
            Record::new("4.4.4.4", 2, "/next", 200),
        ],
    )?;
    let s2 = stage_file_at(&root, &dl2, &cfg, 1_700_000_000)?;
    assert_eq!(
        s2.role,
        StagedAs::Snapshot {
            timestamp: 1_700_000_000
        }
    );
    assert_eq!(s2.path, root.join("banalytiq.1700000000.db"));
    assert!(dl2.exists(), "source is copied, not moved");

    let rep = BatchOrchestrator::new(cfg.clone()).merge_all(&root)?;
    assert_eq!(rep.succeeded(), 1);
    assert_eq!(rep.rows_inserted(), 1);
    assert_eq!(AnalyticsStore::open(&cfg.base_path(&root))?.count()?, 2);
    Ok(())
}

#[test]
fn taken_names_bump_the_timestamp() -> Result<()> {
    let root = unique_root("bump");
    fs::create_dir_all(&root)?;
    let cfg = MergeConfig::default();
    make_store(&cfg.base_path(&root), &[])?;
    fs::write(root.join("banalytiq.500.db"), b"pending")?;
    fs::write(root.join("banalytiq.501.db.bak"), b"retired")?;

    let src = root.join("incoming.bin");
    fs::write(&src, b"payload")?;

    let s = stage_file_at(&root, &src, &cfg, 500)?;
    assert_eq!(s.role, StagedAs::Snapshot { timestamp: 502 });
    assert_eq!(fs::read(root.join("banalytiq.500.db"))?, b"pending");
    assert_eq!(fs::read(&s.path)?, b"payload");
    assert!(!root.join("banalytiq.502.db.part").exists());
    Ok(())
}

#[test]
fn missing_source_or_dir_is_typed() -> Result<()> {
    let root = unique_root("errors");
    fs::create_dir_all(&root)?;
    let cfg = MergeConfig::default();

    let err = stage_file(&root, &root.join("nope.db"), &cfg).expect_err("no source");
    assert!(matches!(
        err.downcast_ref::<StageError>(),
        Some(StageError::SourceUnavailable(_))
    ));

    let src = root.join("x.db");
    fs::write(&src, b"x")?;
    let err = stage_file(&root.join("missing-dir"), &src, &cfg).expect_err("no dir");
    assert!(matches!(
        err.downcast_ref::<StageError>(),
        Some(StageError::ConfigurationMissing(_))
    ));
    Ok(())
}
