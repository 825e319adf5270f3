use anyhow::Result;
use std::path::PathBuf;

use banalytiq_merge::{AnalyticsStore, MergeConfig, SnapshotLocator};

use crate::report::print_candidates;

/// CLI: status — число строк в базе и ожидающие снапшоты.
pub fn exec(dir: PathBuf, json: bool) -> Result<()> {
    let cfg = MergeConfig::from_env();
    let base = cfg.base_path(&dir);

    let base_rows = if base.exists() {
        Some(AnalyticsStore::open(&base)?.count()?)
    } else {
        None
    };
    let pending = SnapshotLocator::new(&dir, &cfg).locate()?;

    if json {
        let v = serde_json::json!({
            "config": cfg.to_string(),
            "base": base,
            "base_rows": base_rows,
            "pending": pending,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    println!("{}", cfg);
    match base_rows {
        Some(n) => println!("Base store {}: {} row(s)", base.display(), n),
        None => println!("Base store {}: missing", base.display()),
    }
    println!("Pending snapshots: {}", pending.len());
    print_candidates(&pending);
    Ok(())
}
