use anyhow::Result;
use std::path::PathBuf;

use banalytiq_merge::{MergeConfig, SnapshotLocator};

use crate::report::print_candidates;

/// CLI: scan — список ожидающих снапшотов (oldest first), без изменений на диске.
pub fn exec(dir: PathBuf, json: bool) -> Result<()> {
    let cfg = MergeConfig::from_env();
    let found = SnapshotLocator::new(&dir, &cfg).locate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    if found.is_empty() {
        let (stem, ext) = cfg.base_stem_ext();
        println!("No timestamped database files found.");
        println!("Looking for files matching pattern: {stem}.{{timestamp}}.{ext}");
        return Ok(());
    }

    println!("Found {} timestamped database file(s):", found.len());
    print_candidates(&found);
    Ok(())
}
