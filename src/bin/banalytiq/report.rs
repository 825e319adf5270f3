use anyhow::Result;

use banalytiq_merge::locator::SnapshotFile;
use banalytiq_merge::metrics;
use banalytiq_merge::merge::{BatchReport, MergeOutcome};
use banalytiq_merge::util::format_utc;

/// Печать итогов пакетного merge (текст или JSON).
pub fn print_batch(rep: &BatchReport, json: bool) -> Result<()> {
    if json {
        let v = serde_json::json!({
            "total": rep.total(),
            "succeeded": rep.succeeded(),
            "failed": rep.failed(),
            "rows_inserted": rep.rows_inserted(),
            "rename_warnings": rep.rename_warnings(),
            "files": rep.files,
            "metrics": metrics::snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    if rep.is_empty() {
        println!("No timestamped database files found.");
        return Ok(());
    }

    for f in &rep.files {
        match &f.outcome {
            MergeOutcome::Success {
                inserted,
                rename_warning,
            } => {
                println!("✓ {}: merged {} new record(s)", f.file, inserted);
                if let Some(w) = rename_warning {
                    println!("  warning: {}", w);
                }
            }
            MergeOutcome::Failure(err) => println!("✗ {}: {}", f.file, err),
        }
    }

    println!();
    println!("=== FINAL SUMMARY ===");
    println!("  files_total      = {}", rep.total());
    println!("  files_succeeded  = {}", rep.succeeded());
    println!("  files_failed     = {}", rep.failed());
    println!("  rows_inserted    = {}", rep.rows_inserted());
    println!("  rename_warnings  = {}", rep.rename_warnings());
    Ok(())
}

pub fn print_candidates(files: &[SnapshotFile]) {
    for c in files {
        println!("  - {} (timestamp: {})", c.name, format_utc(c.timestamp));
    }
}
