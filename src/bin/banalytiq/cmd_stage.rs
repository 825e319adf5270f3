use anyhow::Result;
use std::path::PathBuf;

use banalytiq_merge::stage::{stage_file, StagedAs};
use banalytiq_merge::{BatchOrchestrator, MergeConfig};

use crate::report::print_batch;

/// CLI: stage — положить скачанный файл в каталог по соглашению об именах,
/// затем (если не --no-merge) выполнить merge.
pub fn exec(dir: PathBuf, file: PathBuf, no_merge: bool, json: bool) -> Result<()> {
    let cfg = MergeConfig::from_env();
    let staged = stage_file(&dir, &file, &cfg)?;

    if !json {
        match &staged.role {
            StagedAs::Base => println!("Staged as base store: {}", staged.path.display()),
            StagedAs::Snapshot { .. } => println!("Staged as: {}", staged.path.display()),
        }
    }

    if no_merge {
        if json {
            println!("{}", serde_json::to_string_pretty(&staged)?);
        } else {
            println!("Skipping merge step (--no-merge specified)");
        }
        return Ok(());
    }

    let report = BatchOrchestrator::new(cfg).merge_all(&dir)?;
    if json {
        let v = serde_json::json!({
            "staged": staged,
            "merge": report,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }
    print_batch(&report, false)
}
