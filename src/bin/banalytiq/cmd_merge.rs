use anyhow::Result;
use std::path::PathBuf;

use banalytiq_merge::{BatchOrchestrator, MergeConfig};

use crate::report::print_batch;

/// CLI: merge — только слияние уже лежащих в каталоге timestamped-снапшотов.
/// Ошибка (exit 1) — только если нет базы или каталог нельзя прочитать;
/// сбои отдельных файлов попадают в отчёт.
pub fn exec(dir: PathBuf, json: bool) -> Result<()> {
    let cfg = MergeConfig::from_env();
    let report = BatchOrchestrator::new(cfg).merge_all(&dir)?;
    print_batch(&report, json)
}
