//! merge/batch — пакетный прогон: locate -> merge_one для каждого кандидата -> BatchReport.
//!
//! - Отсутствие базы — единственная фатальная ошибка всего прогона (BaseStoreMissing).
//! - Нет кандидатов — пустой отчёт (успех).
//! - Ошибка одного снапшота фиксируется в отчёте и не останавливает остальные.
//! - Между файлами атомарности нет: каждый merge атомарен сам по себе.

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::locator::{SnapshotFile, SnapshotLocator};
use crate::util::format_utc;

use super::engine::MergeEngine;
use super::outcome::MergeOutcome;

/// The base store is absent: no merge is well-defined, the whole batch stops.
#[derive(Debug, Clone)]
pub struct BaseStoreMissing {
    pub path: PathBuf,
}

impl fmt::Display for BaseStoreMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "base database file not found: {}", self.path.display())
    }
}

impl std::error::Error for BaseStoreMissing {}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub timestamp: u64,
    pub outcome: MergeOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn rows_inserted(&self) -> u64 {
        self.files.iter().map(|f| f.outcome.inserted()).sum()
    }

    pub fn rename_warnings(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome.rename_warning().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, file: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.file == file)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    cfg: MergeConfig,
    engine: MergeEngine,
}

impl BatchOrchestrator {
    pub fn new(cfg: MergeConfig) -> Self {
        let engine = MergeEngine::new(&cfg);
        Self { cfg, engine }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.cfg
    }

    /// Merge every pending snapshot in `dir` into the base store, oldest first.
    ///
    /// Err only when the base store is missing (BaseStoreMissing) or the directory
    /// cannot be scanned; per-file failures land in the report.
    pub fn merge_all(&self, dir: &Path) -> Result<BatchReport> {
        let base = self.cfg.base_path(dir);
        if !base.exists() {
            return Err(BaseStoreMissing { path: base }.into());
        }

        let candidates = SnapshotLocator::new(dir, &self.cfg).locate()?;
        if candidates.is_empty() {
            let (stem, ext) = self.cfg.base_stem_ext();
            info!("no timestamped database files found (pattern {stem}.{{timestamp}}.{ext})");
            return Ok(BatchReport::default());
        }

        info!(
            "found {} timestamped database file(s) to merge:",
            candidates.len()
        );
        for c in &candidates {
            info!("  - {} (timestamp: {})", c.name, format_utc(c.timestamp));
        }

        let mut report = BatchReport::default();
        for c in candidates {
            report.files.push(self.merge_candidate(&base, c));
        }

        info!(
            "merge summary: total={} succeeded={} failed={} rows_inserted={}",
            report.total(),
            report.succeeded(),
            report.failed(),
            report.rows_inserted()
        );
        Ok(report)
    }

    fn merge_candidate(&self, base: &Path, c: SnapshotFile) -> FileReport {
        info!("=== processing {} ===", c.name);
        let outcome = self.engine.merge_one(base, &c.path);
        match &outcome {
            MergeOutcome::Success { inserted, .. } => {
                info!("merged {}: {} new record(s)", c.name, inserted)
            }
            MergeOutcome::Failure(f) => warn!("failed to merge {}: {}", c.name, f),
        }
        FileReport {
            file: c.name,
            timestamp: c.timestamp,
            outcome,
        }
    }
}
