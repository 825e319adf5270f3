//! stage — локальная часть шага download.
//!
//! Скачанный (или иначе полученный) файл кладётся в рабочий каталог по соглашению об именах:
//! - базы ещё нет -> файл становится базой (<base_file>);
//! - база есть    -> <stem>.<now>.<ext>; если имя занято, timestamp увеличивается.
//!
//! Копирование идёт через <target>.part + rename, поэтому locator никогда не видит
//! недописанный снапшот. Существующие файлы не перезаписываются.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::util::now_secs;

/// Errors of the staging glue. They never reach the merge engine.
#[derive(Debug, Clone)]
pub enum StageError {
    /// Working directory is missing or not a directory.
    ConfigurationMissing(PathBuf),
    /// Downloaded source file is missing or unreadable.
    SourceUnavailable(PathBuf),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::ConfigurationMissing(p) => {
                write!(f, "working directory not found: {}", p.display())
            }
            StageError::SourceUnavailable(p) => {
                write!(f, "source file not available: {}", p.display())
            }
        }
    }
}

impl std::error::Error for StageError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum StagedAs {
    Base,
    Snapshot { timestamp: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub path: PathBuf,
    #[serde(flatten)]
    pub role: StagedAs,
}

/// Place `source` into `dir` using the current time for a snapshot name.
pub fn stage_file(dir: &Path, source: &Path, cfg: &MergeConfig) -> Result<StagedFile> {
    stage_file_at(dir, source, cfg, now_secs())
}

/// Same as `stage_file`, with an explicit creation timestamp.
pub fn stage_file_at(dir: &Path, source: &Path, cfg: &MergeConfig, ts: u64) -> Result<StagedFile> {
    if !dir.is_dir() {
        return Err(StageError::ConfigurationMissing(dir.to_path_buf()).into());
    }
    if !source.is_file() {
        return Err(StageError::SourceUnavailable(source.to_path_buf()).into());
    }

    let base = cfg.base_path(dir);
    let (target, role) = if !base.exists() {
        (base, StagedAs::Base)
    } else {
        let mut ts = ts;
        loop {
            let p = dir.join(cfg.snapshot_name(ts));
            if !p.exists() && !cfg.retired_path(&p).exists() {
                break (p, StagedAs::Snapshot { timestamp: ts });
            }
            ts += 1;
        }
    };

    copy_into_place(source, &target)?;

    match &role {
        StagedAs::Base => info!("staged {} as base store", target.display()),
        StagedAs::Snapshot { .. } => {
            info!("base store already exists, staged as {}", target.display())
        }
    }

    Ok(StagedFile { path: target, role })
}

fn part_path(target: &Path) -> PathBuf {
    let mut part = target.as_os_str().to_os_string();
    part.push(".part");
    PathBuf::from(part)
}

// copy -> <target>.part -> rename. On any failure the .part file is removed.
fn copy_into_place(source: &Path, target: &Path) -> Result<()> {
    let part = part_path(target);
    let res = fs::copy(source, &part)
        .with_context(|| format!("copy {} -> {}", source.display(), part.display()))
        .and_then(|_| {
            fs::rename(&part, target)
                .with_context(|| format!("rename {} -> {}", part.display(), target.display()))
        });
    if res.is_err() && part.is_file() {
        if let Err(e) = fs::remove_file(&part) {
            warn!("stage: cannot remove {}: {}", part.display(), e);
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bqtest-stage-unit-{name}-{}-{}",
            std::process::id(),
            now_secs()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn failed_rename_leaves_no_part_file() {
        let dir = scratch("rename");
        let src = dir.join("incoming.bin");
        fs::write(&src, b"payload").unwrap();
        // Непустой каталог на месте цели: rename файла поверх него невозможен.
        let target = dir.join("banalytiq.9.db");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let err = copy_into_place(&src, &target).expect_err("rename onto a directory");
        assert!(format!("{:#}", err).contains("rename"));
        assert!(!part_path(&target).exists());
        assert_eq!(fs::read(target.join("keep")).unwrap(), b"x");
        assert_eq!(fs::read(&src).unwrap(), b"payload");
    }

    #[test]
    fn successful_copy_replaces_part_with_target() {
        let dir = scratch("ok");
        let src = dir.join("incoming.bin");
        fs::write(&src, b"payload").unwrap();
        let target = dir.join("banalytiq.db");

        copy_into_place(&src, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert!(!part_path(&target).exists());
    }
}
