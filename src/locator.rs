//! Snapshot locator: find pending `<stem>.<ts>.<ext>` files next to the base store.
//!
//! - The base file itself and anything ending in the retirement suffix are excluded.
//! - Names that do not follow the pattern are not snapshots and are skipped silently.
//! - Result is ordered oldest-first (timestamp, then name).
//!
//! Read-only: nothing in the directory is touched.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;

/// One pending snapshot discovered in the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotFile {
    pub name: String,
    pub path: PathBuf,
    /// Creation time embedded in the name (Unix seconds).
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct SnapshotLocator {
    dir: PathBuf,
    base_file: String,
    stem: String,
    ext: String,
    retire_suffix: String,
}

impl SnapshotLocator {
    pub fn new(dir: &Path, cfg: &MergeConfig) -> Self {
        let (stem, ext) = cfg.base_stem_ext();
        Self {
            dir: dir.to_path_buf(),
            base_file: cfg.base_file.clone(),
            stem: stem.to_string(),
            ext: ext.to_string(),
            retire_suffix: cfg.retire_suffix.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory and return candidates oldest-first.
    pub fn locate(&self) -> Result<Vec<SnapshotFile>> {
        let rd = fs::read_dir(&self.dir)
            .with_context(|| format!("read_dir {}", self.dir.display()))?;

        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.with_context(|| format!("read_dir entry in {}", self.dir.display()))?;
            let name = match entry.file_name().into_string() {
                Ok(s) => s,
                Err(_) => continue,
            };
            let Some(ts) = self.parse_name(&name) else {
                continue;
            };
            // Каталоги/сокеты с подходящим именем снапшотами не являются;
            // symlink проверяется по цели (битые и на каталог отбрасываются).
            if !entry.path().is_file() {
                debug!("locate: skip non-file {}", name);
                continue;
            }
            out.push(SnapshotFile {
                path: entry.path(),
                name,
                timestamp: ts,
            });
        }

        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.name.cmp(&b.name)));
        debug!(
            "locate: {} candidate(s) in {}",
            out.len(),
            self.dir.display()
        );
        Ok(out)
    }

    /// `Some(ts)` if `name` is an active snapshot name, else None.
    pub fn parse_name(&self, name: &str) -> Option<u64> {
        if name == self.base_file {
            return None;
        }
        if !self.retire_suffix.is_empty() && name.ends_with(&self.retire_suffix) {
            return None;
        }

        let rest = name.strip_prefix(&self.stem)?.strip_prefix('.')?;
        let digits = if self.ext.is_empty() {
            rest
        } else {
            rest.strip_suffix(&self.ext)?.strip_suffix('.')?
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Переполнение u64 -> не снапшот.
        digits.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> SnapshotLocator {
        SnapshotLocator::new(Path::new("."), &MergeConfig::default())
    }

    #[test]
    fn parse_accepts_snapshot_names() {
        let l = locator();
        assert_eq!(l.parse_name("banalytiq.1700000000.db"), Some(1_700_000_000));
        assert_eq!(l.parse_name("banalytiq.0.db"), Some(0));
    }

    #[test]
    fn parse_rejects_everything_else() {
        let l = locator();
        for name in [
            "banalytiq.db",
            "banalytiq.1700000000.db.bak",
            "banalytiq..db",
            "banalytiq.12a.db",
            "banalytiq.-5.db",
            "banalytiq.123.sqlite",
            "other.123.db",
            "banalytiq.123.db-wal",
            "banalytiq.99999999999999999999999.db",
            "xbanalytiq.1.db",
        ] {
            assert_eq!(l.parse_name(name), None, "{name} must not match");
        }
    }

    #[test]
    fn parse_honors_custom_base_and_suffix() {
        let cfg = MergeConfig::default()
            .with_base_file("visits.sqlite")
            .with_retire_suffix(".done");
        let l = SnapshotLocator::new(Path::new("."), &cfg);
        assert_eq!(l.parse_name("visits.42.sqlite"), Some(42));
        assert_eq!(l.parse_name("visits.42.sqlite.done"), None);
        assert_eq!(l.parse_name("banalytiq.42.db"), None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_judged_by_their_target() {
        use std::os::unix::fs::symlink;

        let dir = std::env::temp_dir().join(format!(
            "bqtest-locate-links-{}-{}",
            std::process::id(),
            crate::util::now_secs()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("real-dir")).unwrap();
        std::fs::write(dir.join("real.db"), b"").unwrap();
        symlink(dir.join("real.db"), dir.join("banalytiq.10.db")).unwrap();
        symlink(dir.join("real-dir"), dir.join("banalytiq.20.db")).unwrap();
        symlink(dir.join("gone.db"), dir.join("banalytiq.30.db")).unwrap();

        let found = SnapshotLocator::new(&dir, &MergeConfig::default())
            .locate()
            .unwrap();
        let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["banalytiq.10.db"]);
    }
}
