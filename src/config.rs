//! Centralized configuration and builder for the merge engine.
//!
//! Goals:
//! - One explicit value threaded into SnapshotLocator / MergeEngine / BatchOrchestrator
//!   instead of a process-wide base filename constant.
//! - MergeConfig::from_env() reads the BQ_* env vars; builder/with_* override them.
//!
//! Base connection tuning (journal_wal, synchronous, cache_size) only affects
//! performance and crash behavior of the base store; the commit itself is always
//! a real SQLite COMMIT.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::{DEFAULT_BASE_FILE, DEFAULT_CACHE_SIZE, DEFAULT_RETIRE_SUFFIX};

/// PRAGMA synchronous level for the base connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
            SyncMode::Extra => "EXTRA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(SyncMode::Off),
            "normal" | "1" => Some(SyncMode::Normal),
            "full" | "2" => Some(SyncMode::Full),
            "extra" | "3" => Some(SyncMode::Extra),
            _ => None,
        }
    }
}

/// Top-level configuration for the merge engine.
#[derive(Clone, Debug)]
pub struct MergeConfig {
    /// Canonical base store filename; snapshots are `<stem>.<ts>.<ext>`.
    /// Env: BQ_BASE_FILE (default "banalytiq.db")
    pub base_file: String,

    /// Suffix appended to a snapshot name once it has been merged.
    /// Env: BQ_RETIRE_SUFFIX (default ".bak")
    pub retire_suffix: String,

    /// Rename merged snapshots; off keeps them in place (they re-merge with a zero delta).
    /// Env: BQ_RETIRE = 0|1 (default 1)
    pub retire: bool,

    /// Switch the base store to journal_mode=WAL before merging.
    /// Env: BQ_JOURNAL_WAL = 0|1 (default 1)
    pub journal_wal: bool,

    /// PRAGMA synchronous for the base connection.
    /// Env: BQ_SYNCHRONOUS = off|normal|full|extra (default normal)
    pub synchronous: SyncMode,

    /// PRAGMA cache_size for the base connection (pages if > 0, KiB if < 0).
    /// Env: BQ_CACHE_SIZE (default 50000)
    pub cache_size: i64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            base_file: DEFAULT_BASE_FILE.to_string(),
            retire_suffix: DEFAULT_RETIRE_SUFFIX.to_string(),
            retire: true,
            journal_wal: true,
            synchronous: SyncMode::Normal,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl MergeConfig {
    /// Load configuration from environment variables (unset/invalid -> default).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("BQ_BASE_FILE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.base_file = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("BQ_RETIRE_SUFFIX") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.retire_suffix = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("BQ_RETIRE") {
            cfg.retire = env_flag(&v);
        }

        if let Ok(v) = std::env::var("BQ_JOURNAL_WAL") {
            cfg.journal_wal = env_flag(&v);
        }

        if let Ok(v) = std::env::var("BQ_SYNCHRONOUS") {
            if let Some(m) = SyncMode::parse(&v) {
                cfg.synchronous = m;
            }
        }

        if let Ok(v) = std::env::var("BQ_CACHE_SIZE") {
            if let Ok(n) = v.trim().parse::<i64>() {
                cfg.cache_size = n;
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_base_file<S: Into<String>>(mut self, name: S) -> Self {
        self.base_file = name.into();
        self
    }

    pub fn with_retire_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.retire_suffix = suffix.into();
        self
    }

    pub fn with_retire(mut self, on: bool) -> Self {
        self.retire = on;
        self
    }

    pub fn with_journal_wal(mut self, on: bool) -> Self {
        self.journal_wal = on;
        self
    }

    pub fn with_synchronous(mut self, mode: SyncMode) -> Self {
        self.synchronous = mode;
        self
    }

    pub fn with_cache_size(mut self, pages: i64) -> Self {
        self.cache_size = pages;
        self
    }

    /// `banalytiq.db` -> ("banalytiq", "db"). A name without extension yields an empty ext.
    pub fn base_stem_ext(&self) -> (&str, &str) {
        match self.base_file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext),
            _ => (self.base_file.as_str(), ""),
        }
    }

    /// Absolute location of the base store inside `dir`.
    pub fn base_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.base_file)
    }

    /// Snapshot file name for a creation timestamp: `<stem>.<ts>.<ext>`.
    pub fn snapshot_name(&self, ts: u64) -> String {
        let (stem, ext) = self.base_stem_ext();
        if ext.is_empty() {
            format!("{stem}.{ts}")
        } else {
            format!("{stem}.{ts}.{ext}")
        }
    }

    /// Retirement path for a snapshot: the same name plus `retire_suffix`.
    pub fn retired_path(&self, snapshot: &Path) -> PathBuf {
        let mut s = snapshot.as_os_str().to_os_string();
        s.push(&self.retire_suffix);
        PathBuf::from(s)
    }
}

impl fmt::Display for MergeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MergeConfig {{ \
             base_file: {}, \
             retire_suffix: {}, \
             retire: {}, \
             journal_wal: {}, \
             synchronous: {}, \
             cache_size: {} \
             }}",
            self.base_file,
            self.retire_suffix,
            self.retire,
            self.journal_wal,
            self.synchronous.as_pragma(),
            self.cache_size,
        )
    }
}

/// Lightweight builder that produces a MergeConfig.
#[derive(Clone, Debug)]
pub struct MergeConfigBuilder {
    cfg: MergeConfig,
}

impl Default for MergeConfigBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: MergeConfig::from_env(),
        }
    }
}

impl MergeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: MergeConfig::default(),
        }
    }

    pub fn base_file<S: Into<String>>(mut self, name: S) -> Self {
        self.cfg.base_file = name.into();
        self
    }

    pub fn retire_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.cfg.retire_suffix = suffix.into();
        self
    }

    pub fn retire(mut self, on: bool) -> Self {
        self.cfg.retire = on;
        self
    }

    pub fn journal_wal(mut self, on: bool) -> Self {
        self.cfg.journal_wal = on;
        self
    }

    pub fn synchronous(mut self, mode: SyncMode) -> Self {
        self.cfg.synchronous = mode;
        self
    }

    pub fn cache_size(mut self, pages: i64) -> Self {
        self.cfg.cache_size = pages;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> MergeConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_and_ext_split() {
        let cfg = MergeConfig::default();
        assert_eq!(cfg.base_stem_ext(), ("banalytiq", "db"));

        let cfg = cfg.with_base_file("visits.v2.sqlite");
        assert_eq!(cfg.base_stem_ext(), ("visits.v2", "sqlite"));

        let cfg = MergeConfig::default().with_base_file("plain");
        assert_eq!(cfg.base_stem_ext(), ("plain", ""));
        assert_eq!(cfg.snapshot_name(7), "plain.7");
    }

    #[test]
    fn snapshot_and_retired_names() {
        let cfg = MergeConfig::default();
        assert_eq!(cfg.snapshot_name(1700000000), "banalytiq.1700000000.db");
        let p = cfg.retired_path(Path::new("/tmp/x/banalytiq.5.db"));
        assert_eq!(p, PathBuf::from("/tmp/x/banalytiq.5.db.bak"));
    }

    #[test]
    fn sync_mode_parse() {
        assert_eq!(SyncMode::parse(" FULL "), Some(SyncMode::Full));
        assert_eq!(SyncMode::parse("1"), Some(SyncMode::Normal));
        assert_eq!(SyncMode::parse("fast"), None);
    }

    #[test]
    fn env_flag_values() {
        // BQ_JOURNAL_WAL=0 / BQ_RETIRE=off выключают соответствующий шаг.
        for v in ["0", "off", "no", "false", ""] {
            assert!(!env_flag(v), "{v:?} must be off");
        }
        for v in ["1", " ON ", "yes", "True"] {
            assert!(env_flag(v), "{v:?} must be on");
        }
    }

    #[test]
    fn builder_from_default_overrides() {
        let cfg = MergeConfigBuilder::from_default()
            .base_file("a.db")
            .retire(false)
            .synchronous(SyncMode::Full)
            .cache_size(-2000)
            .build();
        assert_eq!(cfg.base_file, "a.db");
        assert!(!cfg.retire);
        assert_eq!(cfg.synchronous, SyncMode::Full);
        assert_eq!(cfg.cache_size, -2000);
        assert!(cfg.to_string().contains("synchronous: FULL"));
    }
}
