use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

use banalytiq_merge::{AnalyticsStore, MergeConfig};

/// CLI: init — создать пустую базу (схема + индекс по ключу ip/dt/url).
/// Существующую базу не трогаем.
pub fn exec(dir: PathBuf) -> Result<()> {
    let cfg = MergeConfig::from_env();
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

    let base = cfg.base_path(&dir);
    if base.exists() {
        return Err(anyhow!("base store already exists: {}", base.display()));
    }

    let store = AnalyticsStore::create(&base)?;
    println!("Initialized base store at {}", store.path().display());
    Ok(())
}
