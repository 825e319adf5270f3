//! merge/engine — слияние одного снапшота с базовым хранилищем.
//!
//! Порядок (merge_one):
//! 1) Оба файла должны существовать, иначе Failure{NotFound} без каких-либо изменений.
//!    База открывается без CREATE: отсутствующая база никогда не создаётся неявно.
//! 2) Базовое соединение: journal_mode=WAL, synchronous, cache_size (из MergeConfig).
//! 3) ATTACH снапшота read-only (file:...?mode=ro) под алиасом source_db.
//! 4) COUNT по anti-join (ключ ip/dt/url, сравнение через IS). 0 -> DETACH, close и
//!    Success{0} без транзакции и без rename.
//! 5) BEGIN IMMEDIATE непосредственно перед INSERT ... SELECT (geo-поля = NULL), COMMIT.
//! 6) DETACH, close, и только после реального COMMIT — rename снапшота в <name><retire_suffix>.
//!    Ошибка rename — предупреждение: данные уже закоммичены, повторный прогон даст delta=0.
//!
//! Любая ошибка в 3)-6) до rename: откат открытой транзакции, best-effort close,
//! Failure{TransactionFailure, detail}. Наружу ничего не пробрасывается.
//!
//! Transaction заимствует Connection мутабельно, поэтому закрыть соединение
//! при открытой транзакции невозможно; drop без commit = ROLLBACK.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use std::fs;
use std::path::Path;

use crate::config::MergeConfig;
use crate::consts::{SOURCE_ALIAS, TABLE};
use crate::metrics::{
    record_merge_failed, record_merge_ok, record_rename_warning, record_snapshot_retired,
};
use crate::util::sqlite_ro_uri;

use super::outcome::{MergeFailure, MergeOutcome};

/// Rows of the attached snapshot whose identity key is absent from the base.
/// Duplicate keys inside the snapshot collapse to the lowest rowid.
fn fresh_rows_from() -> String {
    format!(
        "FROM {SOURCE_ALIAS}.{TABLE} s
         WHERE s.rowid IN (
             SELECT MIN(d.rowid) FROM {SOURCE_ALIAS}.{TABLE} d GROUP BY d.ip, d.dt, d.url
         )
         AND NOT EXISTS (
             SELECT 1 FROM main.{TABLE} m
             WHERE m.ip IS s.ip AND m.dt IS s.dt AND m.url IS s.url
         )"
    )
}

fn count_sql() -> String {
    format!("SELECT COUNT(*) {}", fresh_rows_from())
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO main.{TABLE} (ip, dt, url, referer, ua, status, country, city, latitude, longitude)
         SELECT s.ip, s.dt, s.url, s.referer, s.ua, s.status, NULL, NULL, NULL, NULL
         {}",
        fresh_rows_from()
    )
}

/// What the SQL part of a merge did to the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    /// Zero delta: no transaction was opened.
    UpToDate,
    /// Rows inserted and committed.
    Committed(u64),
}

#[derive(Debug, Clone)]
pub struct MergeEngine {
    cfg: MergeConfig,
}

impl MergeEngine {
    pub fn new(cfg: &MergeConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.cfg
    }

    /// Merge `snapshot` into `base`. Never panics or returns an error: every
    /// outcome is a `MergeOutcome`.
    pub fn merge_one(&self, base: &Path, snapshot: &Path) -> MergeOutcome {
        if !snapshot.exists() {
            record_merge_failed();
            return MergeOutcome::Failure(MergeFailure::not_found(format!(
                "snapshot file not found: {}",
                snapshot.display()
            )));
        }
        if !base.exists() {
            record_merge_failed();
            return MergeOutcome::Failure(MergeFailure::not_found(format!(
                "base store not found: {}",
                base.display()
            )));
        }

        let applied = match self.apply(base, snapshot) {
            Ok(a) => a,
            Err(e) => {
                warn!("merge {}: {:#}", snapshot.display(), e);
                record_merge_failed();
                return MergeOutcome::Failure(MergeFailure::transaction(&e));
            }
        };
        let (inserted, rename_warning) = match applied {
            // Нечего вставлять: снапшот не переименовывается и будет пересмотрен в следующий раз.
            Applied::UpToDate => (0, None),
            Applied::Committed(n) => {
                let warning = if self.cfg.retire {
                    self.retire(snapshot)
                } else {
                    None
                };
                (n, warning)
            }
        };
        record_merge_ok(inserted);

        MergeOutcome::Success {
            inserted,
            rename_warning,
        }
    }

    // open -> attach/count/insert -> close. Connection is released on every path.
    fn apply(&self, base: &Path, snapshot: &Path) -> Result<Applied> {
        if same_file(base, snapshot) {
            return Err(anyhow!(
                "refusing to merge base store into itself: {}",
                snapshot.display()
            ));
        }

        let mut conn = self.open_base(base)?;
        match apply_on(&mut conn, snapshot) {
            Ok(a) => {
                conn.close()
                    .map_err(|(_, e)| e)
                    .with_context(|| format!("close base {}", base.display()))?;
                Ok(a)
            }
            Err(e) => {
                if let Err((_, ce)) = conn.close() {
                    debug!("merge: close after failure: {}", ce);
                }
                Err(e)
            }
        }
    }

    fn open_base(&self, base: &Path) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(base, flags)
            .with_context(|| format!("open base {}", base.display()))?;

        if self.cfg.journal_wal {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .context("PRAGMA journal_mode=WAL")?;
            if !mode.eq_ignore_ascii_case("wal") {
                debug!("merge: base journal_mode stays {}", mode);
            }
        }
        conn.pragma_update(None, "synchronous", self.cfg.synchronous.as_pragma())
            .context("PRAGMA synchronous")?;
        conn.pragma_update(None, "cache_size", self.cfg.cache_size)
            .context("PRAGMA cache_size")?;
        Ok(conn)
    }

    /// Rename a merged snapshot to its retirement name. Returns the warning text on failure.
    fn retire(&self, snapshot: &Path) -> Option<String> {
        let target = self.cfg.retired_path(snapshot);
        // rename поверх существующего файла молча затёр бы старую копию.
        let res = if target.exists() {
            Err(anyhow!("retirement target already exists: {}", target.display()))
        } else {
            fs::rename(snapshot, &target).with_context(|| {
                format!("rename {} -> {}", snapshot.display(), target.display())
            })
        };

        match res {
            Ok(()) => {
                record_snapshot_retired();
                info!(
                    "snapshot renamed to {}",
                    target
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                );
                None
            }
            Err(e) => {
                record_rename_warning();
                warn!(
                    "could not retire {} (merge is committed, file will be rescanned): {:#}",
                    snapshot.display(),
                    e
                );
                Some(format!("{:#}", e))
            }
        }
    }
}

fn apply_on(conn: &mut Connection, snapshot: &Path) -> Result<Applied> {
    let uri = sqlite_ro_uri(snapshot);
    conn.execute(
        &format!("ATTACH DATABASE ?1 AS {SOURCE_ALIAS}"),
        params![uri],
    )
    .with_context(|| format!("attach {}", snapshot.display()))?;

    let fresh: i64 = conn
        .query_row(&count_sql(), [], |row| row.get(0))
        .with_context(|| format!("count new records in {}", snapshot.display()))?;

    if fresh == 0 {
        info!("no new records to merge, base is already up to date");
        detach(conn)?;
        return Ok(Applied::UpToDate);
    }
    info!("found {} new record(s) to insert", fresh);

    let inserted = {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("begin merge transaction")?;
        let n = match tx.execute(&insert_sql(), []) {
            Ok(n) => n,
            Err(e) => {
                if let Err(re) = tx.rollback() {
                    warn!("merge: rollback failed: {}", re);
                }
                return Err(e).context("insert new records");
            }
        };
        // commit() при ошибке откатывает транзакцию на drop.
        tx.commit().context("commit merge transaction")?;
        n as u64
    };

    detach(conn)?;
    Ok(Applied::Committed(inserted))
}

fn detach(conn: &Connection) -> Result<()> {
    conn.execute(&format!("DETACH DATABASE {SOURCE_ALIAS}"), [])
        .context("detach snapshot")?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
