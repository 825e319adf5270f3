//! store — доступ к одному analytics-хранилищу (SQLite-файл с таблицей `analytics`).
//!
//! Merge engine работает с хранилищами напрямую через SQL (ATTACH + anti-join);
//! этот модуль нужен для init, диагностики (status) и тестов.
//!
//! Schema:
//!   analytics(id INTEGER PRIMARY KEY, ip, dt, url, referer, ua, status,
//!             country, city, latitude, longitude)
//!   + index analytics_identity(ip, dt, url)

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::consts::{KEY_INDEX, TABLE};

/// One logged request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub ip: String,
    pub dt: i64,
    pub url: String,
    pub referer: Option<String>,
    pub ua: Option<String>,
    pub status: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Record {
    /// Record with only the fields a collector fills; geolocation stays unset.
    pub fn new(ip: &str, dt: i64, url: &str, status: i64) -> Self {
        Self {
            ip: ip.to_string(),
            dt,
            url: url.to_string(),
            referer: None,
            ua: None,
            status,
            country: None,
            city: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }

    pub fn with_ua(mut self, ua: &str) -> Self {
        self.ua = Some(ua.to_string());
        self
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            ip: self.ip.clone(),
            dt: self.dt,
            url: self.url.clone(),
        }
    }
}

/// (address, timestamp, path): two records with equal keys are the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub ip: String,
    pub dt: i64,
    pub url: String,
}

fn schema_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            ip        TEXT NOT NULL,
            dt        INTEGER NOT NULL,
            url       TEXT NOT NULL,
            referer   TEXT,
            ua        TEXT,
            status    INTEGER,
            country   TEXT,
            city      TEXT,
            latitude  REAL,
            longitude REAL
        );
        CREATE INDEX IF NOT EXISTS {KEY_INDEX} ON {TABLE} (ip, dt, url);"
    )
}

pub struct AnalyticsStore {
    conn: Connection,
    path: PathBuf,
}

impl AnalyticsStore {
    /// Create (or open) a store at `path` and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("open store {}", path.display()))?;
        conn.execute_batch(&schema_sql())
            .with_context(|| format!("create schema in {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store. Never creates the file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("store not found: {}", path.display()));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open store {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&mut self, r: &Record) -> Result<()> {
        insert_on(&self.conn, r)
    }

    /// Insert all records in one transaction. Returns the number of rows written.
    pub fn insert_many(&mut self, records: &[Record]) -> Result<usize> {
        let tx = self.conn.transaction().context("begin insert_many")?;
        for r in records {
            insert_on(&tx, r)?;
        }
        tx.commit().context("commit insert_many")?;
        Ok(records.len())
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| row.get(0))
            .with_context(|| format!("count rows in {}", self.path.display()))?;
        Ok(n as u64)
    }

    /// All records ordered by identity key (then id), i.e. independent of insertion order.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT ip, dt, url, referer, ua, status, country, city, latitude, longitude
             FROM {TABLE} ORDER BY ip, dt, url, id"
        ))?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Fetch the stored record for a key, if any (first inserted wins).
    pub fn get(&self, key: &IdentityKey) -> Result<Option<Record>> {
        let rec = self
            .conn
            .query_row(
                &format!(
                    "SELECT ip, dt, url, referer, ua, status, country, city, latitude, longitude
                     FROM {TABLE} WHERE ip = ?1 AND dt = ?2 AND url = ?3 ORDER BY id LIMIT 1"
                ),
                params![key.ip, key.dt, key.url],
                row_to_record,
            )
            .optional()?;
        Ok(rec)
    }

    pub fn contains_key(&self, key: &IdentityKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Raw connection (tests install triggers through it).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        ip: row.get(0)?,
        dt: row.get(1)?,
        url: row.get(2)?,
        referer: row.get(3)?,
        ua: row.get(4)?,
        status: row.get(5)?,
        country: row.get(6)?,
        city: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
    })
}

fn insert_on(conn: &Connection, r: &Record) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {TABLE} (ip, dt, url, referer, ua, status, country, city, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            r.ip,
            r.dt,
            r.url,
            r.referer,
            r.ua,
            r.status,
            r.country,
            r.city,
            r.latitude,
            r.longitude
        ],
    )
    .with_context(|| format!("insert {} {} {}", r.ip, r.dt, r.url))?;
    Ok(())
}
