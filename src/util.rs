//! util — общие утилиты.
//!
//! Содержит:
//! - now_secs(): текущее Unix-время в секундах.
//! - format_utc(): "YYYY-MM-DD HH:MM:SS" для отчётов (UTC).
//! - sqlite_ro_uri(): URI-имя файла для read-only ATTACH.

use chrono::DateTime;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Текущее Unix-время в секундах.
#[inline]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Unix seconds -> "YYYY-MM-DD HH:MM:SS" (UTC). Out-of-range values fall back to raw seconds.
pub fn format_utc(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// `file:` URI opening `path` read-only. `%`, `?` and `#` are percent-encoded,
/// everything else is passed through as SQLite expects.
pub fn sqlite_ro_uri(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len() + 16);
    out.push_str("file:");
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            _ => out.push(ch),
        }
    }
    out.push_str("?mode=ro");
    out
}
