//! Общие константы: имена файлов, таблица, алиас attach, PRAGMA-дефолты.

// -------- Files --------
pub const DEFAULT_BASE_FILE: &str = "banalytiq.db";
pub const DEFAULT_RETIRE_SUFFIX: &str = ".bak";

// -------- Schema --------
pub const TABLE: &str = "analytics";
pub const KEY_INDEX: &str = "analytics_identity";

// Алиас, под которым снапшот подключается к соединению базы (ATTACH ... AS source_db).
pub const SOURCE_ALIAS: &str = "source_db";

// -------- PRAGMA defaults (base connection) --------
pub const DEFAULT_CACHE_SIZE: i64 = 50_000;
