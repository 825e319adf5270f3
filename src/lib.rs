// Базовые модули
pub mod consts;
pub mod config;
pub mod metrics;

// Хранилище analytics (схема, вставка, чтение)
pub mod store;

// Поиск timestamped-снапшотов в рабочем каталоге
pub mod locator;

// Ядро: merge одного снапшота + пакетный прогон
pub mod merge; // src/merge/{mod,outcome,engine,batch}.rs

// Локальная часть download: раскладка скачанного файла по соглашению об именах
pub mod stage;

// Утилиты (now_secs, format_utc, sqlite_ro_uri)
pub mod util;

// Удобные реэкспорты
pub use config::{MergeConfig, MergeConfigBuilder};
pub use locator::{SnapshotFile, SnapshotLocator};
pub use merge::{
    BaseStoreMissing, BatchOrchestrator, BatchReport, FailureKind, FileReport, MergeEngine,
    MergeFailure, MergeOutcome,
};
pub use store::{AnalyticsStore, IdentityKey, Record};
