//! merge — ядро: слияние timestamped-снапшотов с базовым хранилищем.
//!
//! Разделение по подмодулям:
//! - outcome.rs — типизированный результат одного merge (Success | Failure{kind, detail})
//! - engine.rs  — MergeEngine::merge_one: ATTACH + anti-join count + транзакционный INSERT + retire
//! - batch.rs   — BatchOrchestrator::merge_all: locate -> merge_one по порядку -> BatchReport

pub mod batch;
pub mod engine;
pub mod outcome;

pub use batch::{BaseStoreMissing, BatchOrchestrator, BatchReport, FileReport};
pub use engine::MergeEngine;
pub use outcome::{FailureKind, MergeFailure, MergeOutcome};
