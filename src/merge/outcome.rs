//! Typed result of merging one snapshot.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Base or snapshot file missing; nothing was touched.
    NotFound,
    /// attach / count / insert / commit / detach failed; the transaction was rolled back.
    TransactionFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotFound => f.write_str("not_found"),
            FailureKind::TransactionFailure => f.write_str("transaction_failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl MergeFailure {
    pub fn not_found(detail: String) -> Self {
        Self {
            kind: FailureKind::NotFound,
            detail,
        }
    }

    pub fn transaction(err: &anyhow::Error) -> Self {
        Self {
            kind: FailureKind::TransactionFailure,
            detail: format!("{:#}", err),
        }
    }
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    Success {
        inserted: u64,
        /// Set when the commit succeeded but the snapshot could not be renamed.
        /// The snapshot stays in place and is rescanned (with a zero delta) next run.
        #[serde(skip_serializing_if = "Option::is_none")]
        rename_warning: Option<String>,
    },
    Failure(MergeFailure),
}

impl MergeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MergeOutcome::Success { .. })
    }

    pub fn inserted(&self) -> u64 {
        match self {
            MergeOutcome::Success { inserted, .. } => *inserted,
            MergeOutcome::Failure(_) => 0,
        }
    }

    pub fn failure(&self) -> Option<&MergeFailure> {
        match self {
            MergeOutcome::Success { .. } => None,
            MergeOutcome::Failure(f) => Some(f),
        }
    }

    pub fn rename_warning(&self) -> Option<&str> {
        match self {
            MergeOutcome::Success { rename_warning, .. } => rename_warning.as_deref(),
            MergeOutcome::Failure(_) => None,
        }
    }
}
