// src/source/status.rs

//! Per-source and aggregate check statuses
//!
//! Sources never abort a check; everything that goes wrong is collected
//! here. An error is critical when the source could not produce any
//! releases at all, and a critical error pins the source at `Failure` no
//! matter what is appended afterwards.

use crate::error::Error;

/// Outcome of querying one or more release sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CheckStatus {
    /// No errors
    #[default]
    Success,
    /// Finished, but some releases or sources had problems
    HasErrors,
    /// Nothing usable came out
    Failure,
}

/// Status of a single release source
#[derive(Debug)]
pub struct SourceStatus {
    /// Stable description of the source, e.g. `github:owner/repo`
    pub source: String,
    /// Errors collected while querying, critical or not
    pub errors: Vec<Error>,
    pub status: CheckStatus,
}

impl SourceStatus {
    pub(crate) fn new(source: String) -> Self {
        Self {
            source,
            errors: Vec::new(),
            status: CheckStatus::Success,
        }
    }

    pub(crate) fn append_error(&mut self, error: Error, critical: bool) {
        self.errors.push(error);
        if critical || self.status == CheckStatus::Failure {
            self.status = CheckStatus::Failure;
        } else {
            self.status = CheckStatus::HasErrors;
        }
    }
}

/// Aggregate status over every queried source
///
/// `Failure` only when every source failed; `HasErrors` when any source
/// reported a problem; `Success` otherwise.
#[derive(Debug, Default)]
pub struct SourceCheckStatus {
    pub sources: Vec<SourceStatus>,
    pub status: CheckStatus,
}

impl SourceCheckStatus {
    pub(crate) fn push(&mut self, status: SourceStatus) {
        self.sources.push(status);
        self.recompute();
    }

    fn recompute(&mut self) {
        let any_usable = self
            .sources
            .iter()
            .any(|s| s.status != CheckStatus::Failure);
        let worst = self
            .sources
            .iter()
            .map(|s| s.status)
            .max()
            .unwrap_or(CheckStatus::Success);
        self.status = if worst == CheckStatus::Failure && any_usable {
            CheckStatus::HasErrors
        } else {
            worst
        };
    }
}
