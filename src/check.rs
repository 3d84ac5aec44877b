// src/check.rs

//! Release selection and check orchestration
//!
//! The selector runs the canonical-key comparison over every candidate a
//! check produced and keeps the best one strictly above the running
//! version. Two orchestration modes exist: query every source and pick the
//! global best, or stop at the first source that answers without a
//! critical failure.

use crate::config::ApplicationConfig;
use crate::source::{CheckStatus, Release, ReleaseProvider, SourceCheckStatus};
use tracing::{debug, info};

/// How sources are consulted during a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckMode {
    /// Union candidates from every source
    All,
    /// First source without a critical failure is authoritative
    FirstOk,
}

/// Query sources and select the best eligible candidate
pub(crate) fn run_check<P: ReleaseProvider>(
    cfg: &ApplicationConfig,
    sources: &[P],
    mode: CheckMode,
) -> (Option<Release>, SourceCheckStatus) {
    let mut aggregate = SourceCheckStatus::default();
    let mut candidates = Vec::new();

    for source in sources {
        let description = source.describe();
        let (releases, status) = source.list_releases(cfg);
        let usable = status.status != CheckStatus::Failure;
        debug!(
            "source {} returned {} candidate(s), status {:?}",
            description,
            releases.len(),
            status.status
        );
        aggregate.push(status);
        if usable {
            candidates.extend(releases);
            if mode == CheckMode::FirstOk {
                break;
            }
        }
    }

    let chosen = select_latest(cfg, candidates);
    match &chosen {
        Some(release) => info!(
            "update available: {} -> {}",
            cfg.current_version(),
            release.tag()
        ),
        None => debug!("no eligible version above {}", cfg.current_version()),
    }
    (chosen, aggregate)
}

/// Pick the highest qualified candidate strictly above the current version
///
/// The scan is stable: a later candidate replaces the best one only when it
/// is strictly greater, so the first of an equal pair wins.
pub(crate) fn select_latest(
    cfg: &ApplicationConfig,
    mut candidates: Vec<Release>,
) -> Option<Release> {
    let mut best: Option<usize> = None;
    let mut best_key = cfg.current_version().key().clone();

    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.channel().use_for_update() {
            continue;
        }
        if *candidate.key() > best_key {
            best_key = candidate.key().clone();
            best = Some(index);
        }
    }

    best.map(|index| candidates.swap_remove(index))
}
