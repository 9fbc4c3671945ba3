// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage backend interface.

use jc_core::{
    BuildConfig, BuildId, BuildOutcome, BuildRecord, InvalidTransition, JobDefinition, JobId, LogEntry,
    LogLevel, ParamKey, ProgressReport, ProgressTree,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("build {0} not found")]
    BuildNotFound(BuildId),

    #[error("job {job_id} already has build {running} in progress{}", key_suffix(.param_key))]
    BuildAlreadyRunning { job_id: JobId, param_key: Option<ParamKey>, running: BuildId },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("build {0} is finished")]
    BuildFinished(BuildId),

    #[error("build {0} is not running")]
    BuildNotRunning(BuildId),

    /// Backend temporarily unreachable; callers may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

fn key_suffix(key: &Option<ParamKey>) -> String {
    key.as_ref().map(|k| format!(" for key {k}")).unwrap_or_default()
}

/// A state transition requested through [`BuildStore::update_build`].
#[derive(Debug, Clone, PartialEq)]
pub enum BuildUpdate {
    Start,
    Finish(BuildOutcome),
}

/// Which partitions a build listing covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyFilter {
    #[default]
    Any,
    /// Exactly this key; `None` selects whole-job builds only
    Exact(Option<ParamKey>),
}

impl KeyFilter {
    pub fn matches(&self, key: Option<&ParamKey>) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(want) => want.as_ref() == key,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

/// Filters for [`BuildStore::list_builds`]. Unset flags match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFilter {
    pub key: KeyFilter,
    pub started: Option<bool>,
    pub finished: Option<bool>,
    pub success: Option<bool>,
    pub skipped: Option<bool>,
    pub order: Order,
    pub limit: Option<usize>,
}

impl BuildFilter {
    jc_core::setters! {
        set { key: KeyFilter, order: Order }
        option { started: bool, finished: bool, success: bool, skipped: bool, limit: usize }
    }

    /// Finished, successful, not skipped; newest first.
    pub fn successful() -> Self {
        Self::default().finished(true).success(true).skipped(false).order(Order::Desc)
    }

    pub fn matches(&self, build: &BuildRecord) -> bool {
        let flag = |want: Option<bool>, have: bool| want.is_none_or(|w| w == have);
        self.key.matches(build.param_key.as_ref())
            && flag(self.started, build.started())
            && flag(self.finished, build.finished())
            && flag(self.success, build.success())
            && flag(self.skipped, build.skipped())
    }
}

/// Filters for [`BuildStore::list_logs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub min_level: Option<LogLevel>,
    /// Inclusive lower bound on `created_ms`
    pub min_ms: Option<u64>,
    /// Inclusive upper bound on `created_ms`
    pub max_ms: Option<u64>,
}

impl LogFilter {
    jc_core::setters! {
        option { min_level: LogLevel, min_ms: u64, max_ms: u64 }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.min_level.is_none_or(|l| entry.level >= l)
            && self.min_ms.is_none_or(|t| entry.created_ms >= t)
            && self.max_ms.is_none_or(|t| entry.created_ms <= t)
    }
}

/// Selects log messages to delete. A message is removed when it matches
/// every set criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneFilter {
    pub build_id: Option<BuildId>,
    /// Older than this many milliseconds
    pub max_age_ms: Option<u64>,
    /// At or below this level
    pub max_level: Option<LogLevel>,
}

impl PruneFilter {
    jc_core::setters! {
        option { build_id: BuildId, max_age_ms: u64, max_level: LogLevel }
    }

    pub fn matches(&self, build_id: BuildId, entry: &LogEntry, now_ms: u64) -> bool {
        self.build_id.is_none_or(|b| b == build_id)
            && self.max_age_ms.is_none_or(|age| entry.created_ms < now_ms.saturating_sub(age))
            && self.max_level.is_none_or(|l| entry.level <= l)
    }
}

/// Persistence for build history.
///
/// Implementations serialize conflicting writes internally; every method
/// takes `&self` and may be called from many threads. Timestamps on records
/// and log entries come from the store's own clock.
pub trait BuildStore: Send + Sync {
    /// Current store time in epoch milliseconds. Strictly increasing across
    /// calls.
    fn now_ms(&self) -> u64;

    /// Atomically check that no unfinished build exists for
    /// `(job.id, param_key)` and create one in state `Created`, carrying a
    /// copy of `job` and `config`.
    fn create_build(
        &self,
        job: &JobDefinition,
        param_key: Option<&ParamKey>,
        config: BuildConfig,
    ) -> Result<BuildRecord, StoreError>;

    /// Apply a state transition, stamping the store time.
    fn update_build(&self, id: BuildId, update: BuildUpdate) -> Result<BuildRecord, StoreError>;

    fn start_build(&self, id: BuildId) -> Result<BuildRecord, StoreError> {
        self.update_build(id, BuildUpdate::Start)
    }

    fn finish_build(&self, id: BuildId, outcome: BuildOutcome) -> Result<BuildRecord, StoreError> {
        self.update_build(id, BuildUpdate::Finish(outcome))
    }

    fn get_build(&self, id: BuildId) -> Result<BuildRecord, StoreError>;

    fn list_builds(&self, job_id: &JobId, filter: &BuildFilter) -> Result<Vec<BuildRecord>, StoreError>;

    /// Newest finished, successful, non-skipped build for exactly this key.
    fn get_latest_successful_build(
        &self,
        job_id: &JobId,
        param_key: Option<&ParamKey>,
    ) -> Result<Option<BuildRecord>, StoreError> {
        let filter = BuildFilter::successful().key(KeyFilter::Exact(param_key.cloned())).limit(1usize);
        Ok(self.list_builds(job_id, &filter)?.into_iter().next())
    }

    /// Remove a build with its logs and progress.
    fn delete_build(&self, id: BuildId) -> Result<(), StoreError>;

    /// Append a log message to an unfinished build. Returns the assigned
    /// sequence number.
    fn append_log(&self, build_id: BuildId, entry: LogEntry) -> Result<u64, StoreError>;

    /// Log messages of a build in append order.
    fn list_logs(&self, build_id: BuildId, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError>;

    /// Returns the number of messages removed.
    fn prune_logs(&self, filter: &PruneFilter) -> Result<usize, StoreError>;

    /// Upsert one node of a running build's progress tree.
    fn report_progress(&self, build_id: BuildId, report: ProgressReport) -> Result<(), StoreError>;

    /// Point-in-time copy of a build's progress tree.
    fn get_progress(&self, build_id: BuildId) -> Result<ProgressTree, StoreError>;
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
