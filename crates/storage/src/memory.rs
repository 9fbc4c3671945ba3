// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory build store.

use crate::store::{BuildFilter, BuildStore, BuildUpdate, LogFilter, Order, PruneFilter, StoreError};
use jc_core::{
    BuildConfig, BuildId, BuildRecord, BuildState, Clock, JobDefinition, JobId, LogEntry, ParamKey,
    ProgressReport, ProgressTree, SystemClock,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type RunningKey = (JobId, Option<ParamKey>);

#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub(crate) builds: BTreeMap<BuildId, BuildRecord>,
    /// Unfinished build per `(job, key)`
    pub(crate) running: HashMap<RunningKey, BuildId>,
    pub(crate) logs: HashMap<BuildId, Vec<LogEntry>>,
    pub(crate) next_id: u64,
    pub(crate) next_log_seq: u64,
}

/// Reference [`BuildStore`] keeping everything in process memory.
///
/// Build records, the running index and logs share one lock, held only for
/// the duration of a single operation. Progress trees have a lock per build
/// so a busy build never blocks readers of another.
pub struct MemoryStore<C: Clock = SystemClock> {
    pub(crate) clock: C,
    pub(crate) last_stamp: Mutex<u64>,
    pub(crate) inner: RwLock<Inner>,
    pub(crate) progress: RwLock<HashMap<BuildId, Arc<RwLock<ProgressTree>>>>,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last_stamp: Mutex::new(0),
            inner: RwLock::new(Inner { next_id: 1, next_log_seq: 1, ..Inner::default() }),
            progress: RwLock::new(HashMap::new()),
        }
    }

    fn stamp(&self) -> u64 {
        let mut last = self.last_stamp.lock();
        let now = self.clock.epoch_ms().max(*last + 1);
        *last = now;
        now
    }

    /// Number of builds currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unfinished builds, oldest first.
    pub fn running_builds(&self) -> Vec<BuildRecord> {
        let inner = self.inner.read();
        let mut ids: Vec<BuildId> = inner.running.values().copied().collect();
        ids.sort();
        ids.iter().filter_map(|id| inner.builds.get(id).cloned()).collect()
    }
}

impl<C: Clock> BuildStore for MemoryStore<C> {
    fn now_ms(&self) -> u64 {
        self.stamp()
    }

    fn create_build(
        &self,
        job: &JobDefinition,
        param_key: Option<&ParamKey>,
        config: BuildConfig,
    ) -> Result<BuildRecord, StoreError> {
        let job_id = &job.id;
        let mut inner = self.inner.write();
        let key = (job_id.clone(), param_key.cloned());
        if let Some(&running) = inner.running.get(&key) {
            tracing::warn!(job_id = %job_id, running = %running, "build already in progress");
            return Err(StoreError::BuildAlreadyRunning {
                job_id: job_id.clone(),
                param_key: param_key.cloned(),
                running,
            });
        }
        let id = BuildId(inner.next_id);
        inner.next_id += 1;
        let record = BuildRecord::new(id, job.clone(), param_key.cloned(), config, self.stamp());
        inner.running.insert(key, id);
        inner.builds.insert(id, record.clone());
        tracing::debug!(build_id = %id, job_id = %job_id, "build created");
        Ok(record)
    }

    fn update_build(&self, id: BuildId, update: BuildUpdate) -> Result<BuildRecord, StoreError> {
        let mut inner = self.inner.write();
        let now = self.stamp();
        let build = inner.builds.get_mut(&id).ok_or(StoreError::BuildNotFound(id))?;
        match update {
            BuildUpdate::Start => build.start(now)?,
            BuildUpdate::Finish(outcome) => build.finish(outcome, now)?,
        }
        let record = build.clone();
        if record.finished() {
            inner.running.remove(&(record.job_id.clone(), record.param_key.clone()));
        }
        Ok(record)
    }

    fn get_build(&self, id: BuildId) -> Result<BuildRecord, StoreError> {
        self.inner.read().builds.get(&id).cloned().ok_or(StoreError::BuildNotFound(id))
    }

    fn list_builds(&self, job_id: &JobId, filter: &BuildFilter) -> Result<Vec<BuildRecord>, StoreError> {
        let inner = self.inner.read();
        let matching = |b: &&BuildRecord| b.job_id == *job_id && filter.matches(b);
        let limit = filter.limit.unwrap_or(usize::MAX);
        let builds = match filter.order {
            Order::Asc => inner.builds.values().filter(matching).take(limit).cloned().collect(),
            Order::Desc => inner.builds.values().rev().filter(matching).take(limit).cloned().collect(),
        };
        Ok(builds)
    }

    fn delete_build(&self, id: BuildId) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let build = inner.builds.remove(&id).ok_or(StoreError::BuildNotFound(id))?;
        let key = (build.job_id, build.param_key);
        if inner.running.get(&key) == Some(&id) {
            inner.running.remove(&key);
        }
        inner.logs.remove(&id);
        drop(inner);
        self.progress.write().remove(&id);
        tracing::debug!(build_id = %id, "build deleted");
        Ok(())
    }

    fn append_log(&self, build_id: BuildId, mut entry: LogEntry) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let build = inner.builds.get(&build_id).ok_or(StoreError::BuildNotFound(build_id))?;
        if build.finished() {
            return Err(StoreError::BuildFinished(build_id));
        }
        let seq = inner.next_log_seq;
        inner.next_log_seq += 1;
        entry.seq = seq;
        entry.created_ms = self.stamp();
        inner.logs.entry(build_id).or_default().push(entry);
        Ok(seq)
    }

    fn list_logs(&self, build_id: BuildId, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.read();
        if !inner.builds.contains_key(&build_id) {
            return Err(StoreError::BuildNotFound(build_id));
        }
        let entries = inner.logs.get(&build_id).map(Vec::as_slice).unwrap_or_default();
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    fn prune_logs(&self, filter: &PruneFilter) -> Result<usize, StoreError> {
        let now = self.stamp();
        let mut inner = self.inner.write();
        let mut removed = 0;
        for (&build_id, entries) in inner.logs.iter_mut() {
            let before = entries.len();
            entries.retain(|e| !filter.matches(build_id, e, now));
            removed += before - entries.len();
        }
        inner.logs.retain(|_, entries| !entries.is_empty());
        if removed > 0 {
            tracing::info!(removed, "pruned build logs");
        }
        Ok(removed)
    }

    fn report_progress(&self, build_id: BuildId, report: ProgressReport) -> Result<(), StoreError> {
        // Holding `inner` keeps finish and delete out until the tree is written.
        let inner = self.inner.read();
        let build = inner.builds.get(&build_id).ok_or(StoreError::BuildNotFound(build_id))?;
        if build.state != BuildState::Running {
            return Err(StoreError::BuildNotRunning(build_id));
        }
        let tree = Arc::clone(self.progress.write().entry(build_id).or_default());
        tree.write().apply(report);
        drop(inner);
        Ok(())
    }

    fn get_progress(&self, build_id: BuildId) -> Result<ProgressTree, StoreError> {
        if !self.inner.read().builds.contains_key(&build_id) {
            return Err(StoreError::BuildNotFound(build_id));
        }
        let Some(tree) = self.progress.read().get(&build_id).cloned() else {
            return Ok(ProgressTree::default());
        };
        let snapshot = tree.read().clone();
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
