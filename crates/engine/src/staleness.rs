// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staleness evaluation.
//!
//! A job is outdated when:
//! - it has no successful build,
//! - a direct dependency has no successful build,
//! - a direct dependency's latest successful build ended strictly after
//!   this job's latest successful build started, or
//! - a direct dependency is itself outdated.
//!
//! Only whole-job builds (no parametrization key) take part. Results are
//! memoized for the lifetime of one evaluator, so create a fresh evaluator
//! after recording new builds.

use jc_core::{BuildRecord, DependencyGraph, GraphError, JobId};
use jc_storage::{BuildFilter, BuildStore, KeyFilter, Order, StoreError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StalenessError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary status of a job, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Never finished a build
    NotBuilt,
    /// Has finished builds but none succeeded
    Failed,
    /// Built successfully, but dependencies changed since
    Outdated,
    Success,
}

jc_core::simple_display! {
    JobStatus {
        NotBuilt => "not_built",
        Failed => "failed",
        Outdated => "outdated",
        Success => "success",
    }
}

pub struct StalenessEvaluator<'a, S: BuildStore + ?Sized> {
    graph: &'a DependencyGraph,
    store: &'a S,
    latest: HashMap<JobId, Option<BuildRecord>>,
    outdated: HashMap<JobId, bool>,
}

impl<'a, S: BuildStore + ?Sized> StalenessEvaluator<'a, S> {
    pub fn new(graph: &'a DependencyGraph, store: &'a S) -> Self {
        Self { graph, store, latest: HashMap::new(), outdated: HashMap::new() }
    }

    /// Latest finished, successful, non-skipped whole-job build.
    pub fn latest_successful_build(&mut self, job_id: &JobId) -> Result<Option<BuildRecord>, StalenessError> {
        if let Some(cached) = self.latest.get(job_id) {
            return Ok(cached.clone());
        }
        let build = self.store.get_latest_successful_build(job_id, None)?;
        self.latest.insert(job_id.clone(), build.clone());
        Ok(build)
    }

    pub fn is_outdated(&mut self, job_id: &JobId) -> Result<bool, StalenessError> {
        if let Some(&known) = self.outdated.get(job_id) {
            return Ok(known);
        }
        let outdated = self.evaluate(job_id)?;
        self.outdated.insert(job_id.clone(), outdated);
        Ok(outdated)
    }

    fn evaluate(&mut self, job_id: &JobId) -> Result<bool, StalenessError> {
        let deps: Vec<JobId> = self.graph.direct_dependencies(job_id)?.into_iter().cloned().collect();
        let Some(own) = self.latest_successful_build(job_id)? else {
            return Ok(true);
        };
        let own_start = own.start_ms.unwrap_or(0);
        for dep in &deps {
            let Some(dep_build) = self.latest_successful_build(dep)? else {
                tracing::trace!(job_id = %job_id, dependency = %dep, "dependency never built");
                return Ok(true);
            };
            if dep_build.end_ms.unwrap_or(0) > own_start {
                tracing::trace!(job_id = %job_id, dependency = %dep, "dependency rebuilt since");
                return Ok(true);
            }
            if self.is_outdated(dep)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Direct dependencies that are outdated, in definition order.
    pub fn outdated_dependencies(&mut self, job_id: &JobId) -> Result<Vec<JobId>, StalenessError> {
        let deps: Vec<JobId> = self.graph.direct_dependencies(job_id)?.into_iter().cloned().collect();
        let mut outdated = Vec::new();
        for dep in deps {
            if self.is_outdated(&dep)? {
                outdated.push(dep);
            }
        }
        Ok(outdated)
    }

    /// Every direct dependency has a successful build.
    pub fn can_be_built(&mut self, job_id: &JobId) -> Result<bool, StalenessError> {
        let deps: Vec<JobId> = self.graph.direct_dependencies(job_id)?.into_iter().cloned().collect();
        for dep in &deps {
            if self.latest_successful_build(dep)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Has at least one finished whole-job build.
    pub fn has_builds(&self, job_id: &JobId) -> Result<bool, StalenessError> {
        let filter = BuildFilter::default()
            .key(KeyFilter::Exact(None))
            .started(true)
            .finished(true)
            .order(Order::Desc)
            .limit(1usize);
        Ok(!self.store.list_builds(job_id, &filter)?.is_empty())
    }

    pub fn has_successful_builds(&mut self, job_id: &JobId) -> Result<bool, StalenessError> {
        Ok(self.latest_successful_build(job_id)?.is_some())
    }

    /// Has an unfinished build for any key.
    pub fn has_running_builds(&self, job_id: &JobId) -> Result<bool, StalenessError> {
        let filter = BuildFilter::default().finished(false).limit(1usize);
        Ok(!self.store.list_builds(job_id, &filter)?.is_empty())
    }

    pub fn job_status(&mut self, job_id: &JobId) -> Result<JobStatus, StalenessError> {
        if self.has_successful_builds(job_id)? {
            if self.is_outdated(job_id)? {
                return Ok(JobStatus::Outdated);
            }
            return Ok(JobStatus::Success);
        }
        if self.has_builds(job_id)? {
            return Ok(JobStatus::Failed);
        }
        Ok(JobStatus::NotBuilt)
    }
}

#[cfg(test)]
#[path = "staleness_tests.rs"]
mod tests;
