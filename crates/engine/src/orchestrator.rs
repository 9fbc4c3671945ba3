// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build orchestration.
//!
//! A [`BuildRequest`] expands into a plan: the target, optionally its
//! descendants, and optionally the ancestors of everything selected. The
//! plan runs one job at a time in dependency order. A job whose
//! dependency failed in this plan is recorded as skipped without ever
//! reaching the executor, so failures propagate as skips down the plan.
//!
//! A store error mid-plan aborts it. Builds already recorded are returned
//! inside [`OrchestratorError::Aborted`] so callers still see what ran.

use crate::config::EngineConfig;
use crate::executor::{ExecutionContext, Executor};
use crate::resolve::resolve_arguments;
use crate::staleness::{JobStatus, StalenessError, StalenessEvaluator};
use jc_core::{
    BuildConfig, BuildId, BuildOutcome, BuildRecord, BuildState, DependencyGraph, Direction,
    ExceptionInfo, GraphError, JobDefinition, JobId, ParamKey, RetentionPolicy, SkipReason,
};
use jc_storage::{BuildFilter, BuildStore, KeyFilter, PruneFilter, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("unknown job: {0}")]
    UnknownJob(JobId),

    #[error("cannot build {job}: outdated dependencies {}", join(.outdated))]
    DependenciesNotMet { job: JobId, outdated: Vec<JobId> },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The plan stopped part way; `report` holds the builds recorded so far
    #[error("build plan aborted after {} builds: {source}", .report.records.len())]
    Aborted { report: Box<BuildReport>, source: Box<OrchestratorError> },
}

impl OrchestratorError {
    /// Builds recorded before the plan stopped, if any ran.
    pub fn partial_report(&self) -> Option<&BuildReport> {
        match self {
            Self::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }

    /// The error that stopped the plan, unwrapping [`Self::Aborted`].
    pub fn cause(&self) -> &OrchestratorError {
        match self {
            Self::Aborted { source, .. } => source.cause(),
            other => other,
        }
    }

    fn aborted(report: BuildReport, source: OrchestratorError) -> Self {
        if report.records.is_empty() {
            return source;
        }
        Self::Aborted { report: Box::new(report), source: Box::new(source) }
    }
}

fn join(ids: &[JobId]) -> String {
    ids.iter().map(JobId::as_str).collect::<Vec<_>>().join(", ")
}

impl From<StalenessError> for OrchestratorError {
    fn from(e: StalenessError) -> Self {
        match e {
            StalenessError::Graph(e) => Self::Graph(e),
            StalenessError::Store(e) => Self::Store(e),
        }
    }
}

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub job_id: JobId,
    /// Also build outdated ancestors first
    pub build_deps: bool,
    /// Also rebuild everything downstream afterwards
    pub build_depending: bool,
    /// Partition of the target build; dependencies always build whole
    pub param_key: Option<ParamKey>,
}

impl BuildRequest {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self { job_id: job_id.into(), build_deps: false, build_depending: false, param_key: None }
    }

    jc_core::setters! {
        set { build_deps: bool, build_depending: bool }
        option { param_key: ParamKey }
    }

    /// Flags stored on every build this request creates.
    pub fn build_config(&self) -> BuildConfig {
        BuildConfig::default().build_deps(self.build_deps).build_depending(self.build_depending)
    }
}

/// Result of running a plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Builds created by this plan, in execution order
    pub records: Vec<BuildRecord>,
    pub target_build: Option<BuildId>,
    /// The plan was cut short by cancellation
    pub cancelled: bool,
    /// Jobs left unvisited because of cancellation
    pub not_started: Vec<JobId>,
}

impl BuildReport {
    pub fn target(&self) -> Option<&BuildRecord> {
        let id = self.target_build?;
        self.records.iter().find(|r| r.id == id)
    }

    pub fn record_for(&self, job_id: &str) -> Option<&BuildRecord> {
        self.records.iter().rev().find(|r| r.job_id == job_id)
    }

    /// Every recorded build succeeded and nothing was cancelled.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.records.iter().all(BuildRecord::success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Built only when outdated
    Ancestor,
    Target,
    /// Requires strictly successful upstream builds
    Descendant,
}

impl Role {
    fn param_key(self, request: &BuildRequest) -> Option<&ParamKey> {
        match self {
            Self::Target => request.param_key.as_ref(),
            Self::Ancestor | Self::Descendant => None,
        }
    }
}

pub struct Orchestrator<S: BuildStore + 'static, E: Executor> {
    graph: Arc<DependencyGraph>,
    store: Arc<S>,
    executor: E,
    config: EngineConfig,
}

impl<S: BuildStore + 'static, E: Executor> Orchestrator<S, E> {
    pub fn new(graph: Arc<DependencyGraph>, store: Arc<S>, executor: E) -> Self {
        Self { graph, store, executor, config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// A fresh evaluator over the current build history.
    pub fn staleness(&self) -> StalenessEvaluator<'_, S> {
        StalenessEvaluator::new(&self.graph, &*self.store)
    }

    pub fn job_status(&self, job_id: &JobId) -> Result<JobStatus, StalenessError> {
        self.staleness().job_status(job_id)
    }

    /// Run the plan for `request`.
    ///
    /// Failed and skipped builds are reported in the [`BuildReport`], not as
    /// errors. An error means the plan could not be carried out: the job is
    /// unknown, its dependencies are outdated and `build_deps` is off, a job
    /// the plan must build already has an unfinished build, or the store
    /// rejected a write. Once a build has been recorded, errors come wrapped
    /// in [`OrchestratorError::Aborted`] with the partial report.
    pub async fn build(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<BuildReport, OrchestratorError> {
        let target = &request.job_id;
        if !self.graph.contains(target) {
            return Err(OrchestratorError::UnknownJob(target.clone()));
        }
        if !request.build_deps {
            let outdated = self.staleness().outdated_dependencies(target)?;
            if !outdated.is_empty() {
                tracing::warn!(job_id = %target, ?outdated, "dependencies not met");
                return Err(OrchestratorError::DependenciesNotMet { job: target.clone(), outdated });
            }
        }

        let plan = self.plan(request)?;
        tracing::info!(
            job_id = %target,
            jobs = plan.len(),
            build_deps = request.build_deps,
            build_depending = request.build_depending,
            "build plan ready"
        );

        self.check_slots(request, &plan)?;

        let started = Instant::now();
        let mut report = BuildReport::default();
        for (pos, (job_id, role)) in plan.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.not_started = plan[pos..].iter().map(|(j, _)| j.clone()).collect();
                tracing::info!(job_id = %target, remaining = report.not_started.len(), "build plan cancelled");
                break;
            }
            if let Err(e) = self.step(request, job_id, *role, &mut report, cancel).await {
                tracing::error!(
                    job_id = %target,
                    failed_job = %job_id,
                    builds = report.records.len(),
                    error = %e,
                    "build plan aborted"
                );
                return Err(OrchestratorError::aborted(report, e));
            }
        }

        tracing::info!(
            job_id = %target,
            builds = report.records.len(),
            success = report.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build plan finished"
        );
        Ok(report)
    }

    /// Build a single job right away, without dependency checks.
    pub async fn run_build(
        &self,
        job_id: &JobId,
        param_key: Option<&ParamKey>,
        cancel: &CancellationToken,
    ) -> Result<BuildRecord, OrchestratorError> {
        let def = self.definition(job_id)?;
        self.execute(def, param_key, BuildConfig::default(), cancel).await
    }

    /// Apply every rule of `policy` in turn. Returns the number of messages
    /// removed.
    pub fn prune_logs(&self, policy: &RetentionPolicy) -> Result<usize, StoreError> {
        let mut removed = 0;
        for (level, max_age) in policy.rules() {
            let mut filter = PruneFilter::default().max_age_ms(max_age.as_millis() as u64);
            if let Some(level) = level {
                filter = filter.max_level(*level);
            }
            removed += self.store.prune_logs(&filter)?;
        }
        tracing::info!(removed, rules = policy.rules().len(), "applied log retention policy");
        Ok(removed)
    }

    /// Run one plan entry, recording its build (if any) in `report`.
    async fn step(
        &self,
        request: &BuildRequest,
        job_id: &JobId,
        role: Role,
        report: &mut BuildReport,
        cancel: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let def = self.definition(job_id)?;
        let key = role.param_key(request);
        let config = request.build_config();

        if let Some(reason) = self.blocked(def, role, report)? {
            let record = self.skip(def, key, config, reason).await?;
            self.push(report, record, role);
            return Ok(());
        }
        if role == Role::Ancestor && !self.staleness().is_outdated(job_id)? {
            tracing::debug!(job_id = %job_id, "up to date");
            return Ok(());
        }

        let record = self.execute(def, key, config, cancel).await?;
        self.push(report, record, role);
        Ok(())
    }

    /// Fail before anything runs when a job the plan always builds already
    /// has an unfinished build. Ancestors are left to the store, as most of
    /// them are skipped as up to date.
    fn check_slots(&self, request: &BuildRequest, plan: &[(JobId, Role)]) -> Result<(), StoreError> {
        for (job_id, role) in plan {
            if *role == Role::Ancestor {
                continue;
            }
            let key = role.param_key(request);
            let filter = BuildFilter::default()
                .key(KeyFilter::Exact(key.cloned()))
                .finished(false)
                .limit(1usize);
            if let Some(running) = self.store.list_builds(job_id, &filter)?.into_iter().next() {
                tracing::warn!(job_id = %job_id, build_id = %running.id, "build already running");
                return Err(StoreError::BuildAlreadyRunning {
                    job_id: job_id.clone(),
                    param_key: key.cloned(),
                    running: running.id,
                });
            }
        }
        Ok(())
    }

    fn definition(&self, job_id: &JobId) -> Result<&JobDefinition, OrchestratorError> {
        self.graph.get(job_id).ok_or_else(|| OrchestratorError::UnknownJob(job_id.clone()))
    }

    fn plan(&self, request: &BuildRequest) -> Result<Vec<(JobId, Role)>, OrchestratorError> {
        let target = &request.job_id;
        let selected = if request.build_depending {
            self.graph.topological_order(target, Direction::Descendants)?
        } else {
            vec![target.clone()]
        };
        let mut members = selected.clone();
        if request.build_deps {
            for job_id in &selected {
                members.extend(self.graph.topological_order(job_id, Direction::Ancestors)?);
            }
        }
        let selected: HashSet<JobId> = selected.into_iter().collect();
        let plan = self
            .graph
            .order_subset(&members)?
            .into_iter()
            .map(|job_id| {
                let role = if job_id == *target {
                    Role::Target
                } else if selected.contains(&job_id) {
                    Role::Descendant
                } else {
                    Role::Ancestor
                };
                (job_id, role)
            })
            .collect();
        Ok(plan)
    }

    /// Why `def` cannot run now, if anything stops it.
    fn blocked(
        &self,
        def: &JobDefinition,
        role: Role,
        report: &BuildReport,
    ) -> Result<Option<SkipReason>, OrchestratorError> {
        for dep in &def.dependencies {
            if let Some(record) = report.record_for(dep) {
                let ok = match role {
                    Role::Descendant => record.is_successful_build(),
                    Role::Ancestor | Role::Target => record.success(),
                };
                if !ok {
                    return Ok(Some(SkipReason::DependencyFailed(dep.clone())));
                }
                if record.is_successful_build() {
                    continue;
                }
            }
            if self.store.get_latest_successful_build(dep, None)?.is_none() {
                return Ok(Some(SkipReason::DependencyNotBuilt(dep.clone())));
            }
        }
        Ok(None)
    }

    fn push(&self, report: &mut BuildReport, record: BuildRecord, role: Role) {
        if role == Role::Target {
            report.target_build = Some(record.id);
        }
        report.records.push(record);
    }

    async fn skip(
        &self,
        def: &JobDefinition,
        key: Option<&ParamKey>,
        config: BuildConfig,
        reason: SkipReason,
    ) -> Result<BuildRecord, OrchestratorError> {
        let created = self.retry("create_build", || self.store.create_build(def, key, config)).await?;
        let build_id = created.id;
        let outcome = BuildOutcome::Skipped(reason);
        let record = self
            .retry("finish_build", || self.store.finish_build(build_id, outcome.clone()))
            .await
            .inspect_err(|e| {
                tracing::error!(job_id = %def.id, %build_id, error = %e, "skipped build left unfinished");
            })?;
        tracing::info!(job_id = %def.id, build_id = %record.id, state = %record.state, "build skipped");
        Ok(record)
    }

    async fn execute(
        &self,
        def: &JobDefinition,
        key: Option<&ParamKey>,
        config: BuildConfig,
        cancel: &CancellationToken,
    ) -> Result<BuildRecord, OrchestratorError> {
        let started = Instant::now();
        let created = self.retry("create_build", || self.store.create_build(def, key, config)).await?;
        let build_id = created.id;
        if let Err(e) = self.retry("start_build", || self.store.start_build(build_id)).await {
            tracing::error!(job_id = %def.id, %build_id, error = %e, "build could not start");
            let outcome = BuildOutcome::Skipped(SkipReason::NotStarted(e.to_string()));
            if let Err(release) = self.store.finish_build(build_id, outcome) {
                tracing::error!(
                    job_id = %def.id,
                    %build_id,
                    error = %release,
                    "unstarted build left holding its slot"
                );
            }
            return Err(e.into());
        }
        tracing::info!(job_id = %def.id, %build_id, function = %def.function, "build started");

        let outcome = match resolve_arguments(def, &*self.store) {
            Ok(resolved) => {
                let store: Arc<dyn BuildStore> = self.store.clone();
                let ctx = ExecutionContext::new(build_id, def.id.clone(), store, cancel.child_token());
                self.executor.execute(def, resolved.args, resolved.kwargs, ctx).await
            }
            Err(e) => {
                tracing::warn!(job_id = %def.id, %build_id, error = %e, "argument resolution failed");
                BuildOutcome::Failure(ExceptionInfo::new("ResolveError", e.to_string()))
            }
        };

        let record = self
            .retry("finish_build", || self.store.finish_build(build_id, outcome.clone()))
            .await
            .inspect_err(|e| {
                tracing::error!(job_id = %def.id, %build_id, error = %e, "build left running");
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &record.state {
            BuildState::Failed => {
                let error = record.exception.as_ref().map(ToString::to_string).unwrap_or_default();
                tracing::error!(job_id = %def.id, %build_id, elapsed_ms, %error, "build failed");
            }
            state => {
                tracing::info!(job_id = %def.id, %build_id, elapsed_ms, %state, "build finished");
            }
        }
        Ok(record)
    }

    /// Retry `op` while the store reports itself unavailable.
    async fn retry<T>(
        &self,
        op_name: &'static str,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(StoreError::Unavailable(reason)) if attempt < self.config.store_retries => {
                    attempt += 1;
                    tracing::warn!(op = op_name, attempt, %reason, "store unavailable, retrying");
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
