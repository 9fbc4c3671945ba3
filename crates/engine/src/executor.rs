// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor contract between the orchestrator and job code.

use crate::sink::{LogSink, ProgressSink};
use async_trait::async_trait;
use indexmap::IndexMap;
use jc_core::{BuildId, BuildOutcome, JobDefinition, JobId};
use jc_storage::BuildStore;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How an execution ended, as reported by an [`Executor`].
pub type ExecutionOutcome = BuildOutcome;

/// Everything a running job may touch besides its arguments.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub build_id: BuildId,
    pub job_id: JobId,
    pub progress: ProgressSink,
    pub log: LogSink,
    /// Cancelled when the surrounding build plan is cancelled
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(
        build_id: BuildId,
        job_id: JobId,
        store: Arc<dyn BuildStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            build_id,
            progress: ProgressSink::new(build_id, job_id.clone(), Arc::clone(&store)),
            log: LogSink::new(build_id, job_id.clone(), store),
            job_id,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Runs job code.
///
/// Implementations never fail: errors, panics and cancellation are all
/// reported through the returned outcome.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn execute(
        &self,
        job: &JobDefinition,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
        ctx: ExecutionContext,
    ) -> ExecutionOutcome;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn execute(
        &self,
        job: &JobDefinition,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
        ctx: ExecutionContext,
    ) -> ExecutionOutcome {
        (**self).execute(job, args, kwargs, ctx).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ExecutionContext, ExecutionOutcome, Executor};
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use jc_core::{BuildId, JobDefinition, JobId, LogEntry, ProgressReport};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Recorded execution
    #[derive(Debug, Clone, PartialEq)]
    pub struct ExecuteCall {
        pub job_id: JobId,
        pub build_id: BuildId,
        pub args: Vec<Value>,
        pub kwargs: IndexMap<String, Value>,
    }

    #[derive(Default)]
    struct FakeExecutorState {
        calls: Vec<ExecuteCall>,
        outcomes: HashMap<JobId, ExecutionOutcome>,
        progress: HashMap<JobId, Vec<ProgressReport>>,
        logs: HashMap<JobId, Vec<LogEntry>>,
        cancel_after: HashMap<JobId, CancellationToken>,
    }

    /// Fake executor for testing.
    ///
    /// Jobs succeed with their own id as return value unless an outcome was
    /// scripted with [`FakeExecutor::set_outcome`].
    #[derive(Clone, Default)]
    pub struct FakeExecutor {
        inner: Arc<Mutex<FakeExecutorState>>,
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_outcome(&self, job_id: &str, outcome: ExecutionOutcome) {
            self.inner.lock().outcomes.insert(JobId::from(job_id), outcome);
        }

        /// Progress rows the job reports before returning
        pub fn set_progress(&self, job_id: &str, rows: Vec<ProgressReport>) {
            self.inner.lock().progress.insert(JobId::from(job_id), rows);
        }

        /// Log entries the job writes before returning
        pub fn set_logs(&self, job_id: &str, entries: Vec<LogEntry>) {
            self.inner.lock().logs.insert(JobId::from(job_id), entries);
        }

        /// Cancel `token` once `job_id` has run.
        pub fn cancel_after(&self, job_id: &str, token: CancellationToken) {
            self.inner.lock().cancel_after.insert(JobId::from(job_id), token);
        }

        /// Get all recorded executions
        pub fn calls(&self) -> Vec<ExecuteCall> {
            self.inner.lock().calls.clone()
        }

        /// Ids of executed jobs, in call order
        pub fn executed(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.job_id.to_string()).collect()
        }
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn execute(
            &self,
            job: &JobDefinition,
            args: Vec<Value>,
            kwargs: IndexMap<String, Value>,
            ctx: ExecutionContext,
        ) -> ExecutionOutcome {
            let (outcome, progress, logs, cancel) = {
                let mut state = self.inner.lock();
                state.calls.push(ExecuteCall {
                    job_id: job.id.clone(),
                    build_id: ctx.build_id,
                    args,
                    kwargs,
                });
                (
                    state.outcomes.get(&job.id).cloned(),
                    state.progress.get(&job.id).cloned().unwrap_or_default(),
                    state.logs.get(&job.id).cloned().unwrap_or_default(),
                    state.cancel_after.get(&job.id).cloned(),
                )
            };
            for row in progress {
                ctx.progress.send(row);
            }
            for entry in logs {
                ctx.log.log(entry);
            }
            if let Some(token) = cancel {
                token.cancel();
            }
            outcome.unwrap_or_else(|| ExecutionOutcome::Success(Value::String(job.id.to_string())))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecuteCall, FakeExecutor};

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
