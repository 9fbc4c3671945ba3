// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function registry and the executor that runs registered functions.
//!
//! Job definitions name their callable (`"reports:monthly"`); the registry
//! maps those names to closures registered at startup.

use crate::executor::{ExecutionContext, ExecutionOutcome, Executor};
use async_trait::async_trait;
use indexmap::IndexMap;
use jc_core::{ExceptionInfo, JobDefinition, SkipReason};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Arguments and context of one invocation.
#[derive(Debug, Clone)]
pub struct JobCall {
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
    pub ctx: ExecutionContext,
}

impl JobCall {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }
}

/// Ways a job function can end other than returning a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(ExceptionInfo),
    /// Nothing to do; recorded as a successful skip
    #[error("skipped: {0}")]
    Skip(String),
    #[error("cancelled")]
    Cancelled,
}

impl JobError {
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed(ExceptionInfo::new(kind, message))
    }
}

impl From<JobError> for ExecutionOutcome {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Failed(info) => Self::Failure(info),
            JobError::Skip(reason) => Self::Skipped(SkipReason::Requested(reason)),
            JobError::Cancelled => Self::Cancelled,
        }
    }
}

pub type JobFn = Arc<dyn Fn(JobCall) -> Result<Value, JobError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, JobFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(JobCall) -> Result<Value, JobError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(JobCall) -> Result<Value, JobError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<JobFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry").field("functions", &self.names()).finish()
    }
}

/// Runs registered functions on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct RegistryExecutor {
    registry: Arc<FunctionRegistry>,
}

impl RegistryExecutor {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

#[async_trait]
impl Executor for RegistryExecutor {
    async fn execute(
        &self,
        job: &JobDefinition,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
        ctx: ExecutionContext,
    ) -> ExecutionOutcome {
        let Some(function) = self.registry.get(&job.function) else {
            return ExecutionOutcome::Failure(ExceptionInfo::new(
                "UnknownFunction",
                format!("no function registered as {:?}", job.function),
            ));
        };
        if ctx.is_cancelled() {
            return ExecutionOutcome::Cancelled;
        }
        let call = JobCall { args, kwargs, ctx };
        match tokio::task::spawn_blocking(move || function(call)).await {
            Ok(Ok(value)) => ExecutionOutcome::Success(value),
            Ok(Err(err)) => err.into(),
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "job panicked".to_string());
                tracing::error!(job_id = %job.id, %message, "job panicked");
                ExecutionOutcome::Failure(ExceptionInfo::new("Panic", message))
            }
            Err(_) => ExecutionOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
