// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build records and the build state machine.
//!
//! ```text
//! Created ──► Running ──► Succeeded | Failed | Skipped | Cancelled
//!    │
//!    └──────► Skipped   (blocked by a dependency, never started)
//! ```
//!
//! Terminal states are final. Timestamps are supplied by the store clock.

use crate::id::{JobId, ParamKey};
use crate::job::JobDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Store-assigned build identifier. Strictly increasing per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a build was recorded as skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An upstream build in the same plan failed, was skipped or cancelled
    DependencyFailed(JobId),
    /// A dependency outside the plan has never been built successfully
    DependencyNotBuilt(JobId),
    /// The job itself asked to be skipped. Counts as a success.
    Requested(String),
    /// The store could not start the build; it never ran
    NotStarted(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyFailed(id) => write!(f, "dependency {id} did not succeed"),
            Self::DependencyNotBuilt(id) => write!(f, "dependency {id} has no successful build"),
            Self::Requested(msg) => write!(f, "skipped by job: {msg}"),
            Self::NotStarted(msg) => write!(f, "never started: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Created,
    Running,
    Succeeded,
    Failed,
    Skipped(SkipReason),
    Cancelled,
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created | Self::Running)
    }
}

crate::simple_display! {
    BuildState {
        Created => "created",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Skipped(..) => "skipped",
        Cancelled => "cancelled",
    }
}

/// Serialized failure information: error kind, message and optional detail
/// lines (traceback, context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into(), details: Vec::new() }
    }

    pub fn with_detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Success(Value),
    Failure(ExceptionInfo),
    Skipped(SkipReason),
    Cancelled,
}

crate::simple_display! {
    BuildOutcome {
        Success(..) => "success",
        Failure(..) => "failure",
        Skipped(..) => "skipped",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("build {build_id}: cannot go from {from} to {to}")]
pub struct InvalidTransition {
    pub build_id: BuildId,
    pub from: String,
    pub to: String,
}

/// Flags of the build request that created a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub build_deps: bool,
    #[serde(default)]
    pub build_depending: bool,
}

impl BuildConfig {
    crate::setters! {
        set { build_deps: bool, build_depending: bool }
    }
}

/// One execution attempt of a job, or of one partition of it.
///
/// The job definition and request flags are copied in at creation, so a
/// record keeps describing what actually ran after reconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: BuildId,
    pub job_id: JobId,
    pub job_config: JobDefinition,
    #[serde(default)]
    pub build_config: BuildConfig,
    /// `None` covers the whole job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_key: Option<ParamKey>,
    pub created_ms: u64,
    #[serde(default)]
    pub start_ms: Option<u64>,
    #[serde(default)]
    pub end_ms: Option<u64>,
    pub state: BuildState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retval: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

impl BuildRecord {
    pub fn new(
        id: BuildId,
        job_config: JobDefinition,
        param_key: Option<ParamKey>,
        build_config: BuildConfig,
        created_ms: u64,
    ) -> Self {
        Self {
            id,
            job_id: job_config.id.clone(),
            job_config,
            build_config,
            param_key,
            created_ms,
            start_ms: None,
            end_ms: None,
            state: BuildState::Created,
            retval: None,
            exception: None,
        }
    }

    pub fn started(&self) -> bool {
        self.start_ms.is_some()
    }

    pub fn finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// True for a successful build and for a skip the job requested itself.
    pub fn success(&self) -> bool {
        matches!(self.state, BuildState::Succeeded | BuildState::Skipped(SkipReason::Requested(_)))
    }

    pub fn skipped(&self) -> bool {
        matches!(self.state, BuildState::Skipped(_))
    }

    /// Finished, successful and not skipped: the only builds whose return
    /// value feeds dependents and whose timestamps drive staleness.
    pub fn is_successful_build(&self) -> bool {
        self.state == BuildState::Succeeded
    }

    pub fn duration_ms(&self) -> Option<u64> {
        Some(self.end_ms?.saturating_sub(self.start_ms?))
    }

    /// `Created → Running`
    pub fn start(&mut self, now_ms: u64) -> Result<(), InvalidTransition> {
        if self.state != BuildState::Created {
            return Err(self.invalid("running"));
        }
        self.state = BuildState::Running;
        self.start_ms = Some(now_ms);
        Ok(())
    }

    /// `Running → terminal`, or `Created → Skipped` for a build blocked
    /// before it could start.
    pub fn finish(&mut self, outcome: BuildOutcome, now_ms: u64) -> Result<(), InvalidTransition> {
        let allowed = match self.state {
            BuildState::Running => true,
            BuildState::Created => matches!(outcome, BuildOutcome::Skipped(_)),
            _ => false,
        };
        if !allowed {
            return Err(self.invalid(&outcome.to_string()));
        }
        self.state = match outcome {
            BuildOutcome::Success(value) => {
                self.retval = Some(value);
                BuildState::Succeeded
            }
            BuildOutcome::Failure(info) => {
                self.exception = Some(info);
                BuildState::Failed
            }
            BuildOutcome::Skipped(reason) => BuildState::Skipped(reason),
            BuildOutcome::Cancelled => BuildState::Cancelled,
        };
        self.end_ms = Some(now_ms);
        Ok(())
    }

    fn invalid(&self, to: &str) -> InvalidTransition {
        InvalidTransition { build_id: self.id, from: self.state.to_string(), to: to.to_string() }
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
