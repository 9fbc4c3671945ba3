// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jc-engine: Build orchestration for Job Control
//!
//! Decides which jobs are outdated, plans builds in dependency order and
//! drives them through an [`Executor`], recording every outcome in a
//! [`jc_storage::BuildStore`].

mod config;
mod env;
mod executor;
mod orchestrator;
mod registry;
mod resolve;
mod sink;
mod staleness;

pub use config::EngineConfig;
pub use executor::{ExecutionContext, ExecutionOutcome, Executor};
pub use orchestrator::{BuildReport, BuildRequest, Orchestrator, OrchestratorError};
pub use registry::{FunctionRegistry, JobCall, JobError, JobFn, RegistryExecutor};
pub use resolve::{resolve_arguments, ResolveError, ResolvedArguments};
pub use sink::{LogSink, ProgressSink};
pub use staleness::{JobStatus, StalenessError, StalenessEvaluator};

#[cfg(any(test, feature = "test-support"))]
pub use executor::{ExecuteCall, FakeExecutor};
