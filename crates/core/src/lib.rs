// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jc-core: Core types for Job Control
//!
//! Job definitions, build records and their state machine, log entries,
//! progress trees, and the job dependency graph. Nothing in here performs
//! I/O; storage and execution live in `jc-storage` and `jc-engine`.

pub mod macros;

pub mod build;
pub mod clock;
pub mod config;
pub mod graph;
pub mod id;
pub mod job;
pub mod log;
pub mod progress;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use build::{
    BuildConfig, BuildId, BuildOutcome, BuildRecord, BuildState, ExceptionInfo, InvalidTransition,
    SkipReason,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, JobsConfig};
pub use graph::{DependencyGraph, Direction, GraphError};
pub use id::{short, JobId, ParamKey};
pub use job::{ArgumentValue, JobDefinition, JobDefinitionBuilder};
pub use log::{LogEntry, LogLevel, RetentionPolicy, SourceLocation};
pub use progress::{ProgressNode, ProgressReport, ProgressSummary, ProgressTree};
