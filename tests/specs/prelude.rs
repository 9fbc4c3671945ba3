// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared imports and the scenario harness.

pub use jc_core::test_support::{chain, definition, graph};
pub use jc_core::{
    BuildConfig, BuildOutcome, BuildState, DependencyGraph, ExceptionInfo, FakeClock, JobId,
    SkipReason,
};
pub use jc_engine::{BuildReport, BuildRequest, FakeExecutor, JobStatus, Orchestrator};
pub use jc_storage::{BuildFilter, BuildStore, MemoryStore};
pub use serde_json::json;
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tokio_util::sync::CancellationToken;

pub type Store = MemoryStore<FakeClock>;

/// Orchestrator over an in-memory store with a fake clock and executor.
pub struct Harness {
    pub orch: Orchestrator<Store, FakeExecutor>,
    pub executor: FakeExecutor,
    pub store: Arc<Store>,
    pub clock: FakeClock,
}

impl Harness {
    pub fn new(graph: DependencyGraph) -> Self {
        let clock = FakeClock::new();
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let executor = FakeExecutor::new();
        let orch = Orchestrator::new(Arc::new(graph), Arc::clone(&store), executor.clone());
        Self { orch, executor, store, clock }
    }

    pub async fn build(&self, request: BuildRequest) -> BuildReport {
        self.clock.advance(Duration::from_secs(1));
        self.orch.build(&request, &CancellationToken::new()).await.unwrap()
    }

    pub fn status(&self, job: &str) -> JobStatus {
        self.orch.job_status(&JobId::from(job)).unwrap()
    }

    pub fn states(&self, report: &BuildReport) -> Vec<(String, BuildState)> {
        report.records.iter().map(|r| (r.job_id.to_string(), r.state.clone())).collect()
    }
}
