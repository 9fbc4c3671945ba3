// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs loaded from TOML and run through registered functions.

use crate::prelude::*;
use jc_core::JobsConfig;
use jc_engine::{FunctionRegistry, JobError, RegistryExecutor};
use jc_storage::LogFilter;

const PIPELINE: &str = r#"
[[jobs]]
id = "extract"
title = "Extract rows"
function = "etl:extract"
args = [3]

[[jobs]]
id = "transform"
function = "etl:double"
dependencies = ["extract"]
kwargs = { rows = { retval = "extract" } }

[[jobs]]
id = "load"
function = "etl:sum"
args = [{ retval = "transform" }]
dependencies = ["transform"]
"#;

fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .with("etl:extract", |call| {
            let n = call.arg(0).and_then(|v| v.as_u64()).unwrap_or(0);
            call.ctx.progress.report(&["extract"], n, n);
            Ok(json!((1..=n).collect::<Vec<_>>()))
        })
        .with("etl:double", |call| {
            let rows = call.kwarg("rows").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            call.ctx.log.info(format!("doubling {} rows", rows.len()));
            Ok(json!(rows.iter().filter_map(|v| v.as_u64()).map(|n| n * 2).collect::<Vec<_>>()))
        })
        .with("etl:sum", |call| match call.arg(0).and_then(|v| v.as_array()) {
            Some(rows) => Ok(json!(rows.iter().filter_map(|v| v.as_u64()).sum::<u64>())),
            None => Err(JobError::failed("TypeError", "expected a list")),
        })
}

#[tokio::test]
async fn pipeline_passes_return_values_downstream() {
    let graph = JobsConfig::from_toml(PIPELINE).unwrap().into_graph().unwrap();
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let orch = Orchestrator::new(Arc::new(graph), Arc::clone(&store), RegistryExecutor::new(registry()));

    let report = orch.build(&BuildRequest::new("load").build_deps(true), &CancellationToken::new()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.target().and_then(|r| r.retval.clone()), Some(json!(12)));
    let transform = report.record_for("transform").unwrap();
    let logs = store.list_logs(transform.id, &LogFilter::default()).unwrap();
    assert_eq!(logs[0].message, "doubling 3 rows");
    let extract = report.record_for("extract").unwrap();
    let progress = store.get_progress(extract.id).unwrap();
    assert_eq!(progress.summary().label, "3/3 (100%)");
}

#[tokio::test]
async fn unregistered_function_fails_the_build() {
    let graph = JobsConfig::from_toml(PIPELINE).unwrap().into_graph().unwrap();
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let registry = FunctionRegistry::new().with("etl:extract", |_| Ok(json!([])));
    let orch = Orchestrator::new(Arc::new(graph), store, RegistryExecutor::new(registry));

    let report = orch.build(&BuildRequest::new("load").build_deps(true), &CancellationToken::new()).await.unwrap();

    let transform = report.record_for("transform").unwrap();
    assert_eq!(transform.state, BuildState::Failed);
    assert_eq!(transform.exception.as_ref().map(|e| e.kind.as_str()), Some("UnknownFunction"));
    assert_eq!(
        report.record_for("load").map(|r| r.state.clone()),
        Some(BuildState::Skipped(SkipReason::DependencyFailed(JobId::from("transform"))))
    );
}
