// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jc_core::test_support::{definition, job};
use jc_core::{BuildConfig, ExceptionInfo, FakeClock, LogEntry, LogLevel, ProgressReport};
use jc_storage::{LogFilter, MemoryStore};
use serde_json::json;

fn context(store: &Arc<MemoryStore<FakeClock>>, job_id: &str) -> ExecutionContext {
    let build = store.create_build(&definition(job_id), None, BuildConfig::default()).unwrap();
    store.start_build(build.id).unwrap();
    ExecutionContext::new(build.id, build.job_id, store.clone(), CancellationToken::new())
}

#[tokio::test]
async fn fake_executor_succeeds_with_job_id_by_default() {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let executor = FakeExecutor::new();
    let ctx = context(&store, "a");
    let outcome = executor.execute(&job("a", &[]), vec![json!(1)], IndexMap::new(), ctx).await;
    assert_eq!(outcome, ExecutionOutcome::Success(json!("a")));
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec![json!(1)]);
    assert_eq!(executor.executed(), vec!["a"]);
}

#[tokio::test]
async fn fake_executor_replays_scripted_behaviour() {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let executor = FakeExecutor::new();
    let token = CancellationToken::new();
    executor.set_outcome("a", ExecutionOutcome::Failure(ExceptionInfo::new("E", "m")));
    executor.set_progress("a", vec![ProgressReport::new(&["x"], 1, 2)]);
    executor.set_logs("a", vec![LogEntry::new(LogLevel::Warning, "a", "careful")]);
    executor.cancel_after("a", token.clone());

    let ctx = context(&store, "a");
    let build_id = ctx.build_id;
    let outcome = executor.execute(&job("a", &[]), Vec::new(), IndexMap::new(), ctx).await;

    assert!(matches!(outcome, ExecutionOutcome::Failure(_)));
    assert!(token.is_cancelled());
    assert_eq!(store.get_progress(build_id).unwrap().summary().label, "1/2 (50%)");
    assert_eq!(store.list_logs(build_id, &LogFilter::default()).unwrap()[0].message, "careful");
}

#[tokio::test]
async fn shared_executor_delegates() {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let fake = FakeExecutor::new();
    let shared: Arc<dyn Executor> = Arc::new(fake.clone());
    let ctx = context(&store, "b");
    shared.execute(&job("b", &[]), Vec::new(), IndexMap::new(), ctx).await;
    assert_eq!(fake.executed(), vec!["b"]);
}

#[test]
fn context_reflects_cancellation() {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let ctx = context(&store, "a");
    assert!(!ctx.is_cancelled());
    ctx.cancel.cancel();
    assert!(ctx.is_cancelled());
}
