// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jc_core::test_support::definition;
use jc_core::{BuildConfig, BuildId, FakeClock};
use jc_storage::{BuildStore, MemoryStore};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn def(function: &str) -> JobDefinition {
    JobDefinition::builder("j", function).build()
}

fn ctx() -> (Arc<MemoryStore<FakeClock>>, ExecutionContext) {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let build = store.create_build(&definition("j"), None, BuildConfig::default()).unwrap();
    store.start_build(build.id).unwrap();
    let ctx = ExecutionContext::new(build.id, build.job_id, store.clone(), CancellationToken::new());
    (store, ctx)
}

fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .with("math:add", |call: JobCall| {
            let a = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
            let b = call.kwarg("b").and_then(Value::as_i64).unwrap_or(0);
            call.ctx.progress.report(&["sum"], 1, 1);
            Ok(json!(a + b))
        })
        .with("fail", |_| Err(JobError::failed("ValueError", "bad input")))
        .with("skip", |_| Err(JobError::Skip("nothing new".into())))
        .with("cancel", |_| Err(JobError::Cancelled))
        .with("panic", |_| panic!("kaboom"))
}

async fn run(function: &str, args: Vec<Value>, kwargs: IndexMap<String, Value>) -> ExecutionOutcome {
    let (_store, ctx) = ctx();
    RegistryExecutor::new(registry()).execute(&def(function), args, kwargs, ctx).await
}

#[tokio::test]
async fn runs_registered_function() {
    let (store, ctx) = ctx();
    let build_id: BuildId = ctx.build_id;
    let kwargs = IndexMap::from([("b".to_string(), json!(3))]);
    let outcome =
        RegistryExecutor::new(registry()).execute(&def("math:add"), vec![json!(2)], kwargs, ctx).await;
    assert_eq!(outcome, ExecutionOutcome::Success(json!(5)));
    assert_eq!(store.get_progress(build_id).unwrap().summary().label, "1/1 (100%)");
}

#[tokio::test]
async fn failure_is_captured() {
    let outcome = run("fail", Vec::new(), IndexMap::new()).await;
    assert_eq!(outcome, ExecutionOutcome::Failure(ExceptionInfo::new("ValueError", "bad input")));
}

#[tokio::test]
async fn skip_is_a_requested_skip() {
    let outcome = run("skip", Vec::new(), IndexMap::new()).await;
    assert_eq!(outcome, ExecutionOutcome::Skipped(SkipReason::Requested("nothing new".into())));
}

#[tokio::test]
async fn cancelled_job() {
    assert_eq!(run("cancel", Vec::new(), IndexMap::new()).await, ExecutionOutcome::Cancelled);
}

#[tokio::test]
async fn panic_becomes_failure() {
    let outcome = run("panic", Vec::new(), IndexMap::new()).await;
    assert_eq!(outcome, ExecutionOutcome::Failure(ExceptionInfo::new("Panic", "kaboom")));
}

#[tokio::test]
async fn unknown_function_fails() {
    let outcome = run("nope:missing", Vec::new(), IndexMap::new()).await;
    match outcome {
        ExecutionOutcome::Failure(info) => assert_eq!(info.kind, "UnknownFunction"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_context_skips_invocation() {
    let (_store, ctx) = ctx();
    ctx.cancel.cancel();
    let outcome = RegistryExecutor::new(registry())
        .execute(&def("math:add"), Vec::new(), IndexMap::new(), ctx)
        .await;
    assert_eq!(outcome, ExecutionOutcome::Cancelled);
}

#[test]
fn registry_names_and_replacement() {
    let mut registry = registry();
    registry.register("fail", |_| Ok(json!("fixed")));
    assert!(registry.contains("fail"));
    assert!(!registry.contains("other"));
    assert_eq!(registry.names(), vec!["cancel", "fail", "math:add", "panic", "skip"]);
}
