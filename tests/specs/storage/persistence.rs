// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build history survives a snapshot round trip.

use crate::prelude::*;

#[tokio::test]
async fn staleness_is_preserved_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("builds.snapshot");

    let h = Harness::new(chain(&["a", "b"]));
    h.build(BuildRequest::new("b").build_deps(true)).await;
    h.build(BuildRequest::new("a")).await;
    assert_eq!(h.status("b"), JobStatus::Outdated);
    h.store.save(&path).unwrap();

    let clock = FakeClock::new();
    let store = Arc::new(MemoryStore::load(clock.clone(), &path).unwrap());
    assert_eq!(store.len(), 3);
    let executor = FakeExecutor::new();
    let orch = Orchestrator::new(Arc::new(chain(&["a", "b"])), Arc::clone(&store), executor.clone());
    assert_eq!(orch.job_status(&JobId::from("b")).unwrap(), JobStatus::Outdated);

    // the restored clock never runs backwards, even from an earlier wall time
    let report = orch.build(&BuildRequest::new("b"), &CancellationToken::new()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(orch.job_status(&JobId::from("b")).unwrap(), JobStatus::Success);
    assert_eq!(executor.executed(), vec!["b"]);
}

#[tokio::test]
async fn unfinished_builds_still_hold_their_slot_after_restore() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("builds.snapshot");
    let store = MemoryStore::with_clock(FakeClock::new());
    let held = store.create_build(&definition("a"), None, BuildConfig::default()).unwrap();
    store.save(&path).unwrap();

    let restored = MemoryStore::load(FakeClock::new(), &path).unwrap();
    assert!(restored.create_build(&definition("a"), None, BuildConfig::default()).is_err());
    assert_eq!(restored.get_build(held.id).unwrap().state, BuildState::Created);
}
