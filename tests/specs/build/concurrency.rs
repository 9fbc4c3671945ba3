// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At most one unfinished build per job and key.

use crate::prelude::*;
use jc_core::ParamKey;
use jc_engine::OrchestratorError;
use jc_storage::StoreError;
use std::sync::Barrier;

#[test]
fn racing_creators_admit_exactly_one() {
    let store = Arc::new(MemoryStore::with_clock(FakeClock::new()));
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                store.create_build(&definition("report"), None, BuildConfig::default()).is_ok()
            })
        })
        .collect();
    let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
    assert_eq!(admitted, 1);
    assert_eq!(store.running_builds().len(), 1);
}

#[tokio::test]
async fn running_build_blocks_orchestrator_until_finished() {
    let h = Harness::new(chain(&["a"]));
    let job = JobId::from("a");
    let held = h.store.create_build(&definition(&job), None, BuildConfig::default()).unwrap();

    let err = h.orch.build(&BuildRequest::new("a"), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Store(StoreError::BuildAlreadyRunning { .. })));

    // another partition is free to run
    let keyed = h.build(BuildRequest::new("a").param_key("eu")).await;
    assert_eq!(keyed.target().and_then(|r| r.param_key.clone()), Some(ParamKey::from("eu")));

    h.store.start_build(held.id).unwrap();
    h.store.finish_build(held.id, BuildOutcome::Cancelled).unwrap();
    let report = h.build(BuildRequest::new("a")).await;
    assert!(report.is_success());
}
