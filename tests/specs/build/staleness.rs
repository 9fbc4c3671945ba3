// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status transitions as dependencies are rebuilt.

use crate::prelude::*;

#[tokio::test]
async fn rebuilding_upstream_outdates_downstream() {
    let h = Harness::new(chain(&["a", "b"]));
    assert_eq!(h.status("a"), JobStatus::NotBuilt);
    assert_eq!(h.status("b"), JobStatus::NotBuilt);

    h.build(BuildRequest::new("a")).await;
    h.build(BuildRequest::new("b")).await;
    assert_eq!(h.status("a"), JobStatus::Success);
    assert_eq!(h.status("b"), JobStatus::Success);

    h.build(BuildRequest::new("a")).await;
    assert_eq!(h.status("a"), JobStatus::Success);
    assert_eq!(h.status("b"), JobStatus::Outdated);

    h.build(BuildRequest::new("b")).await;
    assert_eq!(h.status("b"), JobStatus::Success);
}

#[tokio::test]
async fn build_depending_refreshes_everything_downstream() {
    let h = Harness::new(chain(&["a", "b", "c"]));
    h.build(BuildRequest::new("c").build_deps(true)).await;
    h.build(BuildRequest::new("a")).await;
    assert_eq!(h.status("b"), JobStatus::Outdated);
    assert_eq!(h.status("c"), JobStatus::Outdated);

    let report = h.build(BuildRequest::new("a").build_depending(true)).await;
    assert!(report.is_success());
    assert_eq!(report.records.len(), 3);
    for job in ["a", "b", "c"] {
        assert_eq!(h.status(job), JobStatus::Success, "{job}");
    }
}

#[tokio::test]
async fn failed_rebuild_keeps_previous_success() {
    let h = Harness::new(chain(&["a", "b"]));
    h.build(BuildRequest::new("b").build_deps(true)).await;
    h.executor.set_outcome("a", BuildOutcome::Failure(ExceptionInfo::new("E", "flaky")));
    h.build(BuildRequest::new("a")).await;

    // a failed attempt does not replace the last good build
    assert_eq!(h.status("a"), JobStatus::Success);
    assert_eq!(h.status("b"), JobStatus::Success);
}
