// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure propagation and dependency ordering.

use crate::prelude::*;

#[tokio::test]
async fn failing_root_skips_the_whole_chain() {
    let h = Harness::new(chain(&["a", "b", "c"]));
    h.executor.set_outcome("a", BuildOutcome::Failure(ExceptionInfo::new("IOError", "disk full")));

    let report = h.build(BuildRequest::new("c").build_deps(true)).await;

    assert_eq!(h.executor.executed(), vec!["a"]);
    assert_eq!(
        h.states(&report),
        vec![
            ("a".to_string(), BuildState::Failed),
            ("b".to_string(), BuildState::Skipped(SkipReason::DependencyFailed(JobId::from("a")))),
            ("c".to_string(), BuildState::Skipped(SkipReason::DependencyFailed(JobId::from("b")))),
        ]
    );
    assert_eq!(h.status("a"), JobStatus::Failed);
    // skipped without ever starting, so c was never built
    assert_eq!(h.status("c"), JobStatus::NotBuilt);
}

#[tokio::test]
async fn diamond_builds_each_ancestor_once() {
    let h = Harness::new(graph(&[("base", &[]), ("left", &["base"]), ("right", &["base"]), ("top", &["left", "right"])]));

    let report = h.build(BuildRequest::new("top").build_deps(true)).await;

    assert_eq!(h.executor.executed(), vec!["base", "left", "right", "top"]);
    assert!(report.is_success());
    for job in ["base", "left", "right", "top"] {
        assert_eq!(h.status(job), JobStatus::Success, "{job}");
    }
}

#[tokio::test]
async fn failing_branch_spares_the_healthy_one() {
    let h = Harness::new(graph(&[("base", &[]), ("left", &["base"]), ("right", &["base"]), ("top", &["left", "right"])]));
    h.executor.set_outcome("left", BuildOutcome::Failure(ExceptionInfo::new("E", "left broke")));

    let report = h.build(BuildRequest::new("top").build_deps(true)).await;

    assert_eq!(h.executor.executed(), vec!["base", "left", "right"]);
    assert_eq!(report.record_for("right").map(|r| r.state.clone()), Some(BuildState::Succeeded));
    assert_eq!(
        report.target().map(|r| r.state.clone()),
        Some(BuildState::Skipped(SkipReason::DependencyFailed(JobId::from("left"))))
    );
}
