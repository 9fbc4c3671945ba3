// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{DependencyGraph, JobDefinition, JobId};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use super::job;
    use crate::build::{BuildOutcome, ExceptionInfo, SkipReason};
    use crate::job::JobDefinition;
    use crate::JobId;
    use proptest::prelude::*;

    pub fn arb_skip_reason() -> impl Strategy<Value = SkipReason> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(|s| SkipReason::DependencyFailed(JobId::from(s))),
            "[a-z]{1,6}".prop_map(|s| SkipReason::DependencyNotBuilt(JobId::from(s))),
            any::<String>().prop_map(SkipReason::Requested),
            any::<String>().prop_map(SkipReason::NotStarted),
        ]
    }

    pub fn arb_build_outcome() -> impl Strategy<Value = BuildOutcome> {
        prop_oneof![
            any::<i64>().prop_map(|n| BuildOutcome::Success(n.into())),
            ("[A-Za-z]{1,10}", any::<String>())
                .prop_map(|(k, m)| BuildOutcome::Failure(ExceptionInfo::new(k, m))),
            arb_skip_reason().prop_map(BuildOutcome::Skipped),
            Just(BuildOutcome::Cancelled),
        ]
    }

    /// Random DAG of up to `max` jobs named `j0..jN`, in shuffled
    /// definition order. Job `i` may only depend on jobs `< i`.
    pub fn arb_dag(max: usize) -> impl Strategy<Value = Vec<JobDefinition>> {
        (1..=max)
            .prop_flat_map(|n| {
                let edges = proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n);
                let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
                (edges, order)
            })
            .prop_map(|(edges, order)| {
                order
                    .into_iter()
                    .map(|i| {
                        let deps: Vec<String> =
                            (0..i).filter(|&j| edges[i][j]).map(|j| format!("j{j}")).collect();
                        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                        job(&format!("j{i}"), &deps)
                    })
                    .collect()
            })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

/// A job calling `test:{id}` with the given dependencies.
pub fn job(id: &str, deps: &[&str]) -> JobDefinition {
    deps.iter()
        .fold(JobDefinition::builder(id, format!("test:{id}")), |b, d| b.depends_on(*d))
        .build()
}

/// Build a graph from `(id, deps)` pairs.
///
/// Panics on invalid input; fixtures are expected to be valid.
#[allow(clippy::expect_used)]
pub fn graph(jobs: &[(&str, &[&str])]) -> DependencyGraph {
    DependencyGraph::build(jobs.iter().map(|(id, deps)| job(id, deps))).expect("valid test graph")
}

/// `a ← b ← c ...`: each job depends on the previous one.
#[allow(clippy::expect_used)]
pub fn chain(ids: &[&str]) -> DependencyGraph {
    let defs = ids
        .iter()
        .enumerate()
        .map(|(i, id)| if i == 0 { job(id, &[]) } else { job(id, &[ids[i - 1]]) });
    DependencyGraph::build(defs).expect("valid chain")
}

/// A dependency-free job calling `test:{id}`.
pub fn definition(id: impl Into<JobId>) -> JobDefinition {
    let id = id.into();
    let function = format!("test:{id}");
    JobDefinition::builder(id, function).build()
}

pub fn ids(ids: &[&str]) -> Vec<JobId> {
    ids.iter().map(|s| JobId::from(*s)).collect()
}
