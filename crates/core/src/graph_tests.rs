// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::arb_dag;
use crate::test_support::{chain, graph, ids, job};
use proptest::prelude::*;

#[test]
fn two_job_cycle_is_reported_with_path() {
    let err = DependencyGraph::build(vec![job("A", &["B"]), job("B", &["A"])]).unwrap_err();
    assert_eq!(err, GraphError::Cycle { path: ids(&["A", "B", "A"]) });
    assert_eq!(err.to_string(), "dependency cycle: A → B → A");
}

#[test]
fn self_dependency_is_a_cycle() {
    let err = DependencyGraph::build(vec![job("A", &["A"])]).unwrap_err();
    assert_eq!(err, GraphError::Cycle { path: ids(&["A", "A"]) });
}

#[test]
fn cycle_below_root_is_detected() {
    let err = DependencyGraph::build(vec![
        job("A", &["B", "D"]),
        job("B", &["C"]),
        job("C", &["D"]),
        job("D", &["B"]),
    ])
    .unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }), "{err:?}");
}

#[test]
fn duplicate_job_is_rejected() {
    let err = DependencyGraph::build(vec![job("A", &[]), job("A", &[])]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateJob(JobId::from("A")));
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = DependencyGraph::build(vec![job("A", &["ghost"])]).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownDependency { job: JobId::from("A"), dependency: JobId::from("ghost") }
    );
}

#[test]
fn ancestors_of_fan_in() {
    let g = graph(&[("A", &["B", "C"]), ("B", &[]), ("C", &[])]);
    assert_eq!(g.topological_order("A", Direction::Ancestors).unwrap(), ids(&["B", "C", "A"]));
}

#[test]
fn ancestors_of_diamond_chain() {
    let g = graph(&[("A", &["B", "D"]), ("B", &["C"]), ("C", &["D"]), ("D", &[])]);
    assert_eq!(g.topological_order("A", Direction::Ancestors).unwrap(), ids(&["D", "C", "B", "A"]));
}

#[test]
fn ancestors_follow_longest_path() {
    let g = graph(&[("A", &["B", "E"]), ("B", &[]), ("C", &["B"]), ("D", &["C"]), ("E", &["D"])]);
    assert_eq!(
        g.topological_order("A", Direction::Ancestors).unwrap(),
        ids(&["B", "C", "D", "E", "A"])
    );
}

#[test]
fn ancestors_exclude_unrelated_jobs() {
    let g = graph(&[("A", &[]), ("B", &["A"]), ("X", &[])]);
    assert_eq!(g.topological_order("B", Direction::Ancestors).unwrap(), ids(&["A", "B"]));
    assert_eq!(g.topological_order("X", Direction::Ancestors).unwrap(), ids(&["X"]));
}

#[test]
fn descendants_in_build_order() {
    let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"]), ("E", &[])]);
    assert_eq!(
        g.topological_order("A", Direction::Descendants).unwrap(),
        ids(&["A", "B", "C", "D"])
    );
    assert_eq!(g.topological_order("C", Direction::Descendants).unwrap(), ids(&["C", "D"]));
}

#[test]
fn unknown_root_is_an_error() {
    let g = chain(&["a", "b"]);
    assert_eq!(
        g.topological_order("zzz", Direction::Ancestors).unwrap_err(),
        GraphError::UnknownJob(JobId::from("zzz"))
    );
}

#[test]
fn direct_neighbours() {
    let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A", "B"])]);
    assert_eq!(g.direct_dependencies("C").unwrap(), vec![&JobId::from("A"), &JobId::from("B")]);
    assert_eq!(g.direct_dependents("A").unwrap(), vec![&JobId::from("B"), &JobId::from("C")]);
    assert!(g.direct_dependencies("A").unwrap().is_empty());
    assert!(g.direct_dependents("nope").is_err());
}

#[test]
fn order_subset_is_stable_and_deduplicated() {
    let g = chain(&["a", "b", "c", "d"]);
    let subset = ids(&["d", "b", "d", "a"]);
    assert_eq!(g.order_subset(&subset).unwrap(), ids(&["a", "b", "d"]));
}

#[test]
fn accessors() {
    let g = chain(&["a", "b"]);
    assert_eq!(g.len(), 2);
    assert!(!g.is_empty());
    assert!(g.contains("b"));
    assert_eq!(g.get("b").map(|d| d.function.as_str()), Some("test:b"));
    let defined: Vec<_> = g.definitions().iter().map(|d| d.id.to_string()).collect();
    assert_eq!(defined, vec!["a", "b"]);
}

proptest! {
    #[test]
    fn topological_order_puts_dependencies_first(defs in arb_dag(8)) {
        let g = DependencyGraph::build(defs.clone()).unwrap();
        for def in &defs {
            let order = g.topological_order(&def.id, Direction::Ancestors).unwrap();
            prop_assert_eq!(order.last(), Some(&def.id));
            let pos = |id: &JobId| order.iter().position(|o| o == id);
            for member in &order {
                let member_pos = pos(member);
                for dep in g.direct_dependencies(member).unwrap() {
                    let dep_pos = pos(dep);
                    prop_assert!(dep_pos.is_some(), "{} missing from ancestors of {}", dep, def.id);
                    prop_assert!(dep_pos < member_pos);
                }
            }
        }
    }

    #[test]
    fn descendant_order_is_topological(defs in arb_dag(8)) {
        let g = DependencyGraph::build(defs.clone()).unwrap();
        for def in &defs {
            let order = g.topological_order(&def.id, Direction::Descendants).unwrap();
            prop_assert_eq!(order.first(), Some(&def.id));
            for (i, member) in order.iter().enumerate() {
                for later in &order[i + 1..] {
                    prop_assert!(!g.get(member).unwrap().depends_on(later));
                }
            }
        }
    }
}
