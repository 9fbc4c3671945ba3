// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job dependency graph.
//!
//! Nodes live in an arena indexed by definition order, with forward
//! (dependencies) and reverse (dependents) adjacency lists. The graph is
//! validated once at construction and is immutable afterwards, so it can be
//! shared between concurrent build plans behind an `Arc`.

use crate::id::JobId;
use crate::job::JobDefinition;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("job {0} is defined more than once")]
    DuplicateJob(JobId),

    #[error("job {job} depends on unknown job {dependency}")]
    UnknownDependency { job: JobId, dependency: JobId },

    #[error("dependency cycle: {}", CyclePath(.path))]
    Cycle { path: Vec<JobId> },

    #[error("unknown job: {0}")]
    UnknownJob(JobId),
}

struct CyclePath<'a>(&'a [JobId]);

impl fmt::Display for CyclePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            f.write_str(id)?;
        }
        Ok(())
    }
}

/// Which way to walk from a root job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Transitive dependencies
    Ancestors,
    /// Transitive dependents
    Descendants,
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<JobDefinition>,
    index: HashMap<JobId, usize>,
    deps: Vec<Vec<usize>>,
    rdeps: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl DependencyGraph {
    /// Validate definitions and build the graph.
    ///
    /// Fails on duplicate ids, dependencies on undefined jobs, and cycles
    /// (including a job depending on itself).
    pub fn build(definitions: impl IntoIterator<Item = JobDefinition>) -> Result<Self, GraphError> {
        let nodes: Vec<JobDefinition> = definitions.into_iter().collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, def) in nodes.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateJob(def.id.clone()));
            }
        }

        let mut deps = vec![Vec::new(); nodes.len()];
        let mut rdeps = vec![Vec::new(); nodes.len()];
        for (i, def) in nodes.iter().enumerate() {
            for dep in &def.dependencies {
                let Some(&j) = index.get(dep) else {
                    return Err(GraphError::UnknownDependency {
                        job: def.id.clone(),
                        dependency: dep.clone(),
                    });
                };
                if !deps[i].contains(&j) {
                    deps[i].push(j);
                    rdeps[j].push(i);
                }
            }
        }

        let graph = Self { nodes, index, deps, rdeps };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), GraphError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut trail = Vec::new();
        for start in 0..self.nodes.len() {
            if marks[start] == Mark::Unvisited {
                self.visit(start, &mut marks, &mut trail)?;
            }
        }
        Ok(())
    }

    fn visit(&self, node: usize, marks: &mut [Mark], trail: &mut Vec<usize>) -> Result<(), GraphError> {
        marks[node] = Mark::OnStack;
        trail.push(node);
        for &dep in &self.deps[node] {
            match marks[dep] {
                Mark::Unvisited => self.visit(dep, marks, trail)?,
                Mark::OnStack => {
                    let pos = trail.iter().position(|&n| n == dep).unwrap_or(0);
                    let path = trail[pos..]
                        .iter()
                        .chain(std::iter::once(&dep))
                        .map(|&n| self.nodes[n].id.clone())
                        .collect();
                    return Err(GraphError::Cycle { path });
                }
                Mark::Done => {}
            }
        }
        trail.pop();
        marks[node] = Mark::Done;
        Ok(())
    }

    fn idx(&self, id: &str) -> Result<usize, GraphError> {
        self.index.get(id).copied().ok_or_else(|| GraphError::UnknownJob(JobId::from(id)))
    }

    pub fn get(&self, id: &str) -> Option<&JobDefinition> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Definitions in configuration order.
    pub fn definitions(&self) -> &[JobDefinition] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn direct_dependencies(&self, id: &str) -> Result<Vec<&JobId>, GraphError> {
        let i = self.idx(id)?;
        Ok(self.deps[i].iter().map(|&j| &self.nodes[j].id).collect())
    }

    pub fn direct_dependents(&self, id: &str) -> Result<Vec<&JobId>, GraphError> {
        let i = self.idx(id)?;
        Ok(self.rdeps[i].iter().map(|&j| &self.nodes[j].id).collect())
    }

    /// `root` plus everything reachable in `direction`, dependencies first.
    pub fn topological_order(&self, root: &str, direction: Direction) -> Result<Vec<JobId>, GraphError> {
        let start = self.idx(root)?;
        let edges = match direction {
            Direction::Ancestors => &self.deps,
            Direction::Descendants => &self.rdeps,
        };
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(n) = stack.pop() {
            for &m in &edges[n] {
                if !seen[m] {
                    seen[m] = true;
                    stack.push(m);
                }
            }
        }
        Ok(self.order(&seen))
    }

    /// Topological order of an arbitrary set of jobs; duplicates collapse.
    pub fn order_subset<'a, I>(&self, ids: I) -> Result<Vec<JobId>, GraphError>
    where
        I: IntoIterator<Item = &'a JobId>,
    {
        let mut member = vec![false; self.nodes.len()];
        for id in ids {
            member[self.idx(id)?] = true;
        }
        Ok(self.order(&member))
    }

    /// Kahn's algorithm over the member set. Among ready nodes the earliest
    /// defined goes first, which keeps plans deterministic.
    fn order(&self, member: &[bool]) -> Vec<JobId> {
        let mut pending: Vec<usize> =
            (0..self.nodes.len()).map(|n| self.deps[n].iter().filter(|&&d| member[d]).count()).collect();
        let mut ready: BTreeSet<usize> =
            (0..self.nodes.len()).filter(|&n| member[n] && pending[n] == 0).collect();
        let mut out = Vec::new();
        while let Some(n) = ready.pop_first() {
            out.push(self.nodes[n].id.clone());
            for &m in &self.rdeps[n] {
                if member[m] {
                    pending[m] -= 1;
                    if pending[m] == 0 {
                        ready.insert(m);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
