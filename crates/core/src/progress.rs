// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical progress reporting for a running build.
//!
//! A build reports `(path, current, total, status_line)` tuples. Each path
//! addresses a node in a tree; the empty path is the root. Reads aggregate
//! bottom-up: a node with children is worth the sum of its children, a leaf
//! is worth its own values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_line: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, ProgressNode>,
}

impl ProgressNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Aggregated `(current, total)`.
    ///
    /// Values reported on a node that also has children are not counted;
    /// only leaves contribute.
    pub fn effective(&self) -> (u64, u64) {
        if self.is_leaf() {
            return (self.current.unwrap_or(0), self.total.unwrap_or(0));
        }
        self.children.values().map(ProgressNode::effective).fold((0, 0), |(c, t), (dc, dt)| {
            (c.saturating_add(dc), t.saturating_add(dt))
        })
    }

    pub fn summary(&self) -> ProgressSummary {
        let (current, total) = self.effective();
        ProgressSummary::new(current, total)
    }

    fn child_mut(&mut self, name: &str) -> &mut ProgressNode {
        self.children.entry(name.to_string()).or_default()
    }
}

/// Aggregated progress with a human label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub current: u64,
    pub total: u64,
    /// `None` when the total is zero (indeterminate)
    pub percent: Option<f64>,
    /// `"N/A"` or `"current/total (pct%)"`
    pub label: String,
}

impl ProgressSummary {
    pub fn new(current: u64, total: u64) -> Self {
        if total == 0 {
            return Self { current, total, percent: None, label: "N/A".to_string() };
        }
        let percent = current as f64 * 100.0 / total as f64;
        let label = format!("{current}/{total} ({percent:.0}%)");
        Self { current, total, percent: Some(percent), label }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.percent.is_none()
    }
}

/// One flat progress row, as reported by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub path: Vec<String>,
    pub current: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_line: Option<String>,
}

impl ProgressReport {
    pub fn new<S: AsRef<str>>(path: &[S], current: u64, total: u64) -> Self {
        Self {
            path: path.iter().map(|s| s.as_ref().to_string()).collect(),
            current,
            total,
            status_line: None,
        }
    }

    pub fn status(mut self, line: impl Into<String>) -> Self {
        self.status_line = Some(line.into());
        self
    }
}

/// Progress of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressTree {
    root: ProgressNode,
}

impl ProgressTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from flat rows. Later rows for the same path overwrite
    /// earlier ones; sibling order follows first appearance.
    pub fn from_reports(rows: impl IntoIterator<Item = ProgressReport>) -> Self {
        let mut tree = Self::new();
        for row in rows {
            tree.apply(row);
        }
        tree
    }

    /// Insert or overwrite the node at `path`, creating intermediate nodes.
    pub fn report<S: AsRef<str>>(
        &mut self,
        path: &[S],
        current: u64,
        total: u64,
        status_line: Option<String>,
    ) {
        let node = path.iter().fold(&mut self.root, |node, seg| node.child_mut(seg.as_ref()));
        node.current = Some(current);
        node.total = Some(total);
        node.status_line = status_line;
    }

    pub fn apply(&mut self, row: ProgressReport) {
        self.report(row.path.as_slice(), row.current, row.total, row.status_line);
    }

    pub fn root(&self) -> &ProgressNode {
        &self.root
    }

    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&ProgressNode> {
        path.iter().try_fold(&self.root, |node, seg| node.children.get(seg.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.root == ProgressNode::default()
    }

    /// Aggregate progress of the whole build.
    pub fn summary(&self) -> ProgressSummary {
        self.root.summary()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
