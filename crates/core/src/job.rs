// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions and argument placeholders.

use crate::id::JobId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single positional or keyword argument of a job.
///
/// In TOML a placeholder is written as an inline table with a single
/// `retval` key (`{ retval = "job-1" }`); anything else is a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ArgumentRepr", into = "ArgumentRepr")]
pub enum ArgumentValue {
    /// Substitute the return value of the latest successful build of the
    /// named dependency.
    Retval(JobId),
    Literal(Value),
}

impl ArgumentValue {
    pub fn retval(job_id: impl Into<JobId>) -> Self {
        Self::Retval(job_id.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// The dependency this argument refers to, if it is a placeholder.
    pub fn retval_ref(&self) -> Option<&JobId> {
        match self {
            Self::Retval(id) => Some(id),
            Self::Literal(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetvalRef {
    retval: JobId,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ArgumentRepr {
    Retval(RetvalRef),
    Literal(Value),
}

impl From<ArgumentRepr> for ArgumentValue {
    fn from(repr: ArgumentRepr) -> Self {
        match repr {
            ArgumentRepr::Retval(r) => Self::Retval(r.retval),
            ArgumentRepr::Literal(v) => Self::Literal(v),
        }
    }
}

impl From<ArgumentValue> for ArgumentRepr {
    fn from(value: ArgumentValue) -> Self {
        match value {
            ArgumentValue::Retval(retval) => Self::Retval(RetvalRef { retval }),
            ArgumentValue::Literal(v) => Self::Literal(v),
        }
    }
}

/// Static description of a job, as loaded from configuration.
///
/// Definitions are immutable once the dependency graph is built; a
/// reconfiguration replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDefinition {
    pub id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Registry name of the callable, e.g. `"reports:monthly"`
    pub function: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgumentValue>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub kwargs: IndexMap<String, ArgumentValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<JobId>,
    /// Disables quick-build triggers for this job
    #[serde(default)]
    pub protect: bool,
}

impl JobDefinition {
    pub fn builder(id: impl Into<JobId>, function: impl Into<String>) -> JobDefinitionBuilder {
        JobDefinitionBuilder {
            id: id.into(),
            function: function.into(),
            title: None,
            notes: None,
            args: Vec::new(),
            kwargs: IndexMap::new(),
            dependencies: Vec::new(),
            protect: false,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.protect
    }

    pub fn depends_on(&self, id: &JobId) -> bool {
        self.dependencies.contains(id)
    }

    /// Every `(location, target)` pair of placeholders in args then kwargs.
    ///
    /// Locations are `"args[0]"` or `"kwargs.name"`.
    pub fn retval_refs(&self) -> Vec<(String, &JobId)> {
        let positional = self
            .args
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.retval_ref().map(|id| (format!("args[{i}]"), id)));
        let keyword = self
            .kwargs
            .iter()
            .filter_map(|(k, a)| a.retval_ref().map(|id| (format!("kwargs.{k}"), id)));
        positional.chain(keyword).collect()
    }

    /// Title, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Builder for [`JobDefinition`], mostly used by tests and embedders that
/// define jobs in code.
#[derive(Debug, Clone)]
pub struct JobDefinitionBuilder {
    id: JobId,
    function: String,
    title: Option<String>,
    notes: Option<String>,
    args: Vec<ArgumentValue>,
    kwargs: IndexMap<String, ArgumentValue>,
    dependencies: Vec<JobId>,
    protect: bool,
}

impl JobDefinitionBuilder {
    crate::setters! {
        set { args: Vec<ArgumentValue>, protect: bool }
        option { title: String, notes: String }
    }

    pub fn arg(mut self, value: ArgumentValue) -> Self {
        self.args.push(value);
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: ArgumentValue) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    pub fn depends_on(mut self, id: impl Into<JobId>) -> Self {
        let id = id.into();
        if !self.dependencies.contains(&id) {
            self.dependencies.push(id);
        }
        self
    }

    pub fn build(self) -> JobDefinition {
        JobDefinition {
            id: self.id,
            title: self.title,
            notes: self.notes,
            function: self.function,
            args: self.args,
            kwargs: self.kwargs,
            dependencies: self.dependencies,
            protect: self.protect,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
