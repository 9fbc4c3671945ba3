// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder resolution.
//!
//! `ArgumentValue::Retval(dep)` is replaced by the return value of `dep`'s
//! latest successful whole-job build at the moment the dependent starts.

use indexmap::IndexMap;
use jc_core::{ArgumentValue, JobDefinition, JobId};
use jc_storage::{BuildStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{location} refers to {target}, which is not a dependency of {job}")]
    NotADependency { job: JobId, location: String, target: JobId },

    #[error("{location} refers to {target}, which has no successful build")]
    NotBuilt { location: String, target: JobId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArguments {
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
}

struct Resolver<'a, S: BuildStore + ?Sized> {
    job: &'a JobDefinition,
    store: &'a S,
    cache: HashMap<JobId, Value>,
}

impl<S: BuildStore + ?Sized> Resolver<'_, S> {
    fn value(&mut self, location: String, arg: &ArgumentValue) -> Result<Value, ResolveError> {
        let target = match arg {
            ArgumentValue::Literal(v) => return Ok(v.clone()),
            ArgumentValue::Retval(target) => target,
        };
        if !self.job.depends_on(target) {
            return Err(ResolveError::NotADependency {
                job: self.job.id.clone(),
                location,
                target: target.clone(),
            });
        }
        if let Some(v) = self.cache.get(target) {
            return Ok(v.clone());
        }
        let build = self
            .store
            .get_latest_successful_build(target, None)?
            .ok_or_else(|| ResolveError::NotBuilt { location, target: target.clone() })?;
        let value = build.retval.unwrap_or(Value::Null);
        self.cache.insert(target.clone(), value.clone());
        Ok(value)
    }
}

/// Substitute every placeholder in `job`'s args and kwargs.
pub fn resolve_arguments<S: BuildStore + ?Sized>(
    job: &JobDefinition,
    store: &S,
) -> Result<ResolvedArguments, ResolveError> {
    let mut resolver = Resolver { job, store, cache: HashMap::new() };
    let args = job
        .args
        .iter()
        .enumerate()
        .map(|(i, a)| resolver.value(format!("args[{i}]"), a))
        .collect::<Result<Vec<_>, _>>()?;
    let mut kwargs = IndexMap::with_capacity(job.kwargs.len());
    for (name, a) in &job.kwargs {
        kwargs.insert(name.clone(), resolver.value(format!("kwargs.{name}"), a)?);
    }
    Ok(ResolvedArguments { args, kwargs })
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
