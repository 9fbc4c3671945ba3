// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML job configuration.
//!
//! ```toml
//! [[jobs]]
//! id = "job-2"
//! function = "demo:transform"
//! args = [1, { retval = "job-1" }]
//! dependencies = ["job-1"]
//! ```

use crate::graph::{DependencyGraph, GraphError};
use crate::id::JobId;
use crate::job::JobDefinition;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid job configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("job #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("job {job} has no function")]
    MissingFunction { job: JobId },

    #[error("job {job}: {location} refers to {target}, which is not a dependency")]
    InvalidRetval { job: JobId, location: String, target: JobId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A set of job definitions, as loaded from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

impl JobsConfig {
    pub fn new(jobs: Vec<JobDefinition>) -> Self {
        Self { jobs }
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn get(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Check ids, functions and placeholders, then build the graph to catch
    /// duplicates, unknown dependencies and cycles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_definitions()?;
        DependencyGraph::build(self.jobs.iter().cloned())?;
        Ok(())
    }

    pub fn build_graph(&self) -> Result<DependencyGraph, ConfigError> {
        self.check_definitions()?;
        Ok(DependencyGraph::build(self.jobs.iter().cloned())?)
    }

    pub fn into_graph(self) -> Result<DependencyGraph, ConfigError> {
        self.check_definitions()?;
        Ok(DependencyGraph::build(self.jobs)?)
    }

    fn check_definitions(&self) -> Result<(), ConfigError> {
        for (index, job) in self.jobs.iter().enumerate() {
            if job.id.is_blank() {
                return Err(ConfigError::EmptyId { index });
            }
            if job.function.trim().is_empty() {
                return Err(ConfigError::MissingFunction { job: job.id.clone() });
            }
            for (location, target) in job.retval_refs() {
                if !job.depends_on(target) {
                    return Err(ConfigError::InvalidRetval {
                        job: job.id.clone(),
                        location,
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
