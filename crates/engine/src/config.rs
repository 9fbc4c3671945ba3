// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.

use crate::env;
use std::time::Duration;

const DEFAULT_STORE_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Extra attempts for a store write that failed with a transient error
    pub store_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { store_retries: DEFAULT_STORE_RETRIES, retry_backoff: DEFAULT_RETRY_BACKOFF }
    }
}

impl EngineConfig {
    jc_core::setters! {
        set { store_retries: u32, retry_backoff: Duration }
    }

    /// Defaults overridden by `JC_STORE_RETRIES` and `JC_RETRY_BACKOFF_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_retries: env::store_retries().unwrap_or(defaults.store_retries),
            retry_backoff: env::retry_backoff().unwrap_or(defaults.retry_backoff),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
